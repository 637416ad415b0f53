//! Reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from its response lines (without CRLF).
///
/// Multi-line replies use `-` after the code on every line but the last:
/// `250-First`, `250-Second`, `250 Last`. All lines must carry the same code.
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    let code = reply_code(first)?;
    let mut message = Vec::with_capacity(lines.len());

    for line in lines {
        if reply_code(line)? != code {
            return Err(Error::Protocol(format!(
                "Mixed reply codes in multi-line reply: {line}"
            )));
        }
        message.push(line.get(4..).unwrap_or_default().to_string());
    }

    Ok(Reply::new(code, message))
}

/// Checks if a line is the last line of a reply.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() == 3 || (line.len() >= 4 && line.as_bytes()[3] == b' ')
}

fn reply_code(line: &str) -> Result<ReplyCode> {
    let digits = line
        .get(..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::Protocol(format!("Invalid reply line: {line}")))?;

    if let Some(sep) = line.as_bytes().get(3)
        && *sep != b' '
        && *sep != b'-'
    {
        return Err(Error::Protocol(format!("Malformed reply line: {line}")));
    }

    digits
        .parse::<u16>()
        .map(ReplyCode::new)
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {digits}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_single_line_reply() {
        let reply = parse_reply(&lines(&["250 OK"])).unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.message, vec!["OK"]);
    }

    #[test]
    fn test_parse_multi_line_reply() {
        let reply = parse_reply(&lines(&[
            "250-smtp.example.com",
            "250-STARTTLS",
            "250 AUTH PLAIN",
        ]))
        .unwrap();
        assert_eq!(reply.message, vec!["smtp.example.com", "STARTTLS", "AUTH PLAIN"]);
    }

    #[test]
    fn test_bare_code() {
        let reply = parse_reply(&lines(&["354"])).unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert_eq!(reply.message, vec![""]);
        assert!(is_last_reply_line("354"));
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(!is_last_reply_line("250-Continuing"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&lines(&["25"])).is_err());
        assert!(parse_reply(&lines(&["ABC OK"])).is_err());
        assert!(parse_reply(&lines(&["250xOK"])).is_err());
        assert!(parse_reply(&lines(&["250-a", "251 b"])).is_err());
    }
}
