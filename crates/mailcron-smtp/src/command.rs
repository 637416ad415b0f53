//! SMTP command serialization.

use crate::types::{Address, AuthMechanism};

/// A command this client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH with an initial response (RFC 4954 SASL-IR)
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Base64 initial response
        initial_response: String,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
        /// Add `BODY=8BITMIME`
        eight_bit: bool,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Short verb used in logs and timeout errors.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth { .. } => "AUTH",
            Self::MailFrom { .. } => "MAIL FROM",
            Self::RcptTo { .. } => "RCPT TO",
            Self::Data => "DATA",
            Self::Rset => "RSET",
            Self::Quit => "QUIT",
        }
    }

    /// Serializes the command to a CRLF-terminated line.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::Auth {
                mechanism,
                initial_response,
            } => format!("AUTH {} {initial_response}", mechanism.as_str()),
            Self::MailFrom { from, eight_bit } => {
                if *eight_bit {
                    format!("MAIL FROM:<{from}> BODY=8BITMIME")
                } else {
                    format!("MAIL FROM:<{from}>")
                }
            }
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::StartTls | Self::Data | Self::Rset | Self::Quit => self.verb().to_string(),
        };

        let mut buf = line.into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Applies SMTP transparency to a message body (RFC 5321 §4.5.2).
///
/// Line endings are normalized to CRLF, lines starting with `.` are
/// dot-stuffed and the terminating `.` line is appended.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 8);
    let body = message.strip_suffix(b"\n").unwrap_or(message);
    let body = body.strip_suffix(b"\r").unwrap_or(body);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO client.example.com\r\n");
    }

    #[test]
    fn test_auth_plain() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: "AHVzZXIAcGFzcw==".to_string(),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
    }

    #[test]
    fn test_mail_from() {
        let from = Address::new("sender@example.com").unwrap();
        let plain = Command::MailFrom {
            from: from.clone(),
            eight_bit: false,
        };
        let eight = Command::MailFrom {
            from,
            eight_bit: true,
        };
        assert_eq!(plain.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
        assert_eq!(
            eight.serialize(),
            b"MAIL FROM:<sender@example.com> BODY=8BITMIME\r\n"
        );
    }

    #[test]
    fn test_bare_verbs() {
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
    }

    #[test]
    fn test_encode_data_normalizes_and_stuffs() {
        let encoded = encode_data(b"Subject: x\n\n.hidden\r\nend\n");
        assert_eq!(encoded, b"Subject: x\r\n\r\n..hidden\r\nend\r\n.\r\n");
    }

    #[test]
    fn test_encode_data_empty() {
        assert_eq!(encode_data(b""), b".\r\n");
    }
}
