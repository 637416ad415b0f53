//! Outgoing message construction.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use chrono::{DateTime, Utc};

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A plain-text email message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Sender address.
    pub from: String,
    /// Display name for the `From:` header.
    pub from_name: Option<String>,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Display name for a single recipient in the `To:` header.
    pub to_name: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

impl OutgoingMessage {
    /// Creates a new outgoing message.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            from_name: None,
            to: Vec::new(),
            to_name: None,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Sets the sender display name.
    #[must_use]
    pub fn from_name(mut self, name: Option<String>) -> Self {
        self.from_name = name;
        self
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Sets the recipient display name. Ignored when there are several recipients.
    #[must_use]
    pub fn to_name(mut self, name: Option<String>) -> Self {
        self.to_name = name;
        self
    }

    /// Builds the RFC 5322 formatted message.
    #[must_use]
    pub fn to_rfc5322(&self, date: DateTime<Utc>) -> String {
        let mut message = String::new();

        let _ = write!(message, "Date: {}\r\n", date.to_rfc2822());
        let _ = write!(
            message,
            "From: {}\r\n",
            mailbox(self.from_name.as_deref(), &self.from)
        );
        match self.to.as_slice() {
            [] => {}
            [single] => {
                let _ = write!(
                    message,
                    "To: {}\r\n",
                    mailbox(self.to_name.as_deref(), single)
                );
            }
            many => {
                let _ = write!(message, "To: {}\r\n", many.join(", "));
            }
        }
        let _ = write!(message, "Subject: {}\r\n", encode_header(&self.subject));
        let _ = write!(message, "Message-ID: {}\r\n", self.message_id(date));
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");

        // Empty line between headers and body
        message.push_str("\r\n");

        message.push_str(&self.body);
        if !self.body.ends_with('\n') {
            message.push_str("\r\n");
        }

        message
    }

    fn message_id(&self, date: DateTime<Utc>) -> String {
        let domain = self
            .from
            .rsplit_once('@')
            .map_or("localhost", |(_, domain)| domain);
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        format!(
            "<{}.{}.{seq}@{domain}>",
            date.timestamp_micros(),
            std::process::id()
        )
    }
}

/// `Name <addr>` when a non-blank name is given, otherwise the bare address.
///
/// ASCII names containing RFC 5322 specials are quoted.
fn mailbox(name: Option<&str>, address: &str) -> String {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return address.to_string();
    };

    let encoded = encode_header(name);
    if name.is_ascii() && encoded.chars().any(|c| "()<>[]:;@\\,.\"".contains(c)) {
        let escaped = encoded.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\" <{address}>")
    } else {
        format!("{encoded} <{address}>")
    }
}

/// Header value safe for a single header line.
///
/// Line breaks are folded to spaces; non-ASCII text is sent as an RFC 2047
/// encoded word.
fn encode_header(value: &str) -> String {
    let flat: String = value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();

    if flat.is_ascii() {
        flat
    } else {
        format!(
            "=?utf-8?B?{}?=",
            base64::engine::general_purpose::STANDARD.encode(flat.as_bytes())
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_headers_and_body() {
        let message = OutgoingMessage::new("news@example.com", "Weekly digest", "Hello there")
            .to("ada@example.com")
            .to_rfc5322(date());

        assert!(message.starts_with("Date: Tue, "));
        assert!(message.contains(" Apr 2025 10:00:00 +0000\r\n"));
        assert!(message.contains("From: news@example.com\r\n"));
        assert!(message.contains("To: ada@example.com\r\n"));
        assert!(message.contains("Subject: Weekly digest\r\n"));
        assert!(message.contains("@example.com>\r\n"));
        assert!(message.ends_with("\r\n\r\nHello there\r\n"));
    }

    #[test]
    fn test_from_name() {
        let message = OutgoingMessage::new("news@example.com", "Hi", "Body")
            .from_name(Some("Example News".to_string()))
            .to_rfc5322(date());
        assert!(message.contains("From: Example News <news@example.com>\r\n"));
    }

    #[test]
    fn test_recipient_name_is_quoted_when_needed() {
        let message = OutgoingMessage::new("news@example.com", "Hi", "Body")
            .to("ada@example.com")
            .to_name(Some("Ada L.".to_string()))
            .to_rfc5322(date());
        assert!(message.contains("To: \"Ada L.\" <ada@example.com>\r\n"));

        let plain = OutgoingMessage::new("news@example.com", "Hi", "Body")
            .to("bob@example.com")
            .to_name(Some("Bob".to_string()))
            .to_rfc5322(date());
        assert!(plain.contains("To: Bob <bob@example.com>\r\n"));
    }

    #[test]
    fn test_recipient_name_ignored_for_several_recipients() {
        let message = OutgoingMessage::new("news@example.com", "Hi", "Body")
            .to("a@example.com")
            .to("b@example.com")
            .to_name(Some("Ada".to_string()))
            .to_rfc5322(date());
        assert!(message.contains("To: a@example.com, b@example.com\r\n"));
    }

    #[test]
    fn test_mailbox_escapes_quotes() {
        assert_eq!(
            mailbox(Some(r#"The "Best", Inc."#), "x@example.com"),
            r#""The \"Best\", Inc." <x@example.com>"#
        );
        assert_eq!(mailbox(Some("  "), "x@example.com"), "x@example.com");
        assert_eq!(
            mailbox(Some("Zoë"), "z@example.com"),
            "=?utf-8?B?Wm/Dqw==?= <z@example.com>"
        );
    }

    #[test]
    fn test_subject_cannot_inject_headers() {
        let message = OutgoingMessage::new("news@example.com", "Hi\r\nBcc: evil@example.com", "")
            .to_rfc5322(date());
        assert!(message.contains("Subject: Hi  Bcc: evil@example.com\r\n"));
        assert!(!message.contains("\r\nBcc:"));
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        assert_eq!(encode_header("Grüße"), "=?utf-8?B?R3LDvMOfZQ==?=");
        assert_eq!(encode_header("plain"), "plain");
    }

    #[test]
    fn test_message_ids_are_unique() {
        let message = OutgoingMessage::new("news@example.com", "Hi", "Body");
        assert_ne!(message.message_id(date()), message.message_id(date()));
    }
}
