//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{Authenticated, Client, Connected, Data, MailTransaction, SmtpConnection};
pub use stream::{SmtpStream, connect, connect_tls};

use std::collections::HashSet;
use std::time::Duration;

use crate::types::{AuthMechanism, Extension};

/// Time budgets for each phase of an SMTP session.
///
/// Defaults: 30 s to connect (including the TLS handshake), 60 s per
/// command reply, 120 s for the reply to the final `.` of `DATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP connect plus TLS handshake.
    pub connect: Duration,
    /// Writing one command and reading its reply.
    pub command: Duration,
    /// Writing the message body and reading the final reply.
    pub data: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            command: Duration::from_secs(60),
            data: Duration::from_secs(120),
        }
    }
}

/// Server capabilities from the greeting and EHLO reply.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Checks if 8BITMIME is supported.
    #[must_use]
    pub fn supports_8bitmime(&self) -> bool {
        self.supports(&Extension::EightBitMime)
    }

    /// Returns the maximum message size, if advertised.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn record_ehlo(&mut self, lines: &[String]) {
        // The first line is the server's self-identification.
        self.extensions = lines.iter().skip(1).map(|l| Extension::parse(l)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_are_bounded() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.connect, Duration::from_secs(30));
        assert_eq!(timeouts.command, Duration::from_secs(60));
        assert_eq!(timeouts.data, Duration::from_secs(120));
    }

    #[test]
    fn record_ehlo_skips_identity_line() {
        let mut info = ServerInfo::default();
        info.record_ehlo(&[
            "mx.example.com greets you".to_string(),
            "SIZE 1000".to_string(),
            "STARTTLS".to_string(),
            "AUTH LOGIN PLAIN".to_string(),
        ]);
        assert!(info.supports_starttls());
        assert!(!info.supports_8bitmime());
        assert_eq!(info.max_message_size(), Some(1000));
        assert_eq!(
            info.auth_mechanisms(),
            vec![AuthMechanism::Login, AuthMechanism::Plain]
        );
    }
}
