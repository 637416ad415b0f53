//! SMTP reply types.

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Reply message lines.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Converts a non-2xx reply into an [`Error::SmtpError`](crate::Error::SmtpError).
    ///
    /// # Errors
    ///
    /// Returns the reply as an error when it is not a success reply.
    pub fn into_success(self) -> crate::Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(crate::Error::smtp_error(
                self.code.as_u16(),
                self.message_text(),
            ))
        }
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_OK: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 550 Mailbox unavailable (not found, access denied)
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);

    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn code_classes() {
        assert!(ReplyCode::OK.is_success());
        assert!(!ReplyCode::MAILBOX_UNAVAILABLE.is_success());
    }

    #[test]
    fn into_success_passes_2xx() {
        let reply = Reply::new(ReplyCode::OK, vec!["OK".to_string()]);
        assert_eq!(reply.clone().into_success().unwrap(), reply);
    }

    #[test]
    fn into_success_maps_errors() {
        let reply = Reply::new(
            ReplyCode::MAILBOX_UNAVAILABLE,
            vec!["No such user".to_string(), "here".to_string()],
        );
        let err = reply.into_success().unwrap_err();
        assert!(matches!(err, crate::Error::SmtpError { code: 550, .. }));
        assert_eq!(err.to_string(), "SMTP error 550: No such user\nhere");
    }
}
