//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server returned an error reply.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Unexpected or malformed server response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Operation not valid in the current session state.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    /// The server did not answer within the configured budget.
    #[error("Timed out during {0}")]
    Timeout(&'static str),

    /// The server closed the connection.
    #[error("Connection closed by server")]
    ConnectionClosed,
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let err = Error::smtp_error(554, "Transaction failed");
        assert_eq!(err.to_string(), "SMTP error 554: Transaction failed");
        assert_eq!(Error::Timeout("RCPT TO").to_string(), "Timed out during RCPT TO");
    }
}
