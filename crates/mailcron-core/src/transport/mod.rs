//! Mail transport: the seam between dispatch and the outside world.

mod message;
mod smtp;

use async_trait::async_trait;

pub use message::OutgoingMessage;
pub use smtp::SmtpTransport;

/// Errors a transport can raise while sending.
///
/// Each one ends up as the detail of a
/// [`DeliveryOutcome::Error`](crate::delivery::DeliveryOutcome::Error).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Send failed.
    #[error("Send failed: {0}")]
    Send(String),

    /// Invalid address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Something that can deliver a message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send `message` to every address in `message.to`.
    ///
    /// Returns how many recipients the server accepted. Zero means the call
    /// went through but nobody will get the message.
    async fn send(&self, message: &OutgoingMessage) -> Result<usize, TransportError>;
}
