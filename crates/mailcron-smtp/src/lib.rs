//! # mailcron-smtp
//!
//! Async SMTP submission client used by the mailcron dispatch engine.
//!
//! ## Features
//!
//! - **Type-state sessions**: `MAIL FROM`, `RCPT TO` and `DATA` can only be
//!   issued in the order RFC 5321 allows
//! - **TLS**: implicit TLS (port 465) and STARTTLS (port 587)
//! - **Authentication**: `AUTH PLAIN`
//! - **Bounded I/O**: every connect, command and data transfer runs under a
//!   [`Timeouts`] budget, so a stalled server never blocks a caller forever
//! - **Per-recipient results**: a rejected `RCPT TO` is reported, not raised,
//!   so callers can count how many recipients the server accepted
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailcron_smtp::{Address, Client, Timeouts};
//! use mailcron_smtp::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> mailcron_smtp::Result<()> {
//!     let timeouts = Timeouts::default();
//!     let stream = connect("smtp.example.com", 587, timeouts.connect).await?;
//!     let client = Client::from_stream(stream, timeouts).await?;
//!     let client = client.ehlo("mailcron.local").await?;
//!     let client = client.starttls("smtp.example.com").await?;
//!     let client = client.auth_plain("user@example.com", "password").await?;
//!
//!     let mut tx = client.mail_from(Address::new("news@example.com")?).await?;
//!     tx.rcpt_to(Address::new("reader@example.com")?).await?;
//!     let client = tx.data().await?;
//!     let client = client.send_message(b"Subject: Hi\r\n\r\nHello\r\n").await?;
//!     client.quit().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── auth_plain() ──→ Authenticated
//!     │                              │
//!     └───────── mail_from() ────────┘
//!                    │
//!                    ▼
//!             MailTransaction ── data() ──→ Data ── send_message() ──→ Connected
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, ServerInfo, SmtpConnection,
    Timeouts,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
