//! # mailcron-core
//!
//! Core logic for `mailcron`, a periodic mailing scheduler.
//!
//! This crate provides:
//! - Campaigns with a time window, a repeat period and a recipient group
//! - Recipients and groups
//! - An append-only delivery log
//! - **Dispatch Engine** - status lifecycle, due-recipient selection and
//!   logged sends, run one tick at a time
//! - Local storage (`SQLite`) behind store traits
//! - SMTP transport and TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod audience;
pub mod campaign;
pub mod config;
mod db;
pub mod delivery;
mod error;
pub mod scheduler;
pub mod store;
pub mod transport;

pub use audience::{
    AudienceRepository, GroupId, NewRecipient, Recipient, RecipientGroup, RecipientId,
};
pub use campaign::{
    Campaign, CampaignId, CampaignRepository, CampaignStatus, NewCampaign, PeriodId,
    RepeatPeriod, StatusCounts,
};
pub use config::{Config, Security, SmtpConfig};
pub use db::Database;
pub use delivery::{DeliveryLogEntry, DeliveryLogRepository, DeliveryOutcome};
pub use error::{Error, Result};
pub use scheduler::{Dispatcher, MailingService, TickReport, compute_status};
pub use store::{CampaignStore, DeliveryLog, RecipientDirectory};
pub use transport::{MailTransport, OutgoingMessage, SmtpTransport, TransportError};
