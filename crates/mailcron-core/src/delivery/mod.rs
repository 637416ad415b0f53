//! Per-recipient delivery outcomes and the append-only log they go into.

mod model;
mod repository;

pub use model::{DeliveryLogEntry, DeliveryOutcome, MAX_ERROR_LEN};
pub use repository::DeliveryLogRepository;
