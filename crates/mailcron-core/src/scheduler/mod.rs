//! The mailing dispatch engine.
//!
//! A tick runs in three steps:
//!
//! 1. [`status::update_statuses`] moves every campaign through its lifecycle
//!    from the wall clock.
//! 2. For each started campaign, [`selector::select_due`] picks the group
//!    members whose last attempt is at least one repeat period old.
//! 3. [`dispatch::Dispatcher::dispatch`] sends to each of them and appends
//!    exactly one log entry per attempt.
//!
//! [`MailingService`] drives the steps, with campaigns and recipients
//! processed concurrently.

pub mod dispatch;
pub mod driver;
pub mod locks;
pub mod selector;
pub mod status;

pub use dispatch::Dispatcher;
pub use driver::{MailingService, TickReport};
pub use locks::PairLocks;
pub use selector::{is_due, select_due};
pub use status::{compute_status, update_statuses};
