//! Recipients and the groups campaigns are addressed to.

mod model;
mod repository;

pub use model::{GroupId, NewRecipient, Recipient, RecipientGroup, RecipientId};
pub use repository::AudienceRepository;
