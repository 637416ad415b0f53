//! Recipient and group model types.

use serde::Serialize;

/// Unique identifier for a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecipientId(pub i64);

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a recipient group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GroupId(pub i64);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Someone who receives campaign mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    /// Unique identifier.
    pub id: RecipientId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Free-form note.
    pub note: Option<String>,
}

impl Recipient {
    /// Short display name: first name plus last initial ("Ada L.").
    ///
    /// Falls back to the email address when both names are empty.
    #[must_use]
    pub fn display_name(&self) -> String {
        let first = self.first_name.trim();
        match (first.is_empty(), self.last_name.trim().chars().next()) {
            (true, None) => self.email.clone(),
            (false, None) => first.to_string(),
            (true, Some(initial)) => format!("{initial}."),
            (false, Some(initial)) => format!("{first} {initial}."),
        }
    }
}

/// Fields needed to create a recipient.
#[derive(Debug, Clone)]
pub struct NewRecipient {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Free-form note.
    pub note: Option<String>,
}

impl NewRecipient {
    /// Creates a recipient without a note.
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            note: None,
        }
    }
}

/// A named set of recipients a campaign is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientGroup {
    /// Unique identifier.
    pub id: GroupId,
    /// Display name.
    pub name: String,
}
