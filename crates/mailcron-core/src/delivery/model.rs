//! Delivery outcome and log entry types.

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

use crate::audience::RecipientId;
use crate::campaign::CampaignId;

/// Longest error detail kept in the log, in characters.
pub const MAX_ERROR_LEN: usize = 250;

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error_message")]
pub enum DeliveryOutcome {
    /// The transport delivered to at least one address.
    #[serde(rename = "success")]
    Success,
    /// The transport ran but delivered to nobody.
    #[serde(rename = "fail")]
    Failed,
    /// The transport raised an error; the description is kept.
    #[serde(rename = "error")]
    Error(String),
}

impl DeliveryOutcome {
    /// Maps a transport result to an outcome.
    ///
    /// `Ok(n)` with `n >= 1` is a success, `Ok(0)` a soft failure, and any
    /// error becomes [`DeliveryOutcome::Error`] carrying its description.
    pub fn from_send<E: std::fmt::Display>(result: Result<usize, E>) -> Self {
        match result {
            Ok(0) => Self::Failed,
            Ok(_) => Self::Success,
            Err(e) => {
                let detail = e.to_string();
                if detail.trim().is_empty() {
                    Self::Error("unknown transport error".to_string())
                } else {
                    Self::Error(detail)
                }
            }
        }
    }

    /// Status string as stored in the log.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "fail",
            Self::Error(_) => "error",
        }
    }

    /// Error detail, present only for [`DeliveryOutcome::Error`].
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(detail) => Some(detail),
            Self::Success | Self::Failed => None,
        }
    }

    /// Rebuild an outcome from its stored columns.
    #[must_use]
    pub fn from_columns(status: &str, error_message: Option<String>) -> Option<Self> {
        match status {
            "success" => Some(Self::Success),
            "fail" => Some(Self::Failed),
            "error" => Some(Self::Error(error_message.unwrap_or_default())),
            _ => None,
        }
    }

    fn truncated(self) -> Self {
        match self {
            Self::Error(detail) if detail.chars().count() > MAX_ERROR_LEN => {
                Self::Error(detail.chars().take(MAX_ERROR_LEN).collect())
            }
            other => other,
        }
    }
}

/// One send attempt, as recorded in the delivery log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryLogEntry {
    /// Row id (None until appended).
    pub id: Option<i64>,
    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,
    /// Campaign that was sent.
    pub campaign_id: CampaignId,
    /// Recipient it was sent to.
    pub recipient_id: RecipientId,
    /// What happened.
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

impl DeliveryLogEntry {
    /// Records an attempt that just finished.
    #[must_use]
    pub fn record(
        campaign_id: CampaignId,
        recipient_id: RecipientId,
        outcome: DeliveryOutcome,
    ) -> Self {
        Self::at(Utc::now(), campaign_id, recipient_id, outcome)
    }

    /// Records an attempt with an explicit timestamp.
    ///
    /// Error details longer than [`MAX_ERROR_LEN`] characters are cut, and
    /// the timestamp is kept to the microsecond precision the log stores.
    #[must_use]
    pub fn at(
        timestamp: DateTime<Utc>,
        campaign_id: CampaignId,
        recipient_id: RecipientId,
        outcome: DeliveryOutcome,
    ) -> Self {
        Self {
            id: None,
            timestamp: timestamp.trunc_subsecs(6),
            campaign_id,
            recipient_id,
            outcome: outcome.truncated(),
        }
    }
}
