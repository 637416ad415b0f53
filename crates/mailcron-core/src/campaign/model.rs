//! Campaign model types.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::audience::GroupId;

/// Unique identifier for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CampaignId(pub i64);

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a repeat period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeriodId(pub i64);

impl std::fmt::Display for PeriodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Waiting for its time window to open.
    #[default]
    Created,
    /// Inside its time window; recipients are mailed.
    Started,
    /// Past its end time (or stopped by hand).
    Finished,
}

impl CampaignStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Created, Self::Started, Self::Finished];

    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "started" => Some(Self::Started),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named repeat interval ("every week", "daily", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatPeriod {
    /// Unique identifier (None until saved).
    pub id: Option<PeriodId>,
    /// Display name.
    pub name: String,
    /// Minimum time between two sends to the same recipient.
    #[serde(serialize_with = "serialize_duration_secs")]
    pub duration: Duration,
}

impl RepeatPeriod {
    /// Creates an unsaved period.
    #[must_use]
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: None,
            name: name.into(),
            duration,
        }
    }

    /// The default interval: one week.
    #[must_use]
    pub fn weekly() -> Self {
        Self::new("Weekly", Duration::days(7))
    }
}

/// A scheduled mailing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Campaign {
    /// Unique identifier.
    pub id: CampaignId,
    /// Display name.
    pub name: String,
    /// Message subject.
    pub title: String,
    /// Plain-text message body.
    pub body: String,
    /// Current lifecycle state.
    pub status: CampaignStatus,
    /// Window opens (inclusive).
    pub start_time: DateTime<Utc>,
    /// Window closes (exclusive).
    pub end_time: DateTime<Utc>,
    /// Period the repeat interval comes from.
    pub period_id: PeriodId,
    /// Minimum time between two sends to the same recipient.
    #[serde(serialize_with = "serialize_duration_secs")]
    pub repeat_period: Duration,
    /// Recipient group the campaign targets.
    pub group_id: GroupId,
}

/// Fields needed to create a campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    /// Display name.
    pub name: String,
    /// Message subject.
    pub title: String,
    /// Plain-text message body.
    pub body: String,
    /// Window opens (inclusive).
    pub start_time: DateTime<Utc>,
    /// Window closes (exclusive).
    pub end_time: DateTime<Utc>,
    /// Repeat period to use.
    pub period_id: PeriodId,
    /// Recipient group to target.
    pub group_id: GroupId,
}

/// Number of campaigns in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Campaigns waiting for their window.
    pub created: u64,
    /// Campaigns currently mailing.
    pub started: u64,
    /// Campaigns that are over.
    pub finished: u64,
}

impl StatusCounts {
    /// Total number of campaigns.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.created + self.started + self.finished
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // Required by serde with= signature
fn serialize_duration_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_i64(duration.num_seconds())
}
