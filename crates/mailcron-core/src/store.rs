//! Store interfaces the dispatch engine depends on.
//!
//! The engine only needs to list campaigns and persist their status, read
//! group membership, and read/append the delivery log. The `SQLite`
//! repositories implement these traits; tests substitute their own.

use async_trait::async_trait;

use crate::Result;
use crate::audience::{GroupId, Recipient, RecipientId};
use crate::campaign::{Campaign, CampaignId, CampaignStatus};
use crate::delivery::DeliveryLogEntry;

/// Source of campaign records.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Every campaign, regardless of status.
    async fn list_all(&self) -> Result<Vec<Campaign>>;

    /// Campaigns currently in `status`.
    async fn list_by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>>;

    /// Persist a new status for a campaign.
    async fn save_status(&self, id: CampaignId, status: CampaignStatus) -> Result<()>;
}

/// Read access to recipient group membership.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Members of a group.
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the group does not exist.
    async fn members_of(&self, group_id: GroupId) -> Result<Vec<Recipient>>;
}

/// Append-only record of send attempts.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    /// Latest entry for a (campaign, recipient) pair, if any.
    async fn most_recent(
        &self,
        campaign_id: CampaignId,
        recipient_id: RecipientId,
    ) -> Result<Option<DeliveryLogEntry>>;

    /// Append an entry and return it with its assigned id.
    async fn append(&self, entry: DeliveryLogEntry) -> Result<DeliveryLogEntry>;
}
