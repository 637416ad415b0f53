//! Delivery log storage repository.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::warn;

use super::model::{DeliveryLogEntry, DeliveryOutcome};
use crate::audience::RecipientId;
use crate::campaign::CampaignId;
use crate::db::{Database, decode_time, encode_time};
use crate::store::DeliveryLog;
use crate::{Error, Result};

/// Append-only repository for delivery attempts.
#[derive(Debug, Clone)]
pub struct DeliveryLogRepository {
    pool: SqlitePool,
}

impl DeliveryLogRepository {
    /// Create a repository on the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Log entries, newest first, optionally for one campaign only.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        campaign_id: Option<CampaignId>,
        limit: u32,
    ) -> Result<Vec<DeliveryLogEntry>> {
        let rows = match campaign_id {
            Some(id) => {
                sqlx::query(
                    r"
                    SELECT id, sent_at, campaign_id, recipient_id, status, error_message
                    FROM delivery_log
                    WHERE campaign_id = ?
                    ORDER BY sent_at DESC, id DESC
                    LIMIT ?
                    ",
                )
                .bind(id.0)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r"
                    SELECT id, sent_at, campaign_id, recipient_id, status, error_message
                    FROM delivery_log
                    ORDER BY sent_at DESC, id DESC
                    LIMIT ?
                    ",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                row_to_entry(row)
                    .inspect_err(|e| warn!(error = %e, "Skipping unreadable log entry"))
                    .ok()
            })
            .collect())
    }
}

#[async_trait]
impl DeliveryLog for DeliveryLogRepository {
    async fn most_recent(
        &self,
        campaign_id: CampaignId,
        recipient_id: RecipientId,
    ) -> Result<Option<DeliveryLogEntry>> {
        let row = sqlx::query(
            r"
            SELECT id, sent_at, campaign_id, recipient_id, status, error_message
            FROM delivery_log
            WHERE campaign_id = ? AND recipient_id = ?
            ORDER BY sent_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(campaign_id.0)
        .bind(recipient_id.0)
        .fetch_optional(&self.pool)
        .await?;

        // An unreadable latest entry must not make the recipient look unsent.
        row.as_ref().map(row_to_entry).transpose()
    }

    async fn append(&self, entry: DeliveryLogEntry) -> Result<DeliveryLogEntry> {
        let result = sqlx::query(
            r"
            INSERT INTO delivery_log (sent_at, campaign_id, recipient_id, status, error_message)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(encode_time(entry.timestamp))
        .bind(entry.campaign_id.0)
        .bind(entry.recipient_id.0)
        .bind(entry.outcome.status())
        .bind(entry.outcome.error_message())
        .execute(&self.pool)
        .await?;

        Ok(DeliveryLogEntry {
            id: Some(result.last_insert_rowid()),
            ..entry
        })
    }
}

fn row_to_entry(row: &SqliteRow) -> Result<DeliveryLogEntry> {
    let id: i64 = row.get("id");
    let status: String = row.get("status");
    let outcome = DeliveryOutcome::from_columns(&status, row.get("error_message"))
        .ok_or_else(|| Error::Corrupt(format!("log entry {id} has status {status:?}")))?;

    Ok(DeliveryLogEntry {
        id: Some(id),
        timestamp: decode_time("sent_at", &row.get::<String, _>("sent_at"))?,
        campaign_id: CampaignId(row.get("campaign_id")),
        recipient_id: RecipientId(row.get("recipient_id")),
        outcome,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::audience::{AudienceRepository, NewRecipient};
    use crate::campaign::{CampaignRepository, NewCampaign, RepeatPeriod};
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        log: DeliveryLogRepository,
        campaigns: Vec<CampaignId>,
        recipients: Vec<RecipientId>,
    }

    async fn setup() -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let campaigns = CampaignRepository::new(&db);
        let audience = AudienceRepository::new(&db);

        let period = campaigns.create_period(&RepeatPeriod::weekly()).await.unwrap();
        let group = audience.create_group("All").await.unwrap();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let mut campaign_ids = Vec::new();
        for name in ["first", "second"] {
            let campaign = campaigns
                .create(&NewCampaign {
                    name: name.to_string(),
                    title: "Hello".to_string(),
                    body: "Body".to_string(),
                    start_time: start,
                    end_time: start + Duration::days(30),
                    period_id: period.id.unwrap(),
                    group_id: group.id,
                })
                .await
                .unwrap();
            campaign_ids.push(campaign.id);
        }

        let mut recipient_ids = Vec::new();
        for email in ["a@example.com", "b@example.com"] {
            let recipient = audience
                .create_recipient(&NewRecipient::new("A", "B", email))
                .await
                .unwrap();
            recipient_ids.push(recipient.id);
        }

        Fixture {
            log: DeliveryLogRepository::new(&db),
            campaigns: campaign_ids,
            recipients: recipient_ids,
        }
    }

    #[tokio::test]
    async fn test_most_recent_is_latest_for_pair() {
        let f = setup().await;
        let t = Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap();
        let (c, r) = (f.campaigns[0], f.recipients[0]);

        assert!(f.log.most_recent(c, r).await.unwrap().is_none());

        f.log
            .append(DeliveryLogEntry::at(t, c, r, DeliveryOutcome::Success))
            .await
            .unwrap();
        f.log
            .append(DeliveryLogEntry::at(
                t + Duration::hours(1),
                c,
                r,
                DeliveryOutcome::Error("timed out".to_string()),
            ))
            .await
            .unwrap();
        // Other pairs must not leak into the lookup
        f.log
            .append(DeliveryLogEntry::at(
                t + Duration::hours(2),
                f.campaigns[1],
                r,
                DeliveryOutcome::Success,
            ))
            .await
            .unwrap();
        f.log
            .append(DeliveryLogEntry::at(
                t + Duration::hours(2),
                c,
                f.recipients[1],
                DeliveryOutcome::Success,
            ))
            .await
            .unwrap();

        let latest = f.log.most_recent(c, r).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, t + Duration::hours(1));
        assert_eq!(latest.outcome, DeliveryOutcome::Error("timed out".to_string()));
    }

    #[tokio::test]
    async fn test_equal_timestamps_order_by_insertion() {
        let f = setup().await;
        let t = Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap();
        let (c, r) = (f.campaigns[0], f.recipients[0]);

        f.log
            .append(DeliveryLogEntry::at(t, c, r, DeliveryOutcome::Success))
            .await
            .unwrap();
        let second = f
            .log
            .append(DeliveryLogEntry::at(t, c, r, DeliveryOutcome::Failed))
            .await
            .unwrap();

        assert_eq!(f.log.most_recent(c, r).await.unwrap().unwrap(), second);
    }

    #[tokio::test]
    async fn test_list_filters_by_campaign() {
        let f = setup().await;
        let t = Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap();

        for (i, campaign) in [f.campaigns[0], f.campaigns[1], f.campaigns[0]]
            .into_iter()
            .enumerate()
        {
            f.log
                .append(DeliveryLogEntry::at(
                    t + Duration::minutes(i64::try_from(i).unwrap()),
                    campaign,
                    f.recipients[0],
                    DeliveryOutcome::Success,
                ))
                .await
                .unwrap();
        }

        assert_eq!(f.log.list(None, 100).await.unwrap().len(), 3);
        let first = f.log.list(Some(f.campaigns[0]), 100).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first[0].timestamp > first[1].timestamp);
        assert_eq!(f.log.list(None, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_keeps_truncated_detail() {
        let f = setup().await;
        let (c, r) = (f.campaigns[0], f.recipients[0]);
        let detail = "x".repeat(1000);

        f.log
            .append(DeliveryLogEntry::record(c, r, DeliveryOutcome::Error(detail)))
            .await
            .unwrap();

        let stored = f.log.most_recent(c, r).await.unwrap().unwrap();
        assert_eq!(
            stored.outcome.error_message().map(str::len),
            Some(crate::delivery::MAX_ERROR_LEN)
        );
    }

    #[tokio::test]
    async fn test_appended_entry_matches_stored_entry() {
        let f = setup().await;
        let (c, r) = (f.campaigns[0], f.recipients[0]);

        let appended = f
            .log
            .append(DeliveryLogEntry::record(c, r, DeliveryOutcome::Success))
            .await
            .unwrap();

        assert_eq!(f.log.most_recent(c, r).await.unwrap(), Some(appended));
    }
}
