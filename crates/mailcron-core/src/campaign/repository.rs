//! Campaign storage repository.

use async_trait::async_trait;
use chrono::Duration;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::{debug, warn};

use super::model::{
    Campaign, CampaignId, CampaignStatus, NewCampaign, PeriodId, RepeatPeriod, StatusCounts,
};
use crate::audience::GroupId;
use crate::db::{Database, decode_time, encode_time};
use crate::store::CampaignStore;
use crate::{Error, Result};

const SELECT_CAMPAIGN: &str = r"
    SELECT c.id, c.name, c.status, c.start_time, c.end_time,
           c.message_title, c.message_body, c.audience_id,
           c.period_id, p.duration_secs
    FROM campaigns c
    JOIN periods p ON p.id = c.period_id
";

/// Repository for campaigns and their repeat periods.
#[derive(Debug, Clone)]
pub struct CampaignRepository {
    pool: SqlitePool,
}

impl CampaignRepository {
    /// Create a repository on the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Save a repeat period.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, including when another period
    /// already uses the same duration.
    pub async fn create_period(&self, period: &RepeatPeriod) -> Result<RepeatPeriod> {
        let result = sqlx::query("INSERT INTO periods (name, duration_secs) VALUES (?, ?)")
            .bind(&period.name)
            .bind(period.duration.num_seconds())
            .execute(&self.pool)
            .await?;

        Ok(RepeatPeriod {
            id: Some(PeriodId(result.last_insert_rowid())),
            ..period.clone()
        })
    }

    /// Get all periods, shortest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_periods(&self) -> Result<Vec<RepeatPeriod>> {
        let rows = sqlx::query(
            "SELECT id, name, duration_secs FROM periods ORDER BY duration_secs ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let id = PeriodId(row.get("id"));
                decode_duration(id, row.get("duration_secs"))
                    .inspect_err(|e| warn!(error = %e, "Skipping unreadable period"))
                    .ok()
                    .map(|duration| RepeatPeriod {
                        id: Some(id),
                        name: row.get("name"),
                        duration,
                    })
            })
            .collect())
    }

    /// Create a campaign in the `Created` state.
    ///
    /// The time window is stored as given; a window with `start >= end`
    /// is accepted and simply never starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the period/group does not exist.
    pub async fn create(&self, campaign: &NewCampaign) -> Result<Campaign> {
        let result = sqlx::query(
            r"
            INSERT INTO campaigns
                (name, status, period_id, audience_id, start_time, end_time,
                 message_title, message_body)
            VALUES (?, 'created', ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&campaign.name)
        .bind(campaign.period_id.0)
        .bind(campaign.group_id.0)
        .bind(encode_time(campaign.start_time))
        .bind(encode_time(campaign.end_time))
        .bind(&campaign.title)
        .bind(&campaign.body)
        .execute(&self.pool)
        .await?;

        let id = CampaignId(result.last_insert_rowid());
        debug!(campaign = %id, name = %campaign.name, "Campaign created");

        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {id}")))
    }

    /// Get campaign by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the row is corrupt.
    pub async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let row = sqlx::query(&format!("{SELECT_CAMPAIGN} WHERE c.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_campaign).transpose()
    }

    /// Stop a campaign by hand (status becomes `Finished`).
    ///
    /// The next tick recomputes the status from the time window, so a
    /// campaign stopped inside its window starts again on that tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the campaign does not exist.
    pub async fn stop(&self, id: CampaignId) -> Result<()> {
        self.set_status(id, CampaignStatus::Finished).await
    }

    /// Put a campaign back into the `Created` state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the campaign does not exist.
    pub async fn restart(&self, id: CampaignId) -> Result<()> {
        self.set_status(id, CampaignStatus::Created).await
    }

    /// Delete a campaign and its delivery log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the campaign does not exist.
    pub async fn delete(&self, id: CampaignId) -> Result<()> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("campaign {id}")));
        }
        Ok(())
    }

    /// Count campaigns per status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn status_counts(&self) -> Result<StatusCounts> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM campaigns GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = StatusCounts::default();
        for row in &rows {
            let count = u64::try_from(row.get::<i64, _>("count")).unwrap_or(0);
            let status: String = row.get("status");
            match CampaignStatus::parse(&status) {
                Some(CampaignStatus::Created) => counts.created = count,
                Some(CampaignStatus::Started) => counts.started = count,
                Some(CampaignStatus::Finished) => counts.finished = count,
                None => warn!(%status, "Unknown campaign status"),
            }
        }

        Ok(counts)
    }

    async fn set_status(&self, id: CampaignId, status: CampaignStatus) -> Result<()> {
        let result = sqlx::query("UPDATE campaigns SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("campaign {id}")));
        }
        Ok(())
    }

    async fn fetch(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!("{SELECT_CAMPAIGN} WHERE c.status = ? ORDER BY c.id"))
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(&format!("{SELECT_CAMPAIGN} ORDER BY c.id"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        // A corrupt row must not hide every other campaign from the scheduler.
        Ok(rows
            .iter()
            .filter_map(|row| {
                row_to_campaign(row)
                    .inspect_err(|e| warn!(error = %e, "Skipping unreadable campaign"))
                    .ok()
            })
            .collect())
    }
}

#[async_trait]
impl CampaignStore for CampaignRepository {
    async fn list_all(&self) -> Result<Vec<Campaign>> {
        self.fetch(None).await
    }

    async fn list_by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>> {
        self.fetch(Some(status)).await
    }

    async fn save_status(&self, id: CampaignId, status: CampaignStatus) -> Result<()> {
        self.set_status(id, status).await
    }
}

fn row_to_campaign(row: &SqliteRow) -> Result<Campaign> {
    let id = CampaignId(row.get("id"));
    let status: String = row.get("status");
    let status = CampaignStatus::parse(&status)
        .ok_or_else(|| Error::Corrupt(format!("campaign {id} has status {status:?}")))?;

    let period_id = PeriodId(row.get("period_id"));

    Ok(Campaign {
        id,
        name: row.get("name"),
        title: row.get("message_title"),
        body: row.get("message_body"),
        status,
        start_time: decode_time("start_time", &row.get::<String, _>("start_time"))?,
        end_time: decode_time("end_time", &row.get::<String, _>("end_time"))?,
        period_id,
        repeat_period: decode_duration(period_id, row.get("duration_secs"))?,
        group_id: GroupId(row.get("audience_id")),
    })
}

fn decode_duration(period: PeriodId, secs: i64) -> Result<Duration> {
    Duration::try_seconds(secs)
        .ok_or_else(|| Error::Corrupt(format!("period {period} has duration_secs {secs}")))
}
