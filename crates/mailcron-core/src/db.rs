//! `SQLite` connection pool and schema.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::{Error, Result};

/// Encodes a timestamp as fixed-width RFC 3339 (`...sssssZ`).
///
/// The fixed width keeps lexical order equal to chronological order, which
/// the `ORDER BY` clauses on time columns rely on.
pub(crate) fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decodes a timestamp written by [`encode_time`].
pub(crate) fn decode_time(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("{column} = {value:?}: {e}")))
}

/// Shared handle to the mailcron database.
///
/// All repositories are built from one `Database` so that campaigns,
/// audiences and the delivery log live in the same file and can reference
/// each other.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at the given path.
    ///
    /// Creates the parent directory and the tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the connection
    /// fails or schema creation fails.
    pub async fn open(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.initialize().await?;
        debug!(path = %database_path.display(), "Database ready");
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        // Each connection to `:memory:` is a separate database, so the single
        // connection must never be recycled.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    pub(crate) const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS periods (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                duration_secs INTEGER NOT NULL UNIQUE
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS recipients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                note TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS audiences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS audience_members (
                audience_id INTEGER NOT NULL REFERENCES audiences(id) ON DELETE CASCADE,
                recipient_id INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
                PRIMARY KEY (audience_id, recipient_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS campaigns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'created',
                period_id INTEGER NOT NULL REFERENCES periods(id) ON DELETE CASCADE,
                audience_id INTEGER NOT NULL REFERENCES audiences(id) ON DELETE CASCADE,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                message_title TEXT NOT NULL,
                message_body TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS delivery_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sent_at TEXT NOT NULL,
                campaign_id INTEGER NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
                recipient_id INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
                status TEXT NOT NULL,
                error_message TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Serves the "most recent entry for (campaign, recipient)" lookup
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_delivery_log_pair
            ON delivery_log(campaign_id, recipient_id, sent_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn encoded_times_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
        let late = early + Duration::microseconds(1);
        let later = early + Duration::days(1);

        assert!(encode_time(early) < encode_time(late));
        assert!(encode_time(late) < encode_time(later));
        assert_eq!(encode_time(early).len(), encode_time(later).len());
    }

    #[test]
    fn decode_round_trips_and_rejects_garbage() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
        assert_eq!(decode_time("sent_at", &encode_time(t)).unwrap(), t);
        assert!(matches!(
            decode_time("sent_at", "yesterday"),
            Err(Error::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
    }
}
