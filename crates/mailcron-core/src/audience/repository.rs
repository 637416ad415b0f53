//! Recipient and group storage repository.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;

use super::model::{GroupId, NewRecipient, Recipient, RecipientGroup, RecipientId};
use crate::db::Database;
use crate::store::RecipientDirectory;
use crate::{Error, Result};

/// Repository for recipients and the groups they belong to.
#[derive(Debug, Clone)]
pub struct AudienceRepository {
    pool: SqlitePool,
}

impl AudienceRepository {
    /// Create a repository on the shared database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Save a new recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn create_recipient(&self, recipient: &NewRecipient) -> Result<Recipient> {
        let result = sqlx::query(
            "INSERT INTO recipients (first_name, last_name, email, note) VALUES (?, ?, ?, ?)",
        )
        .bind(&recipient.first_name)
        .bind(&recipient.last_name)
        .bind(&recipient.email)
        .bind(&recipient.note)
        .execute(&self.pool)
        .await?;

        Ok(Recipient {
            id: RecipientId(result.last_insert_rowid()),
            first_name: recipient.first_name.clone(),
            last_name: recipient.last_name.clone(),
            email: recipient.email.clone(),
            note: recipient.note.clone(),
        })
    }

    /// Save a new, empty group.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn create_group(&self, name: &str) -> Result<RecipientGroup> {
        let result = sqlx::query("INSERT INTO audiences (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(RecipientGroup {
            id: GroupId(result.last_insert_rowid()),
            name: name.to_string(),
        })
    }

    /// Add a recipient to a group. Adding an existing member is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or either side does not exist.
    pub async fn add_member(&self, group_id: GroupId, recipient_id: RecipientId) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO audience_members (audience_id, recipient_id) VALUES (?, ?)",
        )
        .bind(group_id.0)
        .bind(recipient_id.0)
        .execute(&self.pool)
        .await?;

        debug!(group = %group_id, recipient = %recipient_id, "Member added");
        Ok(())
    }

    /// Remove a recipient from a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn remove_member(&self, group_id: GroupId, recipient_id: RecipientId) -> Result<()> {
        sqlx::query("DELETE FROM audience_members WHERE audience_id = ? AND recipient_id = ?")
            .bind(group_id.0)
            .bind(recipient_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Total number of recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_recipients(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM recipients")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(row.get::<i64, _>("count")).unwrap_or(0))
    }

    async fn group_exists(&self, group_id: GroupId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM audiences WHERE id = ?")
            .bind(group_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl RecipientDirectory for AudienceRepository {
    async fn members_of(&self, group_id: GroupId) -> Result<Vec<Recipient>> {
        if !self.group_exists(group_id).await? {
            return Err(Error::NotFound(format!("recipient group {group_id}")));
        }

        let rows = sqlx::query(
            r"
            SELECT r.id, r.first_name, r.last_name, r.email, r.note
            FROM recipients r
            JOIN audience_members m ON m.recipient_id = r.id
            WHERE m.audience_id = ?
            ORDER BY r.id
            ",
        )
        .bind(group_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_recipient).collect())
    }
}

fn row_to_recipient(row: &SqliteRow) -> Recipient {
    Recipient {
        id: RecipientId(row.get("id")),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        note: row.get("note"),
    }
}
