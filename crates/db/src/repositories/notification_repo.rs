//! Repository for the `expiry_notifications` table.

use mapletrack_core::checkpoint::Checkpoint;
use mapletrack_core::item::ItemSource;
use mapletrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::{CreateNotification, ExpiryNotification};

const COLUMNS: &str = "id, user_id, item_id, item_source, item_name, character_name, \
    checkpoint, channel, expiry_at, success, error, created_at, read_at, deleted_at";

pub struct NotificationRepo;

impl NotificationRepo {
    /// Record a dispatch attempt.
    ///
    /// A second successful record for the same item and checkpoint is
    /// rejected by the partial unique index; in that case nothing is
    /// written and `None` is returned.
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotification,
    ) -> Result<Option<ExpiryNotification>, sqlx::Error> {
        let query = format!(
            "INSERT INTO expiry_notifications \
                (user_id, item_id, item_source, item_name, character_name, checkpoint, \
                 channel, expiry_at, success, error) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (item_id, item_source, checkpoint) WHERE success DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExpiryNotification>(&query)
            .bind(input.user_id)
            .bind(input.item_id)
            .bind(input.item_source.as_str())
            .bind(&input.item_name)
            .bind(&input.character_name)
            .bind(input.checkpoint.as_str())
            .bind(&input.channel)
            .bind(input.expiry_at)
            .bind(input.success)
            .bind(&input.error)
            .fetch_optional(pool)
            .await
    }

    /// Whether a successful record exists for the triple.
    pub async fn exists_success(
        pool: &PgPool,
        item_id: DbId,
        source: ItemSource,
        checkpoint: Checkpoint,
    ) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS( \
                SELECT 1 FROM expiry_notifications \
                WHERE item_id = $1 AND item_source = $2 AND checkpoint = $3 AND success)",
        )
        .bind(item_id)
        .bind(source.as_str())
        .bind(checkpoint.as_str())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Visible records for a user, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<ExpiryNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM expiry_notifications \
             WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $2"
        );
        sqlx::query_as::<_, ExpiryNotification>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ExpiryNotification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM expiry_notifications WHERE id = $1");
        sqlx::query_as::<_, ExpiryNotification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set `read_at` once. Returns `false` if already read or missing.
    pub async fn mark_read(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE expiry_notifications SET read_at = NOW() \
             WHERE id = $1 AND read_at IS NULL AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete. Returns `false` if already deleted or missing.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE expiry_notifications SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
