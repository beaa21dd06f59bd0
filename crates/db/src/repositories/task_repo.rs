//! Repository for the `crawl_tasks` table.

use mapletrack_core::types::{TaskId, Timestamp};
use sqlx::PgPool;

use crate::models::task::{CrawlTask, CreateCrawlTask, UpdateCrawlTask};

const COLUMNS: &str = "id, character_id, subtypes, status, progress, retry_count, error_kind, \
    error_detail, technical_error, result, created_at, updated_at";

/// Durable crawl task records.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a task in `pending` with zero progress.
    pub async fn create(pool: &PgPool, input: &CreateCrawlTask) -> Result<CrawlTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO crawl_tasks (id, character_id, subtypes) VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CrawlTask>(&query)
            .bind(input.id)
            .bind(&input.character_id)
            .bind(input.subtype_strings())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: TaskId) -> Result<Option<CrawlTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM crawl_tasks WHERE id = $1");
        sqlx::query_as::<_, CrawlTask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the task's mutable state. A `None` result keeps the stored one.
    ///
    /// Returns `None` if no task with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: TaskId,
        input: &UpdateCrawlTask,
    ) -> Result<Option<CrawlTask>, sqlx::Error> {
        let query = format!(
            "UPDATE crawl_tasks SET \
                status = $2, \
                progress = $3, \
                retry_count = $4, \
                error_kind = $5, \
                error_detail = $6, \
                technical_error = $7, \
                result = COALESCE($8, result), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CrawlTask>(&query)
            .bind(id)
            .bind(input.status.as_str())
            .bind(input.progress)
            .bind(input.retry_count)
            .bind(input.error_kind.map(|k| k.as_str()))
            .bind(&input.error_detail)
            .bind(&input.technical_error)
            .bind(&input.result)
            .fetch_optional(pool)
            .await
    }

    /// Tasks for a character, newest first.
    pub async fn list_for_character(
        pool: &PgPool,
        character_id: &str,
        limit: i64,
    ) -> Result<Vec<CrawlTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM crawl_tasks WHERE character_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        );
        sqlx::query_as::<_, CrawlTask>(&query)
            .bind(character_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// When the character's most recent successful task finished.
    pub async fn last_success_at(
        pool: &PgPool,
        character_id: &str,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let row: (Option<Timestamp>,) = sqlx::query_as(
            "SELECT MAX(updated_at) FROM crawl_tasks \
             WHERE character_id = $1 AND status = 'success'",
        )
        .bind(character_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
