//! Repository for the `character_history` table.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::character::{CharacterHistory, HistorySnapshot};

const COLUMNS: &str = "id, character_id, local_date, level, exp, guild_name, image_url, \
    access_flag, meso, created_at, updated_at";

/// One snapshot per character per vendor-local day.
pub struct HistoryRepo;

impl HistoryRepo {
    /// Insert or overwrite the day's snapshot in one statement.
    ///
    /// The meso value is copied from the character's current balance; an
    /// existing snapshot keeps its meso if the character has none.
    pub async fn upsert(
        pool: &PgPool,
        ocid: &str,
        local_date: NaiveDate,
        snapshot: &HistorySnapshot,
    ) -> Result<CharacterHistory, sqlx::Error> {
        let query = format!(
            "INSERT INTO character_history \
                (character_id, local_date, level, exp, guild_name, image_url, access_flag, meso) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, (SELECT meso FROM characters WHERE ocid = $1)) \
             ON CONFLICT (character_id, local_date) DO UPDATE SET \
                level = EXCLUDED.level, \
                exp = EXCLUDED.exp, \
                guild_name = EXCLUDED.guild_name, \
                image_url = EXCLUDED.image_url, \
                access_flag = EXCLUDED.access_flag, \
                meso = COALESCE(EXCLUDED.meso, character_history.meso), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CharacterHistory>(&query)
            .bind(ocid)
            .bind(local_date)
            .bind(snapshot.level)
            .bind(snapshot.exp)
            .bind(&snapshot.guild_name)
            .bind(&snapshot.image_url)
            .bind(snapshot.access_flag)
            .fetch_one(pool)
            .await
    }

    /// Set meso on an existing snapshot. Returns `false` if the day has none.
    pub async fn update_meso(
        pool: &PgPool,
        ocid: &str,
        local_date: NaiveDate,
        meso: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE character_history SET meso = $3, updated_at = NOW() \
             WHERE character_id = $1 AND local_date = $2",
        )
        .bind(ocid)
        .bind(local_date)
        .bind(meso)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(
        pool: &PgPool,
        ocid: &str,
        local_date: NaiveDate,
    ) -> Result<Option<CharacterHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM character_history WHERE character_id = $1 AND local_date = $2"
        );
        sqlx::query_as::<_, CharacterHistory>(&query)
            .bind(ocid)
            .bind(local_date)
            .fetch_optional(pool)
            .await
    }

    /// Most recent snapshots first.
    pub async fn list_for_character(
        pool: &PgPool,
        ocid: &str,
        limit: i64,
    ) -> Result<Vec<CharacterHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM character_history WHERE character_id = $1 \
             ORDER BY local_date DESC LIMIT $2"
        );
        sqlx::query_as::<_, CharacterHistory>(&query)
            .bind(ocid)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
