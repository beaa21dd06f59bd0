//! Repository for the `characters` table.

use mapletrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::character::{Character, CharacterBasic, RegisterCharacter};
use crate::models::user::User;

const COLUMNS: &str = "ocid, name, world, class, level, image_url, user_id, base_url, meso, \
    popularity, stat, created_at, updated_at";

/// Identity reads and the pipeline's identity writes.
pub struct CharacterRepo;

impl CharacterRepo {
    /// Insert a character, or refresh its name and owner if it exists.
    ///
    /// Does not touch `updated_at`; a freshly linked character has never
    /// been crawled.
    pub async fn register(
        pool: &PgPool,
        input: &RegisterCharacter,
    ) -> Result<Character, sqlx::Error> {
        let query = format!(
            "INSERT INTO characters (ocid, name, user_id) VALUES ($1, $2, $3) \
             ON CONFLICT (ocid) DO UPDATE SET \
                name = EXCLUDED.name, \
                user_id = COALESCE(EXCLUDED.user_id, characters.user_id) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(&input.ocid)
            .bind(&input.name)
            .bind(input.user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_ocid(pool: &PgPool, ocid: &str) -> Result<Option<Character>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE ocid = $1");
        sqlx::query_as::<_, Character>(&query)
            .bind(ocid)
            .fetch_optional(pool)
            .await
    }

    /// Write the fields returned by the vendor's basic endpoint.
    ///
    /// Returns `None` if the character is not registered.
    pub async fn update_basic(
        pool: &PgPool,
        ocid: &str,
        basic: &CharacterBasic,
    ) -> Result<Option<Character>, sqlx::Error> {
        let query = format!(
            "UPDATE characters SET \
                name = $2, world = $3, class = $4, level = $5, image_url = $6, \
                updated_at = NOW() \
             WHERE ocid = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(ocid)
            .bind(&basic.name)
            .bind(&basic.world)
            .bind(&basic.class)
            .bind(basic.level)
            .bind(&basic.image_url)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_popularity(
        pool: &PgPool,
        ocid: &str,
        popularity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE characters SET popularity = $2, updated_at = NOW() WHERE ocid = $1",
        )
        .bind(ocid)
        .bind(popularity)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_stat(
        pool: &PgPool,
        ocid: &str,
        stat: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE characters SET stat = $2, updated_at = NOW() WHERE ocid = $1")
                .bind(ocid)
                .bind(stat)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_meso(
        pool: &PgPool,
        ocid: &str,
        meso: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE characters SET meso = $2, updated_at = NOW() WHERE ocid = $1")
                .bind(ocid)
                .bind(meso)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the resolved page URL. Leaves `updated_at` alone.
    pub async fn update_base_url(
        pool: &PgPool,
        ocid: &str,
        base_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE characters SET base_url = $2 WHERE ocid = $1")
            .bind(ocid)
            .bind(base_url)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The user a character is linked to, if any.
    pub async fn find_owner(pool: &PgPool, ocid: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.email, u.notification_enabled, u.created_at \
             FROM characters c JOIN users u ON u.id = c.user_id \
             WHERE c.ocid = $1",
        )
        .bind(ocid)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Character>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE user_id = $1 ORDER BY name");
        sqlx::query_as::<_, Character>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
