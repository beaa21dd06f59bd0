//! Repository for `storage_items` and `storage_meso_snapshots`.

use mapletrack_core::item::ParsedItem;
use mapletrack_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::item::{options_json, ExpiringItem, StorageItem, SHARED_STORAGE_KIND};

const COLUMNS: &str = "id, character_id, storage_kind, slot_index, item_type, name, icon_url, \
    quantity, options, detail_url, expiry_at, crawled_at";

/// Append-only storage rows. Readers take the newest `crawled_at` group.
pub struct StorageRepo;

impl StorageRepo {
    pub async fn insert(
        pool: &PgPool,
        ocid: &str,
        item: &ParsedItem,
        crawled_at: Timestamp,
    ) -> Result<StorageItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO storage_items \
                (character_id, storage_kind, slot_index, item_type, name, icon_url, quantity, \
                 options, detail_url, expiry_at, crawled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StorageItem>(&query)
            .bind(ocid)
            .bind(SHARED_STORAGE_KIND)
            .bind(item.slot_index)
            .bind(item.item_type.as_str())
            .bind(&item.name)
            .bind(&item.icon_url)
            .bind(item.quantity)
            .bind(options_json(&item.options))
            .bind(&item.detail_url)
            .bind(item.expiry_at)
            .bind(crawled_at)
            .fetch_one(pool)
            .await
    }

    /// Record the storage meso reading for a run.
    pub async fn insert_meso(
        pool: &PgPool,
        ocid: &str,
        meso: Option<i64>,
        crawled_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO storage_meso_snapshots (character_id, meso, crawled_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(ocid)
        .bind(meso)
        .bind(crawled_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_character(
        pool: &PgPool,
        ocid: &str,
    ) -> Result<Vec<StorageItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM storage_items WHERE character_id = $1 \
             ORDER BY crawled_at DESC, slot_index"
        );
        sqlx::query_as::<_, StorageItem>(&query)
            .bind(ocid)
            .fetch_all(pool)
            .await
    }

    /// Expiring items from each character's newest storage run.
    pub async fn list_expiring(pool: &PgPool) -> Result<Vec<ExpiringItem>, sqlx::Error> {
        sqlx::query_as::<_, ExpiringItem>(
            "SELECT s.id AS item_id, 'storage' AS source, s.name AS item_name, s.item_type, \
                    s.expiry_at, c.ocid AS character_id, c.name AS character_name, c.user_id \
             FROM storage_items s JOIN characters c ON c.ocid = s.character_id \
             WHERE s.expiry_at IS NOT NULL \
               AND s.crawled_at = ( \
                   SELECT MAX(x.crawled_at) FROM storage_items x \
                   WHERE x.character_id = s.character_id) \
             ORDER BY s.id",
        )
        .fetch_all(pool)
        .await
    }
}
