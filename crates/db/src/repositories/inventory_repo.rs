//! Repository for the `inventory_items` table.

use mapletrack_core::item::ParsedItem;
use mapletrack_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::item::{options_json, ExpiringItem, InventoryItem};

const COLUMNS: &str = "id, character_id, slot_index, item_type, name, icon_url, quantity, \
    options, detail_url, expiry_at, has_detail, crawled_at";

/// Append-only inventory rows grouped by `crawled_at`.
pub struct InventoryRepo;

impl InventoryRepo {
    /// Insert one item row stamped with the run's `crawled_at`.
    pub async fn insert(
        pool: &PgPool,
        ocid: &str,
        item: &ParsedItem,
        crawled_at: Timestamp,
    ) -> Result<InventoryItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO inventory_items \
                (character_id, slot_index, item_type, name, icon_url, quantity, options, \
                 detail_url, expiry_at, crawled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(ocid)
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

    /// `crawled_at` of the character's newest inventory run.
    pub async fn latest_crawled_at(
        pool: &PgPool,
        ocid: &str,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let row: (Option<Timestamp>,) =
            sqlx::query_as("SELECT MAX(crawled_at) FROM inventory_items WHERE character_id = $1")
                .bind(ocid)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Rows with a detail page that has not been fetched yet, in id order.
    pub async fn list_pending_detail(
        pool: &PgPool,
        ocid: &str,
    ) -> Result<Vec<InventoryItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM inventory_items \
             WHERE character_id = $1 AND detail_url IS NOT NULL AND has_detail = FALSE \
             ORDER BY id"
        );
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(ocid)
            .fetch_all(pool)
            .await
    }

    /// Every row for a character, newest run first then slot order.
    pub async fn list_for_character(
        pool: &PgPool,
        ocid: &str,
    ) -> Result<Vec<InventoryItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM inventory_items WHERE character_id = $1 \
             ORDER BY crawled_at DESC, slot_index"
        );
        sqlx::query_as::<_, InventoryItem>(&query)
            .bind(ocid)
            .fetch_all(pool)
            .await
    }

    /// Expiring items from each character's newest inventory run.
    pub async fn list_expiring(pool: &PgPool) -> Result<Vec<ExpiringItem>, sqlx::Error> {
        sqlx::query_as::<_, ExpiringItem>(
            "SELECT i.id AS item_id, 'inventory' AS source, i.name AS item_name, i.item_type, \
                    i.expiry_at, c.ocid AS character_id, c.name AS character_name, c.user_id \
             FROM inventory_items i JOIN characters c ON c.ocid = i.character_id \
             WHERE i.expiry_at IS NOT NULL \
               AND i.crawled_at = ( \
                   SELECT MAX(x.crawled_at) FROM inventory_items x \
                   WHERE x.character_id = i.character_id) \
             ORDER BY i.id",
        )
        .fetch_all(pool)
        .await
    }
}
