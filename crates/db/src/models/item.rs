//! Inventory, storage and item-detail rows.

use mapletrack_core::item::{ItemOptions, ItemSource};
use mapletrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `inventory_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryItem {
    pub id: DbId,
    pub character_id: String,
    pub slot_index: i32,
    pub item_type: String,
    pub name: String,
    pub icon_url: Option<String>,
    pub quantity: i32,
    pub options: Option<serde_json::Value>,
    pub detail_url: Option<String>,
    pub expiry_at: Option<Timestamp>,
    pub has_detail: bool,
    pub crawled_at: Timestamp,
}

/// A row from the `storage_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StorageItem {
    pub id: DbId,
    pub character_id: String,
    pub storage_kind: String,
    pub slot_index: i32,
    pub item_type: String,
    pub name: String,
    pub icon_url: Option<String>,
    pub quantity: i32,
    pub options: Option<serde_json::Value>,
    pub detail_url: Option<String>,
    pub expiry_at: Option<Timestamp>,
    pub crawled_at: Timestamp,
}

/// Storage kind written for every storage row.
pub const SHARED_STORAGE_KIND: &str = "shared";

/// A row from the `item_details` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ItemDetailRow {
    pub id: DbId,
    pub inventory_item_id: DbId,
    pub attack: Option<i32>,
    pub magic_attack: Option<i32>,
    pub str_stat: Option<i32>,
    pub dex_stat: Option<i32>,
    pub int_stat: Option<i32>,
    pub luk_stat: Option<i32>,
    pub max_hp: Option<i32>,
    pub max_mp: Option<i32>,
    pub boss_damage: Option<i32>,
    pub ignore_defense: Option<i32>,
    pub potential_grade: Option<String>,
    pub potential_option_1: Option<String>,
    pub potential_option_2: Option<String>,
    pub potential_option_3: Option<String>,
    pub additional_grade: Option<String>,
    pub additional_option_1: Option<String>,
    pub additional_option_2: Option<String>,
    pub additional_option_3: Option<String>,
    pub soul_name: Option<String>,
    pub soul_option: Option<String>,
    pub category: Option<String>,
    pub required_level: Option<i32>,
    pub required_job: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An item with an expiry date, joined to its character, for the daily scan.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpiringItem {
    pub item_id: DbId,
    pub source: String,
    pub item_name: String,
    pub item_type: String,
    pub expiry_at: Timestamp,
    pub character_id: String,
    pub character_name: String,
    pub user_id: Option<DbId>,
}

impl ExpiringItem {
    pub fn item_source(&self) -> ItemSource {
        ItemSource::from_db(&self.source).unwrap_or(ItemSource::Inventory)
    }
}

/// JSON stored in the `options` column, `None` when the card had no cues.
pub fn options_json(options: &ItemOptions) -> Option<serde_json::Value> {
    if options.is_empty() {
        None
    } else {
        serde_json::to_value(options).ok()
    }
}
