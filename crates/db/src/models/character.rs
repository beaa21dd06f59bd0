//! Character identity and daily history snapshots.

use chrono::NaiveDate;
use mapletrack_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `characters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Character {
    pub ocid: String,
    pub name: String,
    pub world: Option<String>,
    pub class: Option<String>,
    pub level: Option<i32>,
    pub image_url: Option<String>,
    pub user_id: Option<DbId>,
    /// Last resolved character-page URL. Written for reference only; each
    /// crawl resolves a fresh one.
    pub base_url: Option<String>,
    pub meso: Option<i64>,
    pub popularity: Option<i32>,
    pub stat: Option<serde_json::Value>,
    pub created_at: Timestamp,
    /// Last pipeline data write. `None` until the first crawl lands.
    pub updated_at: Option<Timestamp>,
}

/// DTO for linking a character to the service.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCharacter {
    pub ocid: String,
    pub name: String,
    pub user_id: Option<DbId>,
}

/// Identity fields refreshed from the vendor's basic endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterBasic {
    pub name: String,
    pub world: Option<String>,
    pub class: Option<String>,
    pub level: i32,
    pub image_url: Option<String>,
}

/// A row from the `character_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterHistory {
    pub id: DbId,
    pub character_id: String,
    pub local_date: NaiveDate,
    pub level: i32,
    pub exp: i64,
    pub guild_name: Option<String>,
    pub image_url: Option<String>,
    pub access_flag: bool,
    pub meso: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Snapshot fields written by the daily history upsert.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    pub level: i32,
    pub exp: i64,
    pub guild_name: Option<String>,
    pub image_url: Option<String>,
    pub access_flag: bool,
}
