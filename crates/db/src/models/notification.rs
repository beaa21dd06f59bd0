//! Expiry notification records.

use mapletrack_core::checkpoint::Checkpoint;
use mapletrack_core::item::ItemSource;
use mapletrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `expiry_notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpiryNotification {
    pub id: DbId,
    pub user_id: DbId,
    pub item_id: DbId,
    pub item_source: String,
    pub item_name: String,
    pub character_name: String,
    pub checkpoint: String,
    pub channel: String,
    pub expiry_at: Timestamp,
    pub success: bool,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub read_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
}

/// DTO for recording one dispatch attempt.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub item_id: DbId,
    pub item_source: ItemSource,
    pub item_name: String,
    pub character_name: String,
    pub checkpoint: Checkpoint,
    pub channel: String,
    pub expiry_at: Timestamp,
    pub success: bool,
    pub error: Option<String>,
}
