//! Users and their notification settings (read-only to the pipeline).

use chrono::NaiveTime;
use mapletrack_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: Option<String>,
    pub notification_enabled: bool,
    pub created_at: Timestamp,
}

/// A row from the `user_notification_settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationSettings {
    pub user_id: DbId,
    pub notify_d7: bool,
    pub notify_d3: bool,
    pub notify_d1: bool,
    /// Item types to notify about; `None` means all.
    pub category_filter: Option<Vec<String>>,
    /// Quiet window in vendor-local time. Wraps midnight when start > end.
    pub quiet_start: Option<NaiveTime>,
    pub quiet_end: Option<NaiveTime>,
    pub updated_at: Timestamp,
}
