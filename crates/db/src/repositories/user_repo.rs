//! Repository for `users` and `user_notification_settings`.

use mapletrack_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{NotificationSettings, User};

const SETTINGS_COLUMNS: &str =
    "user_id, notify_d7, notify_d3, notify_d1, category_filter, quiet_start, quiet_end, updated_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, notification_enabled, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Notification settings, or `None` if the user never changed them.
    pub async fn get_settings(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<NotificationSettings>, sqlx::Error> {
        let query = format!(
            "SELECT {SETTINGS_COLUMNS} FROM user_notification_settings WHERE user_id = $1"
        );
        sqlx::query_as::<_, NotificationSettings>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
