//! Read-path handlers for expiry notifications.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mapletrack_core::error::CoreError;
use mapletrack_core::types::DbId;
use mapletrack_db::models::notification::ExpiryNotification;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    /// Defaults to 50, capped at 100.
    pub limit: Option<i64>,
}

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
pub struct MarkRead {
    /// `false` when the notification was already read.
    pub marked: bool,
}

/// GET /api/v1/users/{user_id}/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<ExpiryNotification>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let data = state
        .stores
        .notifications
        .list_notifications(user_id, limit)
        .await?;
    Ok(Json(DataResponse::new(data)))
}

/// POST /api/v1/notifications/{id}/read
///
/// Idempotent: a second call leaves `read_at` untouched.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MarkRead>>> {
    let marked = state.stores.notifications.mark_read(id).await?;
    Ok(Json(DataResponse {
        data: MarkRead { marked },
    }))
}

/// DELETE /api/v1/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = state
        .stores
        .notifications
        .soft_delete_notification(id)
        .await?;
    if !deleted {
        return Err(AppError::Core(CoreError::not_found("Notification", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
