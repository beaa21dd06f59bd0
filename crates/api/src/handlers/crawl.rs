//! Handlers for crawl requests and crawl task status.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mapletrack_core::error::CoreError;
use mapletrack_core::types::TaskId;
use mapletrack_pipeline::{CrawlDecision, CrawlRequest, TaskStatusView};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /characters/{character_id}/crawl-tasks`.
#[derive(Debug, Deserialize)]
pub struct TaskHistoryQuery {
    /// Defaults to 20, capped at 100.
    pub limit: Option<i64>,
}

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// POST /api/v1/characters/{character_id}/crawl
///
/// 202 with the new task id, or 200 when the character was crawled
/// recently and `force` is not set.
pub async fn request_crawl(
    State(state): State<AppState>,
    Path(character_id): Path<String>,
    Json(body): Json<CrawlRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CrawlDecision>>)> {
    let decision = state.scheduler.request(&character_id, &body).await?;
    let status = match decision {
        CrawlDecision::Accepted { .. } => StatusCode::ACCEPTED,
        CrawlDecision::RecentlyCrawled { .. } => StatusCode::OK,
    };
    Ok((status, Json(DataResponse::new(decision))))
}

/// GET /api/v1/crawl-tasks/{task_id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> AppResult<Json<DataResponse<TaskStatusView>>> {
    let view = state
        .scheduler
        .statuses()
        .status(task_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("CrawlTask", task_id)))?;
    Ok(Json(DataResponse::new(view)))
}

/// GET /api/v1/characters/{character_id}/crawl-tasks
///
/// Newest first, straight from the durable store.
pub async fn list_tasks(
    State(state): State<AppState>,
    Path(character_id): Path<String>,
    Query(params): Query<TaskHistoryQuery>,
) -> AppResult<Json<DataResponse<Vec<TaskStatusView>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let tasks = state
        .scheduler
        .statuses()
        .history(&character_id, limit)
        .await?;
    let data = tasks.iter().map(TaskStatusView::from_task).collect();
    Ok(Json(DataResponse::new(data)))
}
