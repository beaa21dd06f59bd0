//! Crawl task state across the durable store and the fast cache.
//!
//! Intermediate progress is written to the cache first so pollers see it
//! even when the durable write is slow; terminal transitions are written
//! durably first so a crash cannot lose the final state. Reads prefer the
//! cache and fall back to the durable record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mapletrack_cache::FastCache;
use mapletrack_core::cache_keys;
use mapletrack_core::error_kind::ErrorKind;
use mapletrack_core::subtype::CrawlSubtype;
use mapletrack_core::task_status::CrawlStatus;
use mapletrack_core::types::{TaskId, Timestamp};
use mapletrack_db::models::task::{CrawlTask, CreateCrawlTask, UpdateCrawlTask};
use mapletrack_db::TaskStore;
use serde::{Deserialize, Serialize};

/// Status envelope served to pollers and cached under `task:{id}:status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub task_id: TaskId,
    pub character_id: String,
    pub status: CrawlStatus,
    pub progress: i32,
    pub retry_count: i32,
    pub message: String,
    pub error_kind: Option<ErrorKind>,
    /// Fixed user-facing text for `error_kind`.
    pub error_message: Option<String>,
    pub error_detail: Option<String>,
    pub technical_error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub updated_at: Timestamp,
}

impl TaskStatusView {
    pub fn from_task(task: &CrawlTask) -> Self {
        let status = task.status();
        let error_kind = task.error_kind();
        Self {
            task_id: task.id,
            character_id: task.character_id.clone(),
            status,
            progress: task.progress,
            retry_count: task.retry_count,
            message: default_message(status).to_string(),
            error_kind,
            error_message: error_kind.map(|k| k.user_message().to_string()),
            error_detail: task.error_detail.clone(),
            technical_error: task.technical_error.clone(),
            result: task.result.clone(),
            updated_at: task.updated_at,
        }
    }
}

fn default_message(status: CrawlStatus) -> &'static str {
    match status {
        CrawlStatus::Pending => "크롤링 대기 중",
        CrawlStatus::Started => "크롤링 진행 중",
        CrawlStatus::Retry => "오류가 발생하여 재시도를 기다리는 중",
        CrawlStatus::Success => "크롤링 완료",
        CrawlStatus::Failure => "크롤링 실패",
    }
}

/// One state change for a task.
#[derive(Debug, Clone)]
pub struct TaskTransition {
    pub status: CrawlStatus,
    pub progress: i32,
    pub retry_count: i32,
    /// Overrides the default status message.
    pub message: Option<String>,
    pub error: Option<TaskFailure>,
    pub result: Option<serde_json::Value>,
}

/// Classified failure details attached to a transition.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub kind: ErrorKind,
    pub detail: String,
    pub technical: Option<String>,
}

impl TaskTransition {
    pub fn new(status: CrawlStatus, progress: i32, retry_count: i32) -> Self {
        Self {
            status,
            progress,
            retry_count,
            message: None,
            error: None,
            result: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn failure(mut self, failure: TaskFailure) -> Self {
        self.error = Some(failure);
        self
    }

    pub fn result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    fn durable(&self) -> UpdateCrawlTask {
        UpdateCrawlTask {
            status: self.status,
            progress: self.progress,
            retry_count: self.retry_count,
            error_kind: self.error.as_ref().map(|e| e.kind),
            error_detail: self.error.as_ref().map(|e| e.detail.clone()),
            technical_error: self.error.as_ref().and_then(|e| e.technical.clone()),
            result: self.result.clone(),
        }
    }
}

pub struct TaskStatusStore {
    tasks: Arc<dyn TaskStore>,
    cache: Arc<dyn FastCache>,
    ttl: Duration,
}

impl TaskStatusStore {
    pub fn new(tasks: Arc<dyn TaskStore>, cache: Arc<dyn FastCache>, ttl: Duration) -> Self {
        Self { tasks, cache, ttl }
    }

    /// Insert a new `pending` task and cache its envelope.
    pub async fn create(
        &self,
        character_id: &str,
        subtypes: Vec<CrawlSubtype>,
    ) -> Result<CrawlTask, sqlx::Error> {
        let task = self
            .tasks
            .create_task(&CreateCrawlTask {
                id: uuid::Uuid::now_v7(),
                character_id: character_id.to_string(),
                subtypes,
            })
            .await?;
        self.cache_view(&TaskStatusView::from_task(&task)).await;
        Ok(task)
    }

    /// Apply a transition to both layers in the order its status requires.
    pub async fn transition(
        &self,
        task_id: TaskId,
        character_id: &str,
        transition: TaskTransition,
    ) -> Result<(), sqlx::Error> {
        let view = self.view_for(task_id, character_id, &transition);

        if transition.status.is_terminal() {
            let updated = self.tasks.update_task(task_id, &transition.durable()).await?;
            if updated.is_none() {
                tracing::warn!(task_id = %task_id, "Terminal update for a missing task");
            }
            self.cache_view(&view).await;
        } else {
            self.cache_view(&view).await;
            self.tasks.update_task(task_id, &transition.durable()).await?;
        }
        Ok(())
    }

    /// Current status: cached envelope first, durable record otherwise.
    pub async fn status(&self, task_id: TaskId) -> Result<Option<TaskStatusView>, sqlx::Error> {
        let key = cache_keys::task_status(task_id);
        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<TaskStatusView>(&raw) {
                Ok(view) => return Ok(Some(view)),
                Err(e) => tracing::warn!(key = %key, error = %e, "Discarding malformed task status"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Task status cache read failed"),
        }

        Ok(self
            .tasks
            .find_task(task_id)
            .await?
            .map(|task| TaskStatusView::from_task(&task)))
    }

    /// Newest tasks for a character.
    pub async fn history(
        &self,
        character_id: &str,
        limit: i64,
    ) -> Result<Vec<CrawlTask>, sqlx::Error> {
        self.tasks.list_tasks(character_id, limit).await
    }

    fn view_for(
        &self,
        task_id: TaskId,
        character_id: &str,
        transition: &TaskTransition,
    ) -> TaskStatusView {
        let error_kind = transition.error.as_ref().map(|e| e.kind);
        TaskStatusView {
            task_id,
            character_id: character_id.to_string(),
            status: transition.status,
            progress: transition.progress,
            retry_count: transition.retry_count,
            message: transition
                .message
                .clone()
                .unwrap_or_else(|| default_message(transition.status).to_string()),
            error_kind,
            error_message: error_kind.map(|k| k.user_message().to_string()),
            error_detail: transition.error.as_ref().map(|e| e.detail.clone()),
            technical_error: transition.error.as_ref().and_then(|e| e.technical.clone()),
            result: transition.result.clone(),
            updated_at: Utc::now(),
        }
    }

    async fn cache_view(&self, view: &TaskStatusView) {
        let key = cache_keys::task_status(view.task_id);
        let raw = match serde_json::to_string(view) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(task_id = %view.task_id, error = %e, "Failed to encode task status");
                return;
            }
        };
        if let Err(e) = self.cache.set_ex(&key, &raw, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Task status cache write failed");
        }
    }
}
