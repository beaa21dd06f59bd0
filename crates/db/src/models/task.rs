//! Crawl task rows.

use mapletrack_core::error_kind::ErrorKind;
use mapletrack_core::subtype::CrawlSubtype;
use mapletrack_core::task_status::CrawlStatus;
use mapletrack_core::types::{TaskId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `crawl_tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CrawlTask {
    pub id: TaskId,
    pub character_id: String,
    pub subtypes: Vec<String>,
    pub status: String,
    pub progress: i32,
    pub retry_count: i32,
    pub error_kind: Option<String>,
    pub error_detail: Option<String>,
    pub technical_error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CrawlTask {
    pub fn status(&self) -> CrawlStatus {
        CrawlStatus::from_db(&self.status)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind.as_deref().map(ErrorKind::from_code)
    }
}

/// DTO for inserting a new task in `pending`.
#[derive(Debug, Clone)]
pub struct CreateCrawlTask {
    pub id: TaskId,
    pub character_id: String,
    pub subtypes: Vec<CrawlSubtype>,
}

impl CreateCrawlTask {
    pub fn subtype_strings(&self) -> Vec<String> {
        self.subtypes.iter().map(|s| s.as_str().to_string()).collect()
    }
}

/// Full mutable state of a task. Every update rewrites all of it; `result`
/// is kept when `None`.
#[derive(Debug, Clone)]
pub struct UpdateCrawlTask {
    pub status: CrawlStatus,
    pub progress: i32,
    pub retry_count: i32,
    pub error_kind: Option<ErrorKind>,
    pub error_detail: Option<String>,
    pub technical_error: Option<String>,
    pub result: Option<serde_json::Value>,
}
