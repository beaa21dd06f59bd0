//! Crawl task status values and the transitions between them.
//!
//! ```text
//! pending -> started -> (retry <-> started)* -> success | failure
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle status of a crawl task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrawlStatus {
    Pending,
    Started,
    Retry,
    Success,
    Failure,
}

impl CrawlStatus {
    /// String stored in the `crawl_tasks.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlStatus::Pending => "pending",
            CrawlStatus::Started => "started",
            CrawlStatus::Retry => "retry",
            CrawlStatus::Success => "success",
            CrawlStatus::Failure => "failure",
        }
    }

    /// Parse a stored status. Unknown values are treated as `Failure`.
    pub fn from_db(value: &str) -> Self {
        match value {
            "pending" => CrawlStatus::Pending,
            "started" => CrawlStatus::Started,
            "retry" => CrawlStatus::Retry,
            "success" => CrawlStatus::Success,
            _ => CrawlStatus::Failure,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlStatus::Success | CrawlStatus::Failure)
    }

    /// Statuses reachable from `self`.
    ///
    /// `started -> started` is allowed: progress updates rewrite the status.
    pub fn valid_transitions(&self) -> &'static [CrawlStatus] {
        match self {
            CrawlStatus::Pending => &[CrawlStatus::Started, CrawlStatus::Failure],
            CrawlStatus::Started => &[
                CrawlStatus::Started,
                CrawlStatus::Retry,
                CrawlStatus::Success,
                CrawlStatus::Failure,
            ],
            CrawlStatus::Retry => &[CrawlStatus::Started],
            CrawlStatus::Success | CrawlStatus::Failure => &[],
        }
    }

    pub fn can_transition(&self, to: CrawlStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
