//! Fast-cache key builders.
//!
//! These strings are shared with anything else reading the cache, so the
//! formats are fixed.

use chrono::NaiveDate;

use crate::checkpoint::Checkpoint;
use crate::error_kind::ErrorKind;
use crate::item::ItemSource;
use crate::time::date_key;
use crate::types::{DbId, TaskId};

/// Outcome bucket for crawl statistics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Alert threshold bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertLevel {
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }
}

pub fn task_status(task_id: TaskId) -> String {
    format!("task:{task_id}:status")
}

pub fn character_ocid(name: &str) -> String {
    format!("character:ocid:{name}")
}

pub fn daily_outcome(date: NaiveDate, outcome: Outcome) -> String {
    format!("crawl:stats:{}:{}", date_key(date), outcome.as_str())
}

pub fn hourly_outcome(date: NaiveDate, hour: u32, outcome: Outcome) -> String {
    format!(
        "crawl:stats:{}:hourly:{:02}:{}",
        date_key(date),
        hour,
        outcome.as_str()
    )
}

pub fn daily_error(date: NaiveDate, kind: ErrorKind) -> String {
    format!("crawl:stats:{}:error:{}", date_key(date), kind.as_str())
}

pub fn alert_marker(level: AlertLevel) -> String {
    format!("crawl:alert:last_sent:{}", level.as_str())
}

pub fn notification_sent(source: ItemSource, item_id: DbId, checkpoint: Checkpoint) -> String {
    format!("notif:{}:{}:{}", source.as_str(), item_id, checkpoint.as_str())
}

pub fn shared_storage(user_id: DbId) -> String {
    format!("shared_storage:{user_id}")
}

/// Read-path caches for one character, dropped after a successful crawl.
pub fn character_read_caches(character_id: &str) -> [String; 3] {
    [
        format!("character:{character_id}:inventory"),
        format!("character:{character_id}:storage"),
        format!("character:{character_id}:detail"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_keys_match_fixed_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(daily_outcome(d, Outcome::Success), "crawl:stats:2024-07-01:success");
        assert_eq!(
            hourly_outcome(d, 5, Outcome::Failure),
            "crawl:stats:2024-07-01:hourly:05:failure"
        );
        assert_eq!(
            daily_error(d, ErrorKind::NetworkError),
            "crawl:stats:2024-07-01:error:NETWORK_ERROR"
        );
    }

    #[test]
    fn notification_key_is_source_item_checkpoint() {
        assert_eq!(
            notification_sent(ItemSource::Storage, 42, Checkpoint::D1),
            "notif:storage:42:D1"
        );
    }

    #[test]
    fn alert_marker_keys() {
        assert_eq!(alert_marker(AlertLevel::Critical), "crawl:alert:last_sent:critical");
        assert_eq!(alert_marker(AlertLevel::Warning), "crawl:alert:last_sent:warning");
    }
}
