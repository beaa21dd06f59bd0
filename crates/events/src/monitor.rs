//! Crawl outcome counters and the statistics built from them.
//!
//! Outcomes are counted in the fast cache in vendor-local day and hour
//! buckets. Recording is best-effort: a cache failure is logged and the
//! outcome is lost.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mapletrack_cache::{CacheError, FastCache};
use mapletrack_core::cache_keys::{self, Outcome};
use mapletrack_core::error_kind::ErrorKind;
use mapletrack_core::time::{local_date, local_hour, to_local};
use mapletrack_core::types::{TaskId, Timestamp};
use serde::Serialize;

/// Success rate over a window, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessRate {
    pub rate: f64,
    pub total: i64,
    pub success: i64,
    pub failure: i64,
}

impl SuccessRate {
    fn from_counts(success: i64, failure: i64) -> Self {
        let total = success + failure;
        Self {
            rate: percent(success, total),
            total,
            success,
            failure,
        }
    }

    /// Unrounded rate for threshold checks; `rate` is the display value.
    pub fn exact(&self) -> f64 {
        exact_percent(self.success, self.total)
    }
}

/// One hour of outcomes for plotting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyStat {
    /// Vendor-local `YYYY-MM-DD HH:00`.
    pub hour_label: String,
    pub success: i64,
    pub failure: i64,
    pub rate: f64,
}

/// Failure counts per kind; every kind is present.
pub type ErrorBreakdown = BTreeMap<ErrorKind, i64>;

/// No traffic counts as 100.
fn exact_percent(success: i64, total: i64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    success as f64 * 100.0 / total as f64
}

/// Rate in percent rounded to two decimals.
fn percent(success: i64, total: i64) -> f64 {
    (exact_percent(success, total) * 100.0).round() / 100.0
}

fn hours_back(now: Timestamp, hours: u32) -> impl Iterator<Item = Timestamp> {
    (0..i64::from(hours)).map(move |i| now - chrono::Duration::hours(i))
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor {
    cache: Arc<dyn FastCache>,
    stats_ttl: Duration,
}

impl Monitor {
    pub fn new(cache: Arc<dyn FastCache>, stats_ttl: Duration) -> Self {
        Self { cache, stats_ttl }
    }

    /// Count a finished task.
    pub async fn record(&self, task_id: TaskId, outcome: Outcome, kind: Option<ErrorKind>) {
        self.record_at(Utc::now(), task_id, outcome, kind).await
    }

    pub async fn record_at(
        &self,
        now: Timestamp,
        task_id: TaskId,
        outcome: Outcome,
        kind: Option<ErrorKind>,
    ) {
        let date = local_date(now);
        let mut keys = vec![
            cache_keys::daily_outcome(date, outcome),
            cache_keys::hourly_outcome(date, local_hour(now), outcome),
        ];
        if outcome == Outcome::Failure {
            keys.push(cache_keys::daily_error(
                date,
                kind.unwrap_or(ErrorKind::Unknown),
            ));
        }

        for key in &keys {
            if let Err(e) = self.cache.incr(key, self.stats_ttl).await {
                tracing::warn!(%task_id, key = %key, error = %e, "Failed to record crawl outcome");
            }
        }
        tracing::debug!(%task_id, outcome = outcome.as_str(), "Recorded crawl outcome");
    }

    pub async fn success_rate(&self, hours: u32) -> Result<SuccessRate, CacheError> {
        self.success_rate_at(Utc::now(), hours).await
    }

    /// Sum of the hour buckets covering the last `hours` hours up to `now`.
    pub async fn success_rate_at(
        &self,
        now: Timestamp,
        hours: u32,
    ) -> Result<SuccessRate, CacheError> {
        let (mut success, mut failure) = (0, 0);
        for ts in hours_back(now, hours) {
            let (s, f) = self.hour_counts(ts).await?;
            success += s;
            failure += f;
        }
        Ok(SuccessRate::from_counts(success, failure))
    }

    pub async fn error_breakdown(&self, hours: u32) -> Result<ErrorBreakdown, CacheError> {
        self.error_breakdown_at(Utc::now(), hours).await
    }

    /// Per-kind failure totals over the day buckets overlapping the window.
    pub async fn error_breakdown_at(
        &self,
        now: Timestamp,
        hours: u32,
    ) -> Result<ErrorBreakdown, CacheError> {
        let days = hours.div_ceil(24) + 1;
        let today = local_date(now);

        let mut breakdown: ErrorBreakdown = ErrorKind::ALL.iter().map(|k| (*k, 0)).collect();
        for offset in 0..days {
            let date = today - chrono::Duration::days(i64::from(offset));
            for kind in ErrorKind::ALL {
                let count = self
                    .cache
                    .get_count(&cache_keys::daily_error(date, kind))
                    .await?;
                *breakdown.entry(kind).or_default() += count;
            }
        }
        Ok(breakdown)
    }

    pub async fn hourly_stats(&self, hours: u32) -> Result<Vec<HourlyStat>, CacheError> {
        self.hourly_stats_at(Utc::now(), hours).await
    }

    /// One entry per hour, oldest first, ending with the current hour.
    pub async fn hourly_stats_at(
        &self,
        now: Timestamp,
        hours: u32,
    ) -> Result<Vec<HourlyStat>, CacheError> {
        let mut stats = Vec::with_capacity(hours as usize);
        for ts in hours_back(now, hours) {
            let (success, failure) = self.hour_counts(ts).await?;
            stats.push(HourlyStat {
                hour_label: to_local(ts).format("%Y-%m-%d %H:00").to_string(),
                success,
                failure,
                rate: percent(success, success + failure),
            });
        }
        stats.reverse();
        Ok(stats)
    }

    async fn hour_counts(&self, ts: Timestamp) -> Result<(i64, i64), CacheError> {
        let (date, hour) = (local_date(ts), local_hour(ts));
        let success = self
            .cache
            .get_count(&cache_keys::hourly_outcome(date, hour, Outcome::Success))
            .await?;
        let failure = self
            .cache
            .get_count(&cache_keys::hourly_outcome(date, hour, Outcome::Failure))
            .await?;
        Ok((success, failure))
    }
}
