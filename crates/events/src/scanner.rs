//! Daily expiry scan.
//!
//! At each vendor-local midnight every expiring item from the newest crawl
//! runs is checked against the D-7/D-3/D-1/expired checkpoints and handed
//! to the [`Notifier`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mapletrack_core::checkpoint::{checkpoint_for, days_until};
use mapletrack_core::time::{from_local, local_date};
use mapletrack_core::types::{DbId, Timestamp};
use mapletrack_db::models::user::User;
use mapletrack_db::{ItemStore, NotificationStore};
use tokio_util::sync::CancellationToken;

use crate::notifier::{DispatchOutcome, ExpiryCandidate, Notifier};

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub candidates: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Time from `now` until the next vendor-local midnight.
pub fn until_next_local_midnight(now: Timestamp) -> Duration {
    let next_day = local_date(now) + chrono::Duration::days(1);
    next_day
        .and_hms_opt(0, 0, 0)
        .and_then(from_local)
        .and_then(|midnight| (midnight - now).to_std().ok())
        .unwrap_or(Duration::from_secs(24 * 3600))
}

pub struct ExpiryScanner {
    items: Arc<dyn ItemStore>,
    notifications: Arc<dyn NotificationStore>,
    notifier: Arc<Notifier>,
}

impl ExpiryScanner {
    pub fn new(
        items: Arc<dyn ItemStore>,
        notifications: Arc<dyn NotificationStore>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            items,
            notifications,
            notifier,
        }
    }

    /// Scan at every local midnight until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            let wait = until_next_local_midnight(Utc::now());
            tracing::debug!(wait_s = wait.as_secs(), "Next expiry scan scheduled");

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Expiry scanner cancelled");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    match self.scan_at(Utc::now()).await {
                        Ok(summary) => tracing::info!(?summary, "Expiry scan finished"),
                        Err(e) => tracing::error!(error = %e, "Expiry scan failed"),
                    }
                }
            }
        }
    }

    /// One pass over every expiring item as of `now`.
    pub async fn scan_at(&self, now: Timestamp) -> Result<ScanSummary, sqlx::Error> {
        let today = local_date(now);
        let mut summary = ScanSummary::default();
        let mut users: HashMap<DbId, Option<User>> = HashMap::new();

        for item in self.items.list_expiring().await? {
            let days_left = days_until(item.expiry_at, today);
            let Some(checkpoint) = checkpoint_for(days_left) else {
                continue;
            };
            let Some(user_id) = item.user_id else {
                continue;
            };

            let user = match users.get(&user_id) {
                Some(user) => user.clone(),
                None => {
                    let user = self.notifications.find_user(user_id).await?;
                    users.insert(user_id, user.clone());
                    user
                }
            };
            let Some(user) = user.filter(|u| u.email.as_deref().is_some_and(|e| !e.is_empty()))
            else {
                continue;
            };

            summary.candidates += 1;
            let candidate = ExpiryCandidate {
                item,
                checkpoint,
                days_left,
            };
            match self.notifier.dispatch(&user, &candidate, now).await {
                Ok(DispatchOutcome::Sent) => summary.sent += 1,
                Ok(DispatchOutcome::Skipped(reason)) => {
                    tracing::debug!(item_id = candidate.item.item_id, ?reason, "Notification skipped");
                    summary.skipped += 1;
                }
                Ok(DispatchOutcome::Failed) => summary.failed += 1,
                Err(e) => {
                    tracing::error!(
                        item_id = candidate.item.item_id,
                        error = %e,
                        "Notification dispatch failed",
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn next_midnight_is_kst() {
        // 2024-06-01 14:00 UTC is 23:00 KST; midnight KST is an hour away.
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap();
        assert_eq!(until_next_local_midnight(now), Duration::from_secs(3600));

        // 15:00 UTC is exactly midnight KST; the next one is a day later.
        let at_midnight = Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap();
        assert_eq!(
            until_next_local_midnight(at_midnight),
            Duration::from_secs(24 * 3600)
        );
    }
}
