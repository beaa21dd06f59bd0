//! Expiry notification dispatch for a single item and checkpoint.
//!
//! Gates run in order: the user's master switch, their schedule (quiet
//! hours, checkpoint toggles, category filter), then duplicate
//! suppression through the fast cache and the durable records. A send is
//! retried inline; only a successful send sets the cache key, so a failed
//! one can be tried again by the next day's scan.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use mapletrack_cache::FastCache;
use mapletrack_core::cache_keys;
use mapletrack_core::checkpoint::Checkpoint;
use mapletrack_core::time::to_local;
use mapletrack_core::types::Timestamp;
use mapletrack_db::models::item::ExpiringItem;
use mapletrack_db::models::notification::CreateNotification;
use mapletrack_db::models::user::{NotificationSettings, User};
use mapletrack_db::NotificationStore;

use crate::delivery::email::{EmailMessage, Mailer};

/// Inline resends after the first failed attempt.
pub const MAX_SEND_RETRIES: u32 = 3;

pub const CHANNEL_EMAIL: &str = "email";

/// An item at a notification checkpoint today.
#[derive(Debug, Clone)]
pub struct ExpiryCandidate {
    pub item: ExpiringItem,
    pub checkpoint: Checkpoint,
    pub days_left: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoEmail,
    QuietHours,
    CheckpointOff,
    CategoryFiltered,
    AlreadySent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Skipped(SkipReason),
    Failed,
}

// ---------------------------------------------------------------------------
// Schedule gate
// ---------------------------------------------------------------------------

/// Whether `t` falls in `[start, end)`, wrapping midnight when start > end.
pub fn in_quiet_hours(start: NaiveTime, end: NaiveTime, t: NaiveTime) -> bool {
    match start.cmp(&end) {
        std::cmp::Ordering::Less => start <= t && t < end,
        std::cmp::Ordering::Greater => t >= start || t < end,
        std::cmp::Ordering::Equal => false,
    }
}

/// Check a user's schedule settings for this candidate at `now`.
pub fn schedule_allows(
    settings: &NotificationSettings,
    checkpoint: Checkpoint,
    item_type: &str,
    now: Timestamp,
) -> Result<(), SkipReason> {
    if let (Some(start), Some(end)) = (settings.quiet_start, settings.quiet_end) {
        if in_quiet_hours(start, end, to_local(now).time()) {
            return Err(SkipReason::QuietHours);
        }
    }

    let enabled = match checkpoint {
        Checkpoint::D7 => settings.notify_d7,
        Checkpoint::D3 => settings.notify_d3,
        Checkpoint::D1 => settings.notify_d1,
        Checkpoint::Expired => true,
    };
    if !enabled {
        return Err(SkipReason::CheckpointOff);
    }

    if let Some(filter) = &settings.category_filter {
        if !filter.is_empty() && !filter.iter().any(|c| c == item_type) {
            return Err(SkipReason::CategoryFiltered);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

fn checkpoint_label(checkpoint: Checkpoint) -> &'static str {
    match checkpoint {
        Checkpoint::D7 => "D-7",
        Checkpoint::D3 => "D-3",
        Checkpoint::D1 => "D-1",
        Checkpoint::Expired => "만료",
    }
}

/// Plain-text Korean expiry notice.
pub fn expiry_email(to: &str, candidate: &ExpiryCandidate, service_base_url: &str) -> EmailMessage {
    let item = &candidate.item;
    let remaining = if candidate.days_left > 0 {
        format!("{}일 남았습니다", candidate.days_left)
    } else {
        "만료되었습니다".to_string()
    };

    EmailMessage {
        to: to.to_string(),
        subject: format!(
            "[MapleTrack] {} 유효기간 알림 ({})",
            item.item_name,
            checkpoint_label(candidate.checkpoint)
        ),
        body: format!(
            "안녕하세요, MapleTrack입니다.\n\n\
             {character} 캐릭터가 보유한 \"{name}\"의 유효기간이 {remaining}.\n\
             만료 일시: {expiry} (KST)\n\n\
             자세한 내용은 아래 링크에서 확인하세요.\n\
             {base}/characters/{character_id}\n",
            character = item.character_name,
            name = item.item_name,
            expiry = to_local(item.expiry_at).format("%Y-%m-%d %H:%M"),
            base = service_base_url.trim_end_matches('/'),
            character_id = item.character_id,
        ),
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

pub struct Notifier {
    notifications: Arc<dyn NotificationStore>,
    cache: Arc<dyn FastCache>,
    mailer: Arc<dyn Mailer>,
    notif_ttl: Duration,
    service_base_url: String,
}

impl Notifier {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        cache: Arc<dyn FastCache>,
        mailer: Arc<dyn Mailer>,
        notif_ttl: Duration,
        service_base_url: String,
    ) -> Self {
        Self {
            notifications,
            cache,
            mailer,
            notif_ttl,
            service_base_url,
        }
    }

    /// Run every gate and send one expiry email.
    pub async fn dispatch(
        &self,
        user: &User,
        candidate: &ExpiryCandidate,
        now: Timestamp,
    ) -> Result<DispatchOutcome, sqlx::Error> {
        if !user.notification_enabled {
            return Ok(DispatchOutcome::Skipped(SkipReason::Disabled));
        }
        let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) else {
            return Ok(DispatchOutcome::Skipped(SkipReason::NoEmail));
        };

        if let Some(settings) = self.notifications.get_settings(user.id).await? {
            if let Err(reason) = schedule_allows(
                &settings,
                candidate.checkpoint,
                &candidate.item.item_type,
                now,
            ) {
                return Ok(DispatchOutcome::Skipped(reason));
            }
        }

        let item = &candidate.item;
        let source = item.item_source();
        let key = cache_keys::notification_sent(source, item.item_id, candidate.checkpoint);
        if self.already_sent(&key, candidate).await? {
            return Ok(DispatchOutcome::Skipped(SkipReason::AlreadySent));
        }

        let message = expiry_email(email, candidate, &self.service_base_url);
        let mut last_error = String::new();
        for attempt in 0..=MAX_SEND_RETRIES {
            match self.mailer.send(&message).await {
                Ok(()) => {
                    self.record(user, candidate, true, None).await?;
                    if let Err(e) = self.cache.set_ex(&key, "1", self.notif_ttl).await {
                        tracing::warn!(key = %key, error = %e, "Failed to set notification key");
                    }
                    tracing::info!(
                        user_id = user.id,
                        item_id = item.item_id,
                        checkpoint = %candidate.checkpoint,
                        "Expiry notification sent",
                    );
                    return Ok(DispatchOutcome::Sent);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        item_id = item.item_id,
                        error = %e,
                        "Expiry email failed",
                    );
                    last_error = e.to_string();
                }
            }
        }

        self.record(user, candidate, false, Some(last_error)).await?;
        tracing::error!(
            user_id = user.id,
            item_id = item.item_id,
            checkpoint = %candidate.checkpoint,
            "Expiry notification failed after retries",
        );
        Ok(DispatchOutcome::Failed)
    }

    async fn already_sent(&self, key: &str, candidate: &ExpiryCandidate) -> Result<bool, sqlx::Error> {
        match self.cache.exists(key).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => tracing::warn!(key, error = %e, "Notification key lookup failed"),
        }
        self.notifications
            .exists_success(
                candidate.item.item_id,
                candidate.item.item_source(),
                candidate.checkpoint,
            )
            .await
    }

    async fn record(
        &self,
        user: &User,
        candidate: &ExpiryCandidate,
        success: bool,
        error: Option<String>,
    ) -> Result<(), sqlx::Error> {
        let item = &candidate.item;
        let created = self
            .notifications
            .create_notification(&CreateNotification {
                user_id: user.id,
                item_id: item.item_id,
                item_source: item.item_source(),
                item_name: item.item_name.clone(),
                character_name: item.character_name.clone(),
                checkpoint: candidate.checkpoint,
                channel: CHANNEL_EMAIL.to_string(),
                expiry_at: item.expiry_at,
                success,
                error,
            })
            .await?;
        if created.is_none() {
            tracing::warn!(item_id = item.item_id, "Successful notification already recorded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn settings() -> NotificationSettings {
        NotificationSettings {
            user_id: 1,
            notify_d7: true,
            notify_d3: true,
            notify_d1: true,
            category_filter: None,
            quiet_start: None,
            quiet_end: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn quiet_hours_wrap_midnight() {
        assert!(in_quiet_hours(time(22, 0), time(7, 0), time(23, 30)));
        assert!(in_quiet_hours(time(22, 0), time(7, 0), time(6, 59)));
        assert!(!in_quiet_hours(time(22, 0), time(7, 0), time(7, 0)));
        assert!(in_quiet_hours(time(13, 0), time(14, 0), time(13, 30)));
        assert!(!in_quiet_hours(time(9, 0), time(9, 0), time(9, 0)));
    }

    #[test]
    fn quiet_hours_use_vendor_local_time() {
        let s = NotificationSettings {
            quiet_start: Some(time(0, 0)),
            quiet_end: Some(time(8, 0)),
            ..settings()
        };
        // 15:30 UTC is 00:30 KST.
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap();
        assert_eq!(
            schedule_allows(&s, Checkpoint::D3, "cash", now),
            Err(SkipReason::QuietHours)
        );
        let noon_kst = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
        assert_eq!(schedule_allows(&s, Checkpoint::D3, "cash", noon_kst), Ok(()));
    }

    #[test]
    fn checkpoint_toggles_spare_expired() {
        let s = NotificationSettings {
            notify_d7: false,
            notify_d3: false,
            notify_d1: false,
            ..settings()
        };
        let now = Utc::now();
        assert_eq!(
            schedule_allows(&s, Checkpoint::D7, "cash", now),
            Err(SkipReason::CheckpointOff)
        );
        assert_eq!(schedule_allows(&s, Checkpoint::Expired, "cash", now), Ok(()));
    }

    #[test]
    fn category_filter_matches_item_type() {
        let s = NotificationSettings {
            category_filter: Some(vec!["cash".into()]),
            ..settings()
        };
        let now = Utc::now();
        assert_eq!(schedule_allows(&s, Checkpoint::D1, "cash", now), Ok(()));
        assert_eq!(
            schedule_allows(&s, Checkpoint::D1, "equip", now),
            Err(SkipReason::CategoryFiltered)
        );
    }

    #[test]
    fn email_mentions_item_and_link() {
        let candidate = ExpiryCandidate {
            item: ExpiringItem {
                item_id: 7,
                source: "inventory".into(),
                item_name: "원더 블랙".into(),
                item_type: "cash".into(),
                expiry_at: Utc.with_ymd_and_hms(2024, 6, 4, 14, 59, 0).unwrap(),
                character_id: "ocid-1".into(),
                character_name: "메이플용사".into(),
                user_id: Some(1),
            },
            checkpoint: Checkpoint::D3,
            days_left: 3,
        };
        let message = expiry_email("owner@example.com", &candidate, "https://mapletrack.app/");
        assert!(message.subject.contains("D-3"));
        assert!(message.body.contains("3일 남았습니다"));
        assert!(message.body.contains("2024-06-04 23:59"));
        assert!(message.body.contains("https://mapletrack.app/characters/ocid-1"));
    }
}
