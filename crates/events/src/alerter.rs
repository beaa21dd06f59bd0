//! Periodic success-rate alerts.
//!
//! Each tick reads the last 24 hours from the [`Monitor`]. A rate below the
//! critical threshold goes to email and the chat webhook; a rate below the
//! warning threshold goes to email only. A per-level marker in the fast
//! cache suppresses repeats until it expires. Every failure here is logged
//! and swallowed.

use std::sync::Arc;
use std::time::Duration;

use mapletrack_cache::{CacheError, FastCache};
use mapletrack_core::cache_keys::{self, AlertLevel};
use mapletrack_core::config::CrawlerConfig;
use tokio_util::sync::CancellationToken;

use crate::delivery::email::{EmailMessage, Mailer};
use crate::delivery::webhook::{ChatMessage, WebhookSink};
use crate::monitor::{ErrorBreakdown, Monitor, SuccessRate};

/// How often the alerter evaluates the success rate.
pub const ALERT_CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Window the alert rate is computed over.
const ALERT_WINDOW_HOURS: u32 = 24;

const WEBHOOK_USERNAME: &str = "MapleTrack Monitor";

/// Alert thresholds and destinations.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    /// Lifetime of the per-level marker.
    pub cooldown: Duration,
    pub alert_email: Option<String>,
    pub webhook_url: Option<String>,
}

impl AlertConfig {
    pub fn from_crawler(config: &CrawlerConfig) -> Self {
        Self {
            warning_threshold: config.warning_threshold,
            critical_threshold: config.critical_threshold,
            cooldown: Duration::from_secs(config.alert_cooldown_s),
            alert_email: config.alert_email.clone(),
            webhook_url: config.webhook_url.clone(),
        }
    }

    /// The level a rate falls in; critical wins over warning.
    pub fn level_for(&self, rate: f64) -> Option<AlertLevel> {
        if rate < self.critical_threshold {
            Some(AlertLevel::Critical)
        } else if rate < self.warning_threshold {
            Some(AlertLevel::Warning)
        } else {
            None
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was recorded in the window.
    NoTraffic,
    Healthy,
    /// The level's marker was still set.
    Suppressed(AlertLevel),
    Sent(AlertLevel),
}

// ---------------------------------------------------------------------------
// Alerter
// ---------------------------------------------------------------------------

pub struct Alerter {
    monitor: Arc<Monitor>,
    cache: Arc<dyn FastCache>,
    mailer: Option<Arc<dyn Mailer>>,
    webhook: Arc<dyn WebhookSink>,
    config: AlertConfig,
}

impl Alerter {
    pub fn new(
        monitor: Arc<Monitor>,
        cache: Arc<dyn FastCache>,
        mailer: Option<Arc<dyn Mailer>>,
        webhook: Arc<dyn WebhookSink>,
        config: AlertConfig,
    ) -> Self {
        Self {
            monitor,
            cache,
            mailer,
            webhook,
            config,
        }
    }

    /// Evaluate every [`ALERT_CHECK_INTERVAL`] until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(ALERT_CHECK_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Alerter cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(outcome) => tracing::debug!(?outcome, "Alert check finished"),
                        Err(e) => tracing::error!(error = %e, "Alert check failed"),
                    }
                }
            }
        }
    }

    /// One evaluation: read the rate, pick a level, dispatch unless suppressed.
    pub async fn tick(&self) -> Result<TickOutcome, CacheError> {
        let rate = self.monitor.success_rate(ALERT_WINDOW_HOURS).await?;
        if rate.total == 0 {
            return Ok(TickOutcome::NoTraffic);
        }

        let Some(level) = self.config.level_for(rate.exact()) else {
            return Ok(TickOutcome::Healthy);
        };

        let marker = cache_keys::alert_marker(level);
        if self.cache.exists(&marker).await? {
            tracing::debug!(level = level.as_str(), "Alert suppressed by marker");
            return Ok(TickOutcome::Suppressed(level));
        }

        let breakdown = self.monitor.error_breakdown(ALERT_WINDOW_HOURS).await?;
        self.dispatch(level, &rate, &breakdown).await;

        self.cache
            .set_ex(&marker, "1", self.config.cooldown)
            .await?;
        tracing::info!(level = level.as_str(), rate = rate.rate, "Crawl alert sent");
        Ok(TickOutcome::Sent(level))
    }

    async fn dispatch(&self, level: AlertLevel, rate: &SuccessRate, breakdown: &ErrorBreakdown) {
        let text = alert_text(level, rate, breakdown);

        match (&self.mailer, &self.config.alert_email) {
            (Some(mailer), Some(to)) => {
                let message = EmailMessage {
                    to: to.clone(),
                    subject: alert_subject(level, rate),
                    body: text.clone(),
                };
                if let Err(e) = mailer.send(&message).await {
                    tracing::error!(level = level.as_str(), error = %e, "Alert email failed");
                }
            }
            _ => tracing::warn!(level = level.as_str(), "No alert email channel configured"),
        }

        if level == AlertLevel::Critical {
            if let Some(url) = &self.config.webhook_url {
                let message = ChatMessage {
                    text,
                    username: WEBHOOK_USERNAME.to_string(),
                    icon_emoji: ":rotating_light:".to_string(),
                };
                if let Err(e) = self.webhook.post(url, &message).await {
                    tracing::error!(error = %e, "Alert webhook failed");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Message text
// ---------------------------------------------------------------------------

fn level_label(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Critical => "심각",
        AlertLevel::Warning => "경고",
    }
}

fn alert_subject(level: AlertLevel, rate: &SuccessRate) -> String {
    format!(
        "[MapleTrack {}] 크롤링 성공률 {:.2}%",
        level_label(level),
        rate.rate
    )
}

fn alert_text(level: AlertLevel, rate: &SuccessRate, breakdown: &ErrorBreakdown) -> String {
    let mut text = format!(
        "[{}] 최근 {ALERT_WINDOW_HOURS}시간 크롤링 성공률이 {:.2}%입니다.\n\
         전체 {}건 / 성공 {}건 / 실패 {}건\n\n오류 유형별 건수\n",
        level_label(level),
        rate.rate,
        rate.total,
        rate.success,
        rate.failure,
    );
    for (kind, count) in breakdown {
        text.push_str(&format!("- {}: {count}\n", kind.as_str()));
    }
    text
}

#[cfg(test)]
mod tests {
    use mapletrack_core::error_kind::ErrorKind;

    use super::*;

    fn config() -> AlertConfig {
        AlertConfig {
            warning_threshold: 95.0,
            critical_threshold: 80.0,
            cooldown: Duration::from_secs(3600),
            alert_email: None,
            webhook_url: None,
        }
    }

    #[test]
    fn thresholds_are_exclusive() {
        let c = config();
        assert_eq!(c.level_for(79.99), Some(AlertLevel::Critical));
        assert_eq!(c.level_for(80.0), Some(AlertLevel::Warning));
        assert_eq!(c.level_for(94.99), Some(AlertLevel::Warning));
        assert_eq!(c.level_for(95.0), None);
        assert_eq!(c.level_for(100.0), None);
    }

    #[test]
    fn threshold_uses_unrounded_rate() {
        let rate = SuccessRate {
            rate: 80.0,
            total: 25_000,
            success: 19_999,
            failure: 5_001,
        };
        assert_eq!(config().level_for(rate.exact()), Some(AlertLevel::Critical));
    }

    #[test]
    fn text_lists_every_kind() {
        let rate = SuccessRate {
            rate: 75.0,
            total: 100,
            success: 75,
            failure: 25,
        };
        let breakdown: ErrorBreakdown = ErrorKind::ALL.iter().map(|k| (*k, 0)).collect();
        let text = alert_text(AlertLevel::Critical, &rate, &breakdown);
        assert!(text.contains("75.00%"));
        for kind in ErrorKind::ALL {
            assert!(text.contains(kind.as_str()));
        }
    }
}
