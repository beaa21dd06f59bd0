//! Crawl pipeline tuning knobs.

use std::str::FromStr;
use std::time::Duration;

/// Pipeline configuration loaded from environment variables.
///
/// All fields have defaults matching production behaviour; tests build
/// the struct directly with shorter intervals.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Vendor REST API key sent with every request.
    pub api_key: String,
    pub api_base_url: String,
    /// Origin of the vendor web pages (ranking and character pages).
    pub site_origin: String,
    pub api_rate_per_sec: u32,
    /// Item-detail walk gap bounds.
    pub browser_delay_min_s: f64,
    pub browser_delay_max_s: f64,
    /// Same-host gap between any two page loads.
    pub page_gap_min_s: f64,
    pub page_gap_max_s: f64,
    pub detail_batch_size: usize,
    pub detail_batch_rest_s: u64,
    pub navigation_timeout_s: u64,
    pub content_wait_s: u64,
    pub rest_timeout_s: u64,
    pub recency_window_s: i64,
    pub retry_base_s: u64,
    pub retry_max_attempts: u32,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub alert_cooldown_s: u64,
    pub task_status_ttl_s: u64,
    pub stats_ttl_s: u64,
    pub notif_ttl_s: u64,
    pub shared_storage_ttl_s: u64,
    pub ocid_ttl_s: u64,
    /// Public base URL of this service, used for links in emails.
    pub service_base_url: String,
    pub alert_email: Option<String>,
    pub webhook_url: Option<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://open.api.nexon.com/maplestory/v1".into(),
            site_origin: "https://maplestory.nexon.com".into(),
            api_rate_per_sec: 500,
            browser_delay_min_s: 2.0,
            browser_delay_max_s: 3.0,
            page_gap_min_s: 2.0,
            page_gap_max_s: 5.0,
            detail_batch_size: 50,
            detail_batch_rest_s: 30,
            navigation_timeout_s: 30,
            content_wait_s: 10,
            rest_timeout_s: 10,
            recency_window_s: 3600,
            retry_base_s: 60,
            retry_max_attempts: 3,
            warning_threshold: 95.0,
            critical_threshold: 80.0,
            alert_cooldown_s: 3600,
            task_status_ttl_s: 3600,
            stats_ttl_s: 604_800,
            notif_ttl_s: 604_800,
            shared_storage_ttl_s: 3600,
            ocid_ttl_s: 3600,
            service_base_url: "http://localhost:3000".into(),
            alert_email: None,
            webhook_url: None,
        }
    }
}

impl CrawlerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                     |
    /// |--------------------------|---------------------------------------------|
    /// | `NEXON_API_KEY`          | (empty)                                     |
    /// | `NEXON_API_BASE_URL`     | `https://open.api.nexon.com/maplestory/v1`  |
    /// | `VENDOR_SITE_ORIGIN`     | `https://maplestory.nexon.com`              |
    /// | `API_RATE_PER_SEC`       | `500`                                       |
    /// | `BROWSER_DELAY_MIN_S`    | `2.0`                                       |
    /// | `BROWSER_DELAY_MAX_S`    | `3.0`                                       |
    /// | `PAGE_GAP_MIN_S`         | `2.0`                                       |
    /// | `PAGE_GAP_MAX_S`         | `5.0`                                       |
    /// | `DETAIL_BATCH_SIZE`      | `50`                                        |
    /// | `DETAIL_BATCH_REST_S`    | `30`                                        |
    /// | `NAVIGATION_TIMEOUT_S`   | `30`                                        |
    /// | `CONTENT_WAIT_S`         | `10`                                        |
    /// | `REST_TIMEOUT_S`         | `10`                                        |
    /// | `RECENCY_WINDOW_S`       | `3600`                                      |
    /// | `RETRY_BASE_S`           | `60`                                        |
    /// | `RETRY_MAX_ATTEMPTS`     | `3`                                         |
    /// | `WARNING_THRESHOLD`      | `95.0`                                      |
    /// | `CRITICAL_THRESHOLD`     | `80.0`                                      |
    /// | `ALERT_COOLDOWN_S`       | `3600`                                      |
    /// | `TASK_STATUS_TTL_S`      | `3600`                                      |
    /// | `STATS_TTL_S`            | `604800`                                    |
    /// | `NOTIF_TTL_S`            | `604800`                                    |
    /// | `SERVICE_BASE_URL`       | `http://localhost:3000`                     |
    /// | `ALERT_EMAIL`            | (unset)                                     |
    /// | `WEBHOOK_URL`            | (unset)                                     |
    ///
    /// Unparseable numbers fall back to the default with a warning.
    pub fn from_env() -> Self {
        let d = Self::default();

        let mut cfg = Self {
            api_key: std::env::var("NEXON_API_KEY").unwrap_or_default(),
            api_base_url: env_string("NEXON_API_BASE_URL", d.api_base_url),
            site_origin: env_string("VENDOR_SITE_ORIGIN", d.site_origin),
            api_rate_per_sec: env_parse("API_RATE_PER_SEC", d.api_rate_per_sec),
            browser_delay_min_s: env_seconds("BROWSER_DELAY_MIN_S", d.browser_delay_min_s),
            browser_delay_max_s: env_seconds("BROWSER_DELAY_MAX_S", d.browser_delay_max_s),
            page_gap_min_s: env_seconds("PAGE_GAP_MIN_S", d.page_gap_min_s),
            page_gap_max_s: env_seconds("PAGE_GAP_MAX_S", d.page_gap_max_s),
            detail_batch_size: env_parse("DETAIL_BATCH_SIZE", d.detail_batch_size),
            detail_batch_rest_s: env_parse("DETAIL_BATCH_REST_S", d.detail_batch_rest_s),
            navigation_timeout_s: env_parse("NAVIGATION_TIMEOUT_S", d.navigation_timeout_s),
            content_wait_s: env_parse("CONTENT_WAIT_S", d.content_wait_s),
            rest_timeout_s: env_parse("REST_TIMEOUT_S", d.rest_timeout_s),
            recency_window_s: env_parse("RECENCY_WINDOW_S", d.recency_window_s),
            retry_base_s: env_parse("RETRY_BASE_S", d.retry_base_s),
            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS", d.retry_max_attempts),
            warning_threshold: env_finite("WARNING_THRESHOLD", d.warning_threshold),
            critical_threshold: env_finite("CRITICAL_THRESHOLD", d.critical_threshold),
            alert_cooldown_s: env_parse("ALERT_COOLDOWN_S", d.alert_cooldown_s),
            task_status_ttl_s: env_parse("TASK_STATUS_TTL_S", d.task_status_ttl_s),
            stats_ttl_s: env_parse("STATS_TTL_S", d.stats_ttl_s),
            notif_ttl_s: env_parse("NOTIF_TTL_S", d.notif_ttl_s),
            shared_storage_ttl_s: d.shared_storage_ttl_s,
            ocid_ttl_s: d.ocid_ttl_s,
            service_base_url: env_string("SERVICE_BASE_URL", d.service_base_url),
            alert_email: env_optional("ALERT_EMAIL"),
            webhook_url: env_optional("WEBHOOK_URL"),
        };

        if cfg.api_rate_per_sec == 0 {
            tracing::warn!("API_RATE_PER_SEC must be positive, using default");
            cfg.api_rate_per_sec = d.api_rate_per_sec;
        }
        if cfg.browser_delay_max_s < cfg.browser_delay_min_s {
            tracing::warn!("BROWSER_DELAY_MAX_S below BROWSER_DELAY_MIN_S, clamping");
            cfg.browser_delay_max_s = cfg.browser_delay_min_s;
        }
        if cfg.page_gap_max_s < cfg.page_gap_min_s {
            tracing::warn!("PAGE_GAP_MAX_S below PAGE_GAP_MIN_S, clamping");
            cfg.page_gap_max_s = cfg.page_gap_min_s;
        }
        if cfg.detail_batch_size == 0 {
            cfg.detail_batch_size = d.detail_batch_size;
        }

        cfg
    }

    pub fn rest_timeout(&self) -> Duration {
        Duration::from_secs(self.rest_timeout_s)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_s)
    }

    pub fn content_wait(&self) -> Duration {
        Duration::from_secs(self.content_wait_s)
    }

    pub fn shared_storage_ttl(&self) -> Duration {
        Duration::from_secs(self.shared_storage_ttl_s)
    }

    /// Back-off before retry number `retry_count` (0-indexed).
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        Duration::from_secs(self.retry_base_s.saturating_mul(1u64 << retry_count.min(16)))
    }
}

/// `name` if set and non-blank, else `default`.
pub fn env_string(name: &str, default: String) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

pub fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse `name`, falling back to `default` with a warning when unparseable.
pub fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(var = name, value = %raw, default = %default, "Invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// A float option; `inf` and `NaN` parse but are rejected.
pub fn env_finite(name: &str, default: f64) -> f64 {
    checked_f64(name, env_parse(name, default), default, false)
}

/// A non-negative, finite number of seconds.
pub fn env_seconds(name: &str, default: f64) -> f64 {
    checked_f64(name, env_parse(name, default), default, true)
}

fn checked_f64(name: &str, value: f64, default: f64, non_negative: bool) -> f64 {
    if !value.is_finite() || (non_negative && value < 0.0) {
        tracing::warn!(var = name, value, default, "Out-of-range value, using default");
        return default;
    }
    value
}
