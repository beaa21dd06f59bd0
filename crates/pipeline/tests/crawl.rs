//! End-to-end crawl runs against in-process stores and fake vendor sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use mapletrack_cache::{FastCache, MemoryCache};
use mapletrack_core::cache_keys;
use mapletrack_core::config::CrawlerConfig;
use mapletrack_core::error_kind::ErrorKind;
use mapletrack_core::subtype::CrawlSubtype;
use mapletrack_core::task_status::CrawlStatus;
use mapletrack_core::time::local_date;
use mapletrack_core::types::{TaskId, Timestamp};
use mapletrack_db::models::character::RegisterCharacter;
use mapletrack_db::models::task::{CreateCrawlTask, UpdateCrawlTask};
use mapletrack_db::{CharacterStore, ItemStore, MemoryStore, Stores, TaskStore};
use mapletrack_events::Monitor;
use mapletrack_pipeline::{
    CrawlDecision, CrawlDeps, CrawlRequest, CrawlScheduler, ScheduleError,
};
use mapletrack_vendor::api::{
    CharacterBasicResponse, FinalStat, PopularityResponse, StatResponse,
};
use mapletrack_vendor::{ApiError, BrowserError, CharacterApi, PageSource, SubPage};

const INVENTORY_HTML: &str = include_str!("../../parsers/tests/fixtures/inventory.html");
const STORAGE_HTML: &str = include_str!("../../parsers/tests/fixtures/storage.html");
const DETAIL_HTML: &str = include_str!("../../parsers/tests/fixtures/item_detail.html");
const MESO_HTML: &str = r#"<div class="char_info_tb"><table><tr><td class="meso"><span>1,234,567</span></td></tr></table></div>"#;

const OCID: &str = "ocid-hero";
const CHARACTER_URL: &str = "https://maplestory.nexon.com/Common/Character/Detail/MapleHero?p=TOKEN";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
enum ApiMode {
    Healthy,
    TimesOut,
    Gone,
    Forbidden,
}

struct FakeApi {
    mode: ApiMode,
    basic_calls: AtomicUsize,
}

impl FakeApi {
    fn new(mode: ApiMode) -> Self {
        Self {
            mode,
            basic_calls: AtomicUsize::new(0),
        }
    }

    fn check(&self) -> Result<(), ApiError> {
        match self.mode {
            ApiMode::Healthy => Ok(()),
            ApiMode::TimesOut => Err(ApiError::Transient {
                status: None,
                timed_out: true,
                message: "operation timed out".into(),
            }),
            ApiMode::Gone => Err(ApiError::NotFound("character does not exist".into())),
            ApiMode::Forbidden => Err(ApiError::FatalClient {
                status: 403,
                message: "invalid api key".into(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl CharacterApi for FakeApi {
    async fn resolve_character_id(&self, _name: &str) -> Result<String, ApiError> {
        self.check()?;
        Ok(OCID.into())
    }

    async fn fetch_basic(&self, _character_id: &str) -> Result<CharacterBasicResponse, ApiError> {
        self.basic_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(CharacterBasicResponse {
            character_name: "메이플용사".into(),
            world_name: Some("스카니아".into()),
            character_class: Some("히어로".into()),
            character_level: 265,
            character_exp: 1_234_567_890,
            character_guild_name: Some("길드".into()),
            character_image: Some("https://open.api.nexon.com/static/hero.png".into()),
            access_flag: Some("true".into()),
        })
    }

    async fn fetch_popularity(&self, _character_id: &str) -> Result<PopularityResponse, ApiError> {
        self.check()?;
        Ok(PopularityResponse { popularity: 42 })
    }

    async fn fetch_stat(&self, _character_id: &str) -> Result<StatResponse, ApiError> {
        self.check()?;
        Ok(StatResponse {
            character_class: Some("히어로".into()),
            final_stat: vec![FinalStat {
                stat_name: "STR".into(),
                stat_value: Some("52000".into()),
            }],
            remain_ap: Some(0),
        })
    }
}

#[derive(Default)]
struct FakePages {
    resolves: AtomicUsize,
    /// Replaces the item detail fixture when set.
    detail_page: Option<&'static str>,
}

#[async_trait::async_trait]
impl PageSource for FakePages {
    async fn resolve_character_info_url(&self, _name: &str) -> Result<String, BrowserError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(CHARACTER_URL.into())
    }

    async fn fetch_subpage(&self, base_url: &str, sub: SubPage) -> Result<String, BrowserError> {
        match sub {
            SubPage::Inventory => Ok(INVENTORY_HTML.into()),
            SubPage::Storage => Ok(STORAGE_HTML.into()),
            SubPage::Main if base_url.contains("p=ITEM2") => Err(BrowserError::Navigation {
                url: base_url.into(),
                message: "net::ERR_CONNECTION_RESET".into(),
            }),
            SubPage::Main if base_url.contains("/Item?p=") => {
                Ok(self.detail_page.unwrap_or(DETAIL_HTML).into())
            }
            SubPage::Main => Ok(MESO_HTML.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
    monitor: Arc<Monitor>,
    api: Arc<FakeApi>,
    pages: Arc<FakePages>,
    deps: CrawlDeps,
    scheduler: CrawlScheduler,
}

fn test_config() -> CrawlerConfig {
    CrawlerConfig {
        browser_delay_min_s: 0.0,
        browser_delay_max_s: 0.0,
        page_gap_min_s: 0.0,
        page_gap_max_s: 0.0,
        detail_batch_rest_s: 0,
        ..CrawlerConfig::default()
    }
}

async fn harness(mode: ApiMode) -> Harness {
    harness_with(mode, FakePages::default()).await
}

async fn harness_with(mode: ApiMode, pages: FakePages) -> Harness {
    let store = Arc::new(MemoryStore::new());
    store
        .register(&RegisterCharacter {
            ocid: OCID.into(),
            name: "메이플용사".into(),
            user_id: None,
        })
        .await
        .unwrap();

    let cache = Arc::new(MemoryCache::new());
    let shared: Arc<dyn FastCache> = cache.clone();
    let monitor = Arc::new(Monitor::new(shared.clone(), Duration::from_secs(7 * 24 * 3600)));
    let api = Arc::new(FakeApi::new(mode));
    let pages = Arc::new(pages);

    let deps = CrawlDeps {
        stores: Stores::shared(store.clone()),
        cache: shared,
        api: api.clone(),
        pages: pages.clone(),
        monitor: monitor.clone(),
        config: Arc::new(test_config()),
    };

    Harness {
        store,
        cache,
        monitor,
        api,
        pages,
        deps: deps.clone(),
        scheduler: CrawlScheduler::new(deps),
    }
}

fn request(subtypes: &[&str], force: bool) -> CrawlRequest {
    CrawlRequest {
        subtypes: subtypes.iter().map(|s| s.to_string()).collect(),
        force,
    }
}

impl Harness {
    /// Submit a request and wait for its run to finish.
    async fn crawl(&self, subtypes: &[&str], force: bool) -> TaskId {
        let decision = self
            .scheduler
            .request(OCID, &request(subtypes, force))
            .await
            .unwrap();
        let task_id = assert_matches!(decision, CrawlDecision::Accepted { task_id, .. } => task_id);
        self.scheduler.wait_idle().await;
        task_id
    }

    /// A finished successful task whose last write was at `at`.
    async fn seed_success(&self, at: Timestamp) {
        let task = self
            .store
            .create_task(&CreateCrawlTask {
                id: uuid::Uuid::now_v7(),
                character_id: OCID.into(),
                subtypes: vec![CrawlSubtype::ApiData],
            })
            .await
            .unwrap();
        self.store
            .update_task(
                task.id,
                &UpdateCrawlTask {
                    status: CrawlStatus::Success,
                    progress: 100,
                    retry_count: 0,
                    error_kind: None,
                    error_detail: None,
                    technical_error: None,
                    result: None,
                },
            )
            .await
            .unwrap();
        self.store.set_task_updated_at(task.id, at);
    }
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn recent_success_short_circuits_unless_forced() {
    let h = harness(ApiMode::Healthy).await;

    h.seed_success(Utc::now() - chrono::Duration::minutes(10)).await;

    let decision = h
        .scheduler
        .request(OCID, &request(&["api_data"], false))
        .await
        .unwrap();
    assert_matches!(
        decision,
        CrawlDecision::RecentlyCrawled { recently_crawled: true, .. }
    );
    assert_eq!(h.store.list_tasks(OCID, 10).await.unwrap().len(), 1);

    let forced = h
        .scheduler
        .request(OCID, &request(&["api_data"], true))
        .await
        .unwrap();
    assert_matches!(
        forced,
        CrawlDecision::Accepted { recently_crawled: false, .. }
    );
    h.scheduler.wait_idle().await;
    assert_eq!(h.store.list_tasks(OCID, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn stale_success_does_not_block() {
    let h = harness(ApiMode::Healthy).await;
    h.seed_success(Utc::now() - chrono::Duration::hours(2)).await;

    let decision = h
        .scheduler
        .request(OCID, &request(&["api_data"], false))
        .await
        .unwrap();
    assert_matches!(decision, CrawlDecision::Accepted { .. });
    h.scheduler.wait_idle().await;
}

#[tokio::test]
async fn unknown_character_is_rejected_before_any_task() {
    let h = harness(ApiMode::Healthy).await;
    let err = h
        .scheduler
        .request("ocid-ghost", &request(&["api_data"], false))
        .await
        .unwrap_err();
    assert_matches!(err, ScheduleError::CharacterNotFound(id) if id == "ocid-ghost");
    assert!(h.store.list_tasks("ocid-ghost", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn bad_subtype_lists_are_rejected() {
    let h = harness(ApiMode::Healthy).await;
    let empty = h.scheduler.request(OCID, &request(&[], false)).await;
    assert_matches!(empty, Err(ScheduleError::Core(_)));

    let unknown = h
        .scheduler
        .request(OCID, &request(&["inventory", "equipment"], false))
        .await;
    assert_matches!(unknown, Err(ScheduleError::Core(_)));
    assert!(h.store.list_tasks(OCID, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn accepted_estimate_includes_url_resolution() {
    let h = harness(ApiMode::Healthy).await;
    let decision = h
        .scheduler
        .request(OCID, &request(&["meso"], true))
        .await
        .unwrap();
    let estimate = assert_matches!(
        decision,
        CrawlDecision::Accepted { estimated_seconds, .. } => estimated_seconds
    );
    assert_eq!(estimate, CrawlSubtype::Meso.estimated_secs() + 10);
    h.scheduler.wait_idle().await;
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn network_timeouts_retry_three_times_then_fail() {
    let h = harness(ApiMode::TimesOut).await;
    let started = tokio::time::Instant::now();

    let task_id = h.crawl(&["api_data"], false).await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(420), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(421), "elapsed {elapsed:?}");
    assert_eq!(h.api.basic_calls.load(Ordering::SeqCst), 4);

    let task = h.store.find_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status(), CrawlStatus::Failure);
    assert_eq!(task.retry_count, 3);
    assert_eq!(task.error_kind(), Some(ErrorKind::NetworkError));

    let breakdown = h.monitor.error_breakdown(24).await.unwrap();
    assert_eq!(breakdown[&ErrorKind::NetworkError], 1);
    let rate = h.monitor.success_rate(24).await.unwrap();
    assert_eq!(rate.failure, 1);
    assert_eq!(rate.success, 0);

    let view = h.scheduler.statuses().status(task_id).await.unwrap().unwrap();
    assert_eq!(view.status, CrawlStatus::Failure);
    assert_eq!(
        view.error_message.as_deref(),
        Some(ErrorKind::NetworkError.user_message())
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_api_key_retries_then_fails_as_network_error() {
    let h = harness(ApiMode::Forbidden).await;

    let task_id = h.crawl(&["api_data"], false).await;

    assert_eq!(h.api.basic_calls.load(Ordering::SeqCst), 4);
    let task = h.store.find_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status(), CrawlStatus::Failure);
    assert_eq!(task.retry_count, 3);
    assert_eq!(task.error_kind(), Some(ErrorKind::NetworkError));

    let breakdown = h.monitor.error_breakdown(24).await.unwrap();
    assert_eq!(breakdown[&ErrorKind::NetworkError], 1);
    let rate = h.monitor.success_rate(24).await.unwrap();
    assert_eq!(rate.success, 0);
    assert_eq!(rate.failure, 1);
}

#[tokio::test(start_paused = true)]
async fn vanished_character_fails_without_retry() {
    let h = harness(ApiMode::Gone).await;
    let started = tokio::time::Instant::now();

    let task_id = h.crawl(&["api_data"], false).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(h.api.basic_calls.load(Ordering::SeqCst), 1);
    let task = h.store.find_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status(), CrawlStatus::Failure);
    assert_eq!(task.retry_count, 0);
    assert_eq!(task.error_kind(), Some(ErrorKind::CharacterNotFound));
}

#[tokio::test]
async fn api_data_refreshes_identity_and_history() {
    let h = harness(ApiMode::Healthy).await;
    let task_id = h.crawl(&["api_data"], false).await;

    let task = h.store.find_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status(), CrawlStatus::Success);
    assert_eq!(task.progress, 100);
    let result = task.result.unwrap();
    assert_eq!(result["api_data"]["status"], "success");
    assert_eq!(result["api_data"]["data"]["popularity"], 42);

    let character = h.store.find_character(OCID).await.unwrap().unwrap();
    assert_eq!(character.level, Some(265));
    assert_eq!(character.popularity, Some(42));
    assert!(character.stat.is_some());
    assert!(character.updated_at.is_some());

    // A second run the same day replaces the snapshot rather than adding one.
    h.crawl(&["api_data"], true).await;
    assert_eq!(h.store.history_for(OCID).len(), 1);

    // REST-only runs never open the character page.
    assert_eq!(h.pages.resolves.load(Ordering::SeqCst), 0);

    let rate = h.monitor.success_rate(24).await.unwrap();
    assert_eq!(rate.success, 2);
}

#[tokio::test]
async fn identity_row_removed_mid_run_is_character_not_found() {
    let h = harness(ApiMode::Healthy).await;
    let character = h.store.find_character(OCID).await.unwrap().unwrap();

    // Same character, but the store no longer has its row.
    let deps = CrawlDeps {
        stores: Stores::shared(Arc::new(MemoryStore::new())),
        ..h.deps.clone()
    };
    let err = mapletrack_pipeline::steps::api_data(&deps, &character)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::CharacterNotFound);
    assert!(!err.kind.is_retryable());
}

#[tokio::test]
async fn inventory_and_storage_runs_accumulate() {
    let h = harness(ApiMode::Healthy).await;

    let first = h.crawl(&["inventory", "storage"], false).await;
    let first_inventory = h.store.list_inventory(OCID).await.unwrap();
    assert_eq!(first_inventory.len(), 4);
    let first_storage = h.store.list_storage(OCID).await.unwrap();
    assert_eq!(first_storage.len(), 3);

    let inv_at = first_inventory[0].crawled_at;
    let storage_at = first_storage[0].crawled_at;
    assert!(first_inventory.iter().all(|i| i.crawled_at == inv_at));
    assert!(first_storage.iter().all(|i| i.crawled_at == storage_at));
    assert_ne!(inv_at, storage_at);

    let task = h.store.find_task(first).await.unwrap().unwrap();
    let result = task.result.unwrap();
    assert_eq!(result["inventory"]["data"]["count"], 4);
    assert_eq!(result["storage"]["data"]["meso"], 3_210_000);
    assert_eq!(h.pages.resolves.load(Ordering::SeqCst), 1);

    h.crawl(&["inventory", "storage"], true).await;
    let inventory = h.store.list_inventory(OCID).await.unwrap();
    assert_eq!(inventory.len(), 8);
    assert!(inventory.iter().any(|i| i.crawled_at == inv_at));
    let newest = inventory[0].crawled_at;
    assert!(newest > inv_at);
    assert_eq!(inventory.iter().filter(|i| i.crawled_at == newest).count(), 4);
    assert_eq!(h.store.list_storage(OCID).await.unwrap().len(), 6);

    // Every run resolves its own page token.
    assert_eq!(h.pages.resolves.load(Ordering::SeqCst), 2);
    let character = h.store.find_character(OCID).await.unwrap().unwrap();
    assert_eq!(character.base_url.as_deref(), Some(CHARACTER_URL));
}

#[tokio::test]
async fn shared_storage_marker_skips_sibling_crawl() {
    let h = harness(ApiMode::Healthy).await;
    let user = h.store.insert_user(Some("owner@example.com"), true);
    h.store
        .register(&RegisterCharacter {
            ocid: "ocid-sibling".into(),
            name: "메이플궁수".into(),
            user_id: Some(user.id),
        })
        .await
        .unwrap();
    h.cache
        .set_ex(&cache_keys::shared_storage(user.id), "1", Duration::from_secs(3600))
        .await
        .unwrap();

    let decision = h
        .scheduler
        .request("ocid-sibling", &request(&["storage"], false))
        .await
        .unwrap();
    let task_id = assert_matches!(decision, CrawlDecision::Accepted { task_id, .. } => task_id);
    h.scheduler.wait_idle().await;

    let task = h.store.find_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status(), CrawlStatus::Success);
    assert_eq!(task.result.unwrap()["storage"]["data"]["skipped"], true);
    assert!(h.store.list_storage("ocid-sibling").await.unwrap().is_empty());
}

#[tokio::test]
async fn meso_only_run_leaves_history_alone() {
    let h = harness(ApiMode::Healthy).await;

    let task_id = h.crawl(&["meso"], false).await;
    let task = h.store.find_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status(), CrawlStatus::Success);
    assert_eq!(task.result.unwrap()["meso"]["data"]["history_updated"], false);

    let character = h.store.find_character(OCID).await.unwrap().unwrap();
    assert_eq!(character.meso, Some(1_234_567));
    assert!(h.store.history_for(OCID).is_empty());

    h.crawl(&["api_data"], true).await;
    let today = local_date(Utc::now());
    let snapshot = h.store.find_history(OCID, today).await.unwrap().unwrap();
    assert_eq!(snapshot.meso, Some(1_234_567));
}

#[tokio::test]
async fn detail_walk_lists_failures_and_keeps_going() {
    let h = harness(ApiMode::Healthy).await;
    h.crawl(&["inventory"], false).await;
    assert_eq!(h.store.pending_detail_items(OCID).await.unwrap().len(), 3);

    let task_id = h.crawl(&["item_details"], true).await;
    let task = h.store.find_task(task_id).await.unwrap().unwrap();
    assert_eq!(task.status(), CrawlStatus::Success);

    let partial = &task.result.unwrap()["item_details"];
    assert_eq!(partial["status"], "success");
    assert_eq!(partial["data"]["pending"], 3);
    assert_eq!(partial["data"]["saved"], 2);
    let failed = partial["data"]["failed_items"].as_array().unwrap();
    assert_eq!(failed.len(), 1);

    // Only the failed row is still waiting for a detail record.
    let pending = h.store.pending_detail_items(OCID).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].detail_url.as_deref().unwrap().contains("p=ITEM2"));
    assert!(h.store.detail_for(failed[0]["id"].as_i64().unwrap()).is_none());
}

#[tokio::test]
async fn blank_detail_pages_are_per_item_failures() {
    let pages = FakePages {
        detail_page: Some("<html><body><p>서비스 점검 중입니다.</p></body></html>"),
        ..FakePages::default()
    };
    let h = harness_with(ApiMode::Healthy, pages).await;
    h.crawl(&["inventory"], false).await;
    let pending = h.store.pending_detail_items(OCID).await.unwrap();
    assert_eq!(pending.len(), 3);

    let task_id = h.crawl(&["item_details"], true).await;
    let task = h.store.find_task(task_id).await.unwrap().unwrap();
    let partial = &task.result.unwrap()["item_details"];
    assert_eq!(partial["data"]["saved"], 0);
    assert_eq!(partial["data"]["failed_items"].as_array().unwrap().len(), 3);

    // Nothing was marked as having a detail record.
    assert_eq!(h.store.pending_detail_items(OCID).await.unwrap().len(), 3);
    for item in &pending {
        assert!(h.store.detail_for(item.id).is_none());
    }
}

#[tokio::test]
async fn success_invalidates_character_read_caches() {
    let h = harness(ApiMode::Healthy).await;
    for key in cache_keys::character_read_caches(OCID) {
        h.cache
            .set_ex(&key, "{}", Duration::from_secs(600))
            .await
            .unwrap();
    }

    h.crawl(&["api_data"], false).await;

    for key in cache_keys::character_read_caches(OCID) {
        assert!(!h.cache.exists(&key).await.unwrap(), "{key} survived");
    }
}
