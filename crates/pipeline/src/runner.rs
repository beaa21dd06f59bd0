//! Executes one crawl task: URL resolution, ordered sub-steps, back-off
//! and retry, then the terminal write and the monitor record.

use std::collections::BTreeSet;
use std::sync::Arc;

use mapletrack_cache::FastCache;
use mapletrack_core::cache_keys::{self, Outcome};
use mapletrack_core::config::CrawlerConfig;
use mapletrack_core::error_kind::ErrorKind;
use mapletrack_core::subtype::CrawlSubtype;
use mapletrack_core::task_status::CrawlStatus;
use mapletrack_core::types::TaskId;
use mapletrack_db::models::character::Character;
use mapletrack_db::Stores;
use mapletrack_events::Monitor;
use mapletrack_vendor::{CharacterApi, PageSource};

use crate::error::CrawlError;
use crate::status::{TaskFailure, TaskStatusStore, TaskTransition};
use crate::steps::{self, StepPartial};

/// Everything a run talks to.
#[derive(Clone)]
pub struct CrawlDeps {
    pub stores: Stores,
    pub cache: Arc<dyn FastCache>,
    pub api: Arc<dyn CharacterApi>,
    pub pages: Arc<dyn PageSource>,
    pub monitor: Arc<Monitor>,
    pub config: Arc<CrawlerConfig>,
}

/// A accepted task handed to the runner.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub task_id: TaskId,
    pub character_id: String,
    pub subtypes: BTreeSet<CrawlSubtype>,
}

type Partials = serde_json::Map<String, serde_json::Value>;

/// Progress shown while sub-step `index` of `total` runs. Stays below 100
/// until the terminal success write.
fn step_progress(index: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let pct = (index * 100 / total) as i32;
    pct.min(99)
}

pub struct CrawlRunner {
    deps: CrawlDeps,
    statuses: Arc<TaskStatusStore>,
}

impl CrawlRunner {
    pub fn new(deps: CrawlDeps, statuses: Arc<TaskStatusStore>) -> Self {
        Self { deps, statuses }
    }

    /// Drive a task to `success` or `failure`.
    pub async fn run(&self, job: CrawlJob) -> CrawlStatus {
        let max_retries = self.deps.config.retry_max_attempts;
        let mut retry_count: u32 = 0;

        tracing::info!(
            task_id = %job.task_id,
            character_id = %job.character_id,
            subtypes = ?job.subtypes,
            "Crawl run started",
        );

        loop {
            let mut partials = Partials::new();
            let error = match self.attempt(&job, retry_count, &mut partials).await {
                Ok(()) => {
                    self.succeed(&job, retry_count, partials).await;
                    return CrawlStatus::Success;
                }
                Err(e) => e,
            };

            if error.kind.is_retryable() && retry_count < max_retries {
                let delay = self.deps.config.retry_delay(retry_count);
                tracing::warn!(
                    task_id = %job.task_id,
                    retry_count,
                    error_kind = %error.kind,
                    error = %error.detail,
                    delay_s = delay.as_secs(),
                    "Crawl attempt failed, retry scheduled",
                );
                self.write(
                    &job,
                    TaskTransition::new(CrawlStatus::Retry, 0, retry_count as i32)
                        .failure(failure_of(&error))
                        .result(serde_json::Value::Object(partials)),
                )
                .await;

                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            self.fail(&job, retry_count, error, partials).await;
            return CrawlStatus::Failure;
        }
    }

    async fn attempt(
        &self,
        job: &CrawlJob,
        retry_count: u32,
        partials: &mut Partials,
    ) -> Result<(), CrawlError> {
        let retry_count = retry_count as i32;
        self.write(
            job,
            TaskTransition::new(CrawlStatus::Started, 0, retry_count),
        )
        .await;

        let character = self
            .deps
            .stores
            .characters
            .find_character(&job.character_id)
            .await?
            .ok_or_else(|| {
                CrawlError::new(
                    ErrorKind::CharacterNotFound,
                    format!("no identity record for {}", job.character_id),
                )
            })?;

        let base_url = if job.subtypes.iter().any(CrawlSubtype::needs_character_url) {
            Some(self.resolve_base_url(&character).await?)
        } else {
            None
        };

        let total = job.subtypes.len();
        for (index, sub) in job.subtypes.iter().copied().enumerate() {
            self.write(
                job,
                TaskTransition::new(CrawlStatus::Started, step_progress(index, total), retry_count)
                    .message(format!("{sub} 수집 중")),
            )
            .await;

            match self.dispatch(sub, &character, base_url.as_deref()).await {
                Ok(partial) => {
                    tracing::debug!(task_id = %job.task_id, step = %sub, status = ?partial.status, "Step finished");
                    partials.insert(sub.as_str().to_string(), partial.to_json());
                }
                // Unclassifiable failures stay local to their step.
                Err(e) if e.kind == ErrorKind::Unknown => {
                    tracing::warn!(task_id = %job.task_id, step = %sub, error = %e, "Step failed");
                    partials.insert(sub.as_str().to_string(), StepPartial::error(&e).to_json());
                }
                Err(e) => return Err(e.context(sub.as_str())),
            }
        }

        Ok(())
    }

    /// Fresh character-page URL for this attempt; the token is never reused.
    async fn resolve_base_url(&self, character: &Character) -> Result<String, CrawlError> {
        let url = self
            .deps
            .pages
            .resolve_character_info_url(&character.name)
            .await
            .map_err(|e| CrawlError::from(e).context("character url"))?;
        self.deps
            .stores
            .characters
            .update_base_url(&character.ocid, &url)
            .await?;
        Ok(url)
    }

    async fn dispatch(
        &self,
        sub: CrawlSubtype,
        character: &Character,
        base_url: Option<&str>,
    ) -> Result<StepPartial, CrawlError> {
        let deps = &self.deps;
        match (sub, base_url) {
            (CrawlSubtype::ApiData, _) => steps::api_data(deps, character).await,
            (CrawlSubtype::ItemDetails, _) => steps::item_details(deps, character).await,
            (CrawlSubtype::Inventory, Some(url)) => steps::inventory(deps, character, url).await,
            (CrawlSubtype::Storage, Some(url)) => steps::storage(deps, character, url).await,
            (CrawlSubtype::Meso, Some(url)) => steps::meso(deps, character, url).await,
            (sub, None) => Err(CrawlError::new(
                ErrorKind::Unknown,
                format!("{sub} requires a character page URL"),
            )),
        }
    }

    async fn succeed(&self, job: &CrawlJob, retry_count: u32, partials: Partials) {
        self.write(
            job,
            TaskTransition::new(CrawlStatus::Success, 100, retry_count as i32)
                .result(serde_json::Value::Object(partials)),
        )
        .await;

        let keys = cache_keys::character_read_caches(&job.character_id);
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        if let Err(e) = self.deps.cache.del(&refs).await {
            tracing::warn!(character_id = %job.character_id, error = %e, "Read cache invalidation failed");
        }

        self.deps
            .monitor
            .record(job.task_id, Outcome::Success, None)
            .await;
        tracing::info!(task_id = %job.task_id, retry_count, "Crawl run succeeded");
    }

    async fn fail(&self, job: &CrawlJob, retry_count: u32, error: CrawlError, partials: Partials) {
        self.write(
            job,
            TaskTransition::new(CrawlStatus::Failure, 0, retry_count as i32)
                .failure(failure_of(&error))
                .result(serde_json::Value::Object(partials)),
        )
        .await;

        self.deps
            .monitor
            .record(job.task_id, Outcome::Failure, Some(error.kind))
            .await;
        tracing::error!(
            task_id = %job.task_id,
            retry_count,
            error_kind = %error.kind,
            error = %error.detail,
            "Crawl run failed",
        );
    }

    async fn write(&self, job: &CrawlJob, transition: TaskTransition) {
        let status = transition.status;
        if let Err(e) = self
            .statuses
            .transition(job.task_id, &job.character_id, transition)
            .await
        {
            tracing::error!(task_id = %job.task_id, %status, error = %e, "Failed to persist task status");
        }
    }
}

fn failure_of(error: &CrawlError) -> TaskFailure {
    TaskFailure {
        kind: error.kind,
        detail: error.detail.clone(),
        technical: error.technical.clone(),
    }
}
