//! Crawl request handling: validation, the recency gate, task creation
//! and hand-off to a background run.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mapletrack_core::subtype::{estimate_secs, parse_subtypes};
use mapletrack_core::types::{TaskId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;

use crate::error::ScheduleError;
use crate::runner::{CrawlDeps, CrawlJob, CrawlRunner};
use crate::status::TaskStatusStore;

/// Body of a crawl request.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlRequest {
    pub subtypes: Vec<String>,
    #[serde(default)]
    pub force: bool,
}

/// Answer to a crawl request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrawlDecision {
    Accepted {
        task_id: TaskId,
        estimated_seconds: u32,
        recently_crawled: bool,
    },
    RecentlyCrawled {
        recently_crawled: bool,
        last_activity_at: Timestamp,
    },
}

pub struct CrawlScheduler {
    deps: CrawlDeps,
    statuses: Arc<TaskStatusStore>,
    runner: Arc<CrawlRunner>,
    tracker: TaskTracker,
}

impl CrawlScheduler {
    pub fn new(deps: CrawlDeps) -> Self {
        let statuses = Arc::new(TaskStatusStore::new(
            deps.stores.tasks.clone(),
            deps.cache.clone(),
            Duration::from_secs(deps.config.task_status_ttl_s),
        ));
        let runner = Arc::new(CrawlRunner::new(deps.clone(), statuses.clone()));
        Self {
            deps,
            statuses,
            runner,
            tracker: TaskTracker::new(),
        }
    }

    pub fn statuses(&self) -> &TaskStatusStore {
        &self.statuses
    }

    /// Accept a crawl request, or short-circuit when the character was
    /// crawled within the recency window and `force` is not set.
    pub async fn request(
        &self,
        character_id: &str,
        request: &CrawlRequest,
    ) -> Result<CrawlDecision, ScheduleError> {
        let subtypes = parse_subtypes(&request.subtypes)?;

        let character = self
            .deps
            .stores
            .characters
            .find_character(character_id)
            .await?
            .ok_or_else(|| ScheduleError::CharacterNotFound(character_id.to_string()))?;

        if !request.force {
            if let Some(last_activity_at) = self.recent_activity(&character.ocid, character.updated_at).await? {
                tracing::info!(
                    character_id = %character.ocid,
                    %last_activity_at,
                    "Crawl skipped, character crawled recently",
                );
                return Ok(CrawlDecision::RecentlyCrawled {
                    recently_crawled: true,
                    last_activity_at,
                });
            }
        }

        let task = self
            .statuses
            .create(&character.ocid, subtypes.iter().copied().collect())
            .await?;
        let estimated_seconds = estimate_secs(&subtypes);

        tracing::info!(
            task_id = %task.id,
            character_id = %character.ocid,
            subtypes = ?subtypes,
            force = request.force,
            "Crawl task accepted",
        );

        let runner = self.runner.clone();
        let job = CrawlJob {
            task_id: task.id,
            character_id: character.ocid,
            subtypes,
        };
        self.tracker.spawn(async move {
            runner.run(job).await;
        });

        Ok(CrawlDecision::Accepted {
            task_id: task.id,
            estimated_seconds,
            recently_crawled: false,
        })
    }

    /// Newest successful work on the character inside the recency window.
    async fn recent_activity(
        &self,
        ocid: &str,
        identity_updated_at: Option<Timestamp>,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let stores = &self.deps.stores;
        let latest_inventory = stores.items.latest_inventory_crawl(ocid).await?;
        let last_success = stores.tasks.last_success_at(ocid).await?;

        let newest = [identity_updated_at, latest_inventory, last_success]
            .into_iter()
            .flatten()
            .max();

        let cutoff = Utc::now() - chrono::Duration::seconds(self.deps.config.recency_window_s);
        Ok(newest.filter(|at| *at > cutoff))
    }

    /// Wait for every spawned run to finish.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting runs and give in-flight ones `timeout` to finish.
    /// Runs still going afterwards keep their last persisted state.
    pub async fn shutdown(&self, timeout: Duration) {
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight == 0 {
            return;
        }
        tracing::info!(in_flight, "Waiting for crawl runs to finish");
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                remaining = self.tracker.len(),
                "Crawl runs still in flight at shutdown",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_force_defaults_to_false() {
        let req: CrawlRequest = serde_json::from_str(r#"{"subtypes":["meso"]}"#).unwrap();
        assert!(!req.force);
        assert_eq!(req.subtypes, vec!["meso".to_string()]);
    }

    #[test]
    fn decisions_serialize_with_status_tag() {
        let id = uuid::Uuid::now_v7();
        let accepted = serde_json::to_value(CrawlDecision::Accepted {
            task_id: id,
            estimated_seconds: 25,
            recently_crawled: false,
        })
        .unwrap();
        assert_eq!(accepted["status"], "ACCEPTED");
        assert_eq!(accepted["estimated_seconds"], 25);
        assert_eq!(accepted["recently_crawled"], false);

        let recent = serde_json::to_value(CrawlDecision::RecentlyCrawled {
            recently_crawled: true,
            last_activity_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(recent["status"], "RECENTLY_CRAWLED");
        assert_eq!(recent["recently_crawled"], true);
    }
}
