use std::sync::Arc;

use mapletrack_cache::FastCache;
use mapletrack_db::{DbPool, Stores};
use mapletrack_events::Monitor;
use mapletrack_pipeline::{CrawlDeps, CrawlScheduler};
use mapletrack_vendor::CharacterApi;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Postgres pool for the health check. `None` when the stores are
    /// in-process.
    pub pool: Option<DbPool>,
    pub stores: Stores,
    pub cache: Arc<dyn FastCache>,
    /// Vendor REST client, used directly by the id lookup.
    pub api: Arc<dyn CharacterApi>,
    pub monitor: Arc<Monitor>,
    pub scheduler: Arc<CrawlScheduler>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the state and the crawl scheduler from the pipeline's
    /// collaborators.
    pub fn new(deps: CrawlDeps, pool: Option<DbPool>, config: ServerConfig) -> Self {
        Self {
            pool,
            stores: deps.stores.clone(),
            cache: deps.cache.clone(),
            api: deps.api.clone(),
            monitor: deps.monitor.clone(),
            scheduler: Arc::new(CrawlScheduler::new(deps)),
            config: Arc::new(config),
        }
    }
}
