use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use mapletrack_cache::{FastCache, MemoryCache};
use mapletrack_core::config::CrawlerConfig;
use mapletrack_db::models::character::RegisterCharacter;
use mapletrack_db::{CharacterStore, MemoryStore, Stores};
use mapletrack_events::Monitor;
use mapletrack_pipeline::CrawlDeps;
use mapletrack_vendor::api::{
    CharacterBasicResponse, FinalStat, PopularityResponse, StatResponse,
};
use mapletrack_vendor::{ApiError, BrowserError, CharacterApi, PageSource, SubPage};
use tower::ServiceExt;

use mapletrack_api::config::ServerConfig;
use mapletrack_api::state::AppState;

pub const OCID: &str = "ocid-hero";
pub const NAME: &str = "메이플용사";

/// Vendor API that knows exactly one character.
pub struct StubApi;

#[async_trait::async_trait]
impl CharacterApi for StubApi {
    async fn resolve_character_id(&self, name: &str) -> Result<String, ApiError> {
        if name == NAME {
            Ok(OCID.into())
        } else {
            Err(ApiError::NotFound(format!("no character named {name}")))
        }
    }

    async fn fetch_basic(&self, _character_id: &str) -> Result<CharacterBasicResponse, ApiError> {
        Ok(CharacterBasicResponse {
            character_name: NAME.into(),
            world_name: Some("스카니아".into()),
            character_class: Some("히어로".into()),
            character_level: 265,
            character_exp: 1,
            character_guild_name: None,
            character_image: None,
            access_flag: None,
        })
    }

    async fn fetch_popularity(&self, _character_id: &str) -> Result<PopularityResponse, ApiError> {
        Ok(PopularityResponse { popularity: 7 })
    }

    async fn fetch_stat(&self, _character_id: &str) -> Result<StatResponse, ApiError> {
        Ok(StatResponse {
            character_class: None,
            final_stat: vec![FinalStat {
                stat_name: "STR".into(),
                stat_value: Some("4".into()),
            }],
            remain_ap: None,
        })
    }
}

/// The HTTP tests only request REST-backed crawls.
pub struct NoPages;

#[async_trait::async_trait]
impl PageSource for NoPages {
    async fn resolve_character_info_url(&self, name: &str) -> Result<String, BrowserError> {
        Err(BrowserError::NotFound(name.to_string()))
    }

    async fn fetch_subpage(&self, base_url: &str, _sub: SubPage) -> Result<String, BrowserError> {
        Err(BrowserError::InvalidUrl(base_url.to_string()))
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        shutdown_timeout_secs: 5,
        ..ServerConfig::default()
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn router(&self) -> Router {
        mapletrack_api::build_app(self.state.clone())
    }
}

/// App over in-process stores with one registered character.
pub async fn build_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store
        .register(&RegisterCharacter {
            ocid: OCID.into(),
            name: NAME.into(),
            user_id: None,
        })
        .await
        .unwrap();

    let cache = Arc::new(MemoryCache::new());
    let shared: Arc<dyn FastCache> = cache.clone();
    let deps = CrawlDeps {
        stores: Stores::shared(store.clone()),
        cache: shared.clone(),
        api: Arc::new(StubApi),
        pages: Arc::new(NoPages),
        monitor: Arc::new(Monitor::new(shared, Duration::from_secs(3600))),
        config: Arc::new(CrawlerConfig::default()),
    };

    TestApp {
        store,
        state: AppState::new(deps, None, test_config()),
    }
}

pub async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
