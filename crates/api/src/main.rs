use std::sync::Arc;
use std::time::Duration;

use mapletrack_cache::{FastCache, RedisCache};
use mapletrack_core::config::CrawlerConfig;
use mapletrack_db::Stores;
use mapletrack_events::{
    AlertConfig, Alerter, EmailConfig, EmailDelivery, ExpiryScanner, Mailer, Monitor, Notifier,
    WebhookDelivery,
};
use mapletrack_pipeline::CrawlDeps;
use mapletrack_vendor::{ApiRateLimiter, BrowserDriver, NexonApiClient, PagePacer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mapletrack_api::config::ServerConfig;
use mapletrack_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mapletrack_api=debug,mapletrack_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let crawler = Arc::new(CrawlerConfig::from_env());
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    if crawler.api_key.is_empty() {
        tracing::warn!("NEXON_API_KEY is not set, vendor API calls will be rejected");
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = mapletrack_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    mapletrack_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    mapletrack_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // --- Fast cache ---
    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
    let cache: Arc<dyn FastCache> =
        Arc::new(RedisCache::from_url(&redis_url).expect("Invalid REDIS_URL"));
    if let Err(e) = cache.ping().await {
        tracing::warn!(error = %e, "Fast cache unreachable at startup");
    }

    // --- Vendor access ---
    let limiter = Arc::new(ApiRateLimiter::new(crawler.api_rate_per_sec));
    let api = Arc::new(NexonApiClient::new(&crawler, limiter, cache.clone()));
    let pacer = Arc::new(PagePacer::new(crawler.page_gap_min_s, crawler.page_gap_max_s));
    let pages = Arc::new(BrowserDriver::new(&crawler, pacer));

    // --- Pipeline ---
    let stores = Stores::postgres(pool.clone());
    let monitor = Arc::new(Monitor::new(
        cache.clone(),
        Duration::from_secs(crawler.stats_ttl_s),
    ));
    let deps = CrawlDeps {
        stores: stores.clone(),
        cache: cache.clone(),
        api,
        pages,
        monitor: monitor.clone(),
        config: crawler.clone(),
    };

    // --- Background loops ---
    let cancel = CancellationToken::new();
    let mailer: Option<Arc<dyn Mailer>> = match EmailConfig::from_env() {
        Some(email) => Some(Arc::new(EmailDelivery::new(email))),
        None => {
            tracing::warn!("SMTP_HOST not set, email alerts and expiry notifications disabled");
            None
        }
    };

    let alerter = Alerter::new(
        monitor.clone(),
        cache.clone(),
        mailer.clone(),
        Arc::new(WebhookDelivery::new()),
        AlertConfig::from_crawler(&crawler),
    );
    let alerter_cancel = cancel.clone();
    let alerter_handle = tokio::spawn(async move {
        alerter.run(alerter_cancel).await;
    });

    let scanner_handle = mailer.map(|mailer| {
        let notifier = Arc::new(Notifier::new(
            stores.notifications.clone(),
            cache.clone(),
            mailer,
            Duration::from_secs(crawler.notif_ttl_s),
            crawler.service_base_url.clone(),
        ));
        let scanner = ExpiryScanner::new(
            stores.items.clone(),
            stores.notifications.clone(),
            notifier,
        );
        let scanner_cancel = cancel.clone();
        tokio::spawn(async move {
            scanner.run(scanner_cancel).await;
        })
    });
    tracing::info!("Background loops started (alerter, expiry scanner)");

    // --- App ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = config.bind_addr().expect("Invalid HOST address");
    let state = AppState::new(deps, Some(pool), config);
    let scheduler = state.scheduler.clone();
    let app = mapletrack_api::build_app(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    scheduler.shutdown(shutdown_timeout).await;

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), alerter_handle).await;
    if let Some(handle) = scanner_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    tracing::info!("Background loops stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
