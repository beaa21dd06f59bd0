pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{characters, crawl, monitoring, notifications};
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// GET    /characters/ocid?name=                      -> lookup_ocid
/// POST   /characters/{character_id}/crawl            -> request_crawl
/// GET    /characters/{character_id}/crawl-tasks      -> list_tasks
/// GET    /crawl-tasks/{task_id}                      -> get_task
///
/// GET    /monitoring/stats?hours=                    -> crawl_stats
///
/// GET    /users/{user_id}/notifications              -> list_notifications
/// POST   /notifications/{id}/read                    -> mark_read
/// DELETE /notifications/{id}                         -> delete_notification
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Characters and crawls
        .route("/characters/ocid", get(characters::lookup_ocid))
        .route("/characters/{character_id}/crawl", post(crawl::request_crawl))
        .route(
            "/characters/{character_id}/crawl-tasks",
            get(crawl::list_tasks),
        )
        .route("/crawl-tasks/{task_id}", get(crawl::get_task))
        // Monitoring
        .route("/monitoring/stats", get(monitoring::crawl_stats))
        // Notifications
        .route(
            "/users/{user_id}/notifications",
            get(notifications::list_notifications),
        )
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route(
            "/notifications/{id}",
            axum::routing::delete(notifications::delete_notification),
        )
}
