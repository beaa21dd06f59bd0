use axum::extract::{Query, State};
use axum::Json;
use mapletrack_events::{ErrorBreakdown, HourlyStat, SuccessRate};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Window in hours. Defaults to 24, capped at one week.
    pub hours: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CrawlStats {
    pub hours: u32,
    pub success_rate: SuccessRate,
    pub error_breakdown: ErrorBreakdown,
    pub hourly: Vec<HourlyStat>,
}

/// GET /api/v1/monitoring/stats?hours=
pub async fn crawl_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsQuery>,
) -> AppResult<Json<DataResponse<CrawlStats>>> {
    let hours = params.hours.unwrap_or(24).clamp(1, 168);
    let monitor = &state.monitor;

    let stats = CrawlStats {
        hours,
        success_rate: monitor.success_rate(hours).await?,
        error_breakdown: monitor.error_breakdown(hours).await?,
        hourly: monitor.hourly_stats(hours).await?,
    };
    Ok(Json(DataResponse::new(stats)))
}
