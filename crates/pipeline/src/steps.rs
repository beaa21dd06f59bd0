//! The five crawl sub-steps.
//!
//! Each step returns a [`StepPartial`] for the task result. Errors that
//! escape a step are already classified; the runner decides whether they
//! end the attempt.

use chrono::Utc;
use mapletrack_core::cache_keys;
use mapletrack_core::error_kind::ErrorKind;
use mapletrack_core::time::local_date;
use mapletrack_core::types::{DbId, Timestamp};
use mapletrack_core::validation::{validate_detail, validate_items, ItemReport};
use mapletrack_db::models::character::{Character, CharacterBasic, HistorySnapshot};
use mapletrack_parsers::{parse_inventory, parse_item_detail, parse_meso, parse_storage};
use mapletrack_vendor::browser::is_maintenance_page;
use mapletrack_vendor::{ApiError, DetailPacer, SubPage};
use serde::Serialize;
use serde_json::json;

use crate::error::CrawlError;
use crate::runner::CrawlDeps;

// ---------------------------------------------------------------------------
// Partial results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    ValidationError,
    Error,
}

/// Outcome of one sub-step, stored under its name in the task result.
#[derive(Debug, Clone, Serialize)]
pub struct StepPartial {
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl StepPartial {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            status: StepStatus::Success,
            message: None,
            data,
        }
    }

    pub fn validation_error(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            status: StepStatus::ValidationError,
            message: Some(message.into()),
            data,
        }
    }

    pub fn error(err: &CrawlError) -> Self {
        Self {
            status: StepStatus::Error,
            message: Some(err.detail.clone()),
            data: json!({ "error_kind": err.kind }),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "status": "error" }))
    }
}

fn items_summary(report: &ItemReport, crawled_at: Timestamp) -> serde_json::Value {
    json!({
        "count": report.valid.len(),
        "dropped": report
            .dropped
            .iter()
            .map(|d| json!({ "slot_index": d.slot_index, "name": d.name, "reason": d.reason }))
            .collect::<Vec<_>>(),
        "crawled_at": crawled_at,
    })
}

// ---------------------------------------------------------------------------
// api_data
// ---------------------------------------------------------------------------

/// Basic, then popularity, then stat. A response that fails its schema
/// is noted and skipped; anything else aborts the step.
pub async fn api_data(deps: &CrawlDeps, character: &Character) -> Result<StepPartial, CrawlError> {
    let ocid = character.ocid.as_str();
    let mut issues = Vec::new();
    let mut data = serde_json::Map::new();

    match deps.api.fetch_basic(ocid).await {
        Ok(basic) => {
            deps.stores
                .characters
                .update_basic(
                    ocid,
                    &CharacterBasic {
                        name: basic.character_name.clone(),
                        world: basic.world_name.clone(),
                        class: basic.character_class.clone(),
                        level: basic.character_level,
                        image_url: basic.character_image.clone(),
                    },
                )
                .await?
                .ok_or_else(|| {
                    CrawlError::new(
                        ErrorKind::CharacterNotFound,
                        format!("character {ocid} disappeared during the run"),
                    )
                })?;

            let history = deps
                .stores
                .characters
                .upsert_history(
                    ocid,
                    local_date(Utc::now()),
                    &HistorySnapshot {
                        level: basic.character_level,
                        exp: basic.character_exp,
                        guild_name: basic.character_guild_name.clone(),
                        image_url: basic.character_image.clone(),
                        access_flag: basic.is_active(),
                    },
                )
                .await?;
            data.insert("level".into(), json!(basic.character_level));
            data.insert("history_date".into(), json!(history.local_date));
        }
        Err(ApiError::Parse(message)) => issues.push(format!("basic: {message}")),
        Err(e) => return Err(CrawlError::from(e).context("basic")),
    }

    match deps.api.fetch_popularity(ocid).await {
        Ok(p) => {
            deps.stores
                .characters
                .update_popularity(ocid, p.popularity)
                .await?;
            data.insert("popularity".into(), json!(p.popularity));
        }
        Err(ApiError::Parse(message)) => issues.push(format!("popularity: {message}")),
        Err(e) => return Err(CrawlError::from(e).context("popularity")),
    }

    match deps.api.fetch_stat(ocid).await {
        Ok(stat) => {
            let value = serde_json::to_value(&stat.final_stat)
                .map_err(|e| CrawlError::new(ErrorKind::Unknown, e.to_string()))?;
            deps.stores.characters.update_stat(ocid, &value).await?;
            data.insert("stat_count".into(), json!(stat.final_stat.len()));
        }
        Err(ApiError::Parse(message)) => issues.push(format!("stat: {message}")),
        Err(e) => return Err(CrawlError::from(e).context("stat")),
    }

    let data = serde_json::Value::Object(data);
    if issues.is_empty() {
        Ok(StepPartial::success(data))
    } else {
        tracing::warn!(character_id = %ocid, ?issues, "Vendor API response failed schema checks");
        Ok(StepPartial::validation_error(issues.join("; "), data))
    }
}

// ---------------------------------------------------------------------------
// inventory
// ---------------------------------------------------------------------------

pub async fn inventory(
    deps: &CrawlDeps,
    character: &Character,
    base_url: &str,
) -> Result<StepPartial, CrawlError> {
    let ocid = character.ocid.as_str();
    let crawled_at = Utc::now();

    let html = deps.pages.fetch_subpage(base_url, SubPage::Inventory).await?;
    let report = validate_items(parse_inventory(&html, &deps.config.site_origin));

    for item in &report.valid {
        deps.stores
            .items
            .insert_inventory(ocid, item, crawled_at)
            .await?;
    }

    tracing::info!(
        character_id = %ocid,
        saved = report.valid.len(),
        dropped = report.dropped.len(),
        "Inventory saved",
    );
    Ok(StepPartial::success(items_summary(&report, crawled_at)))
}

// ---------------------------------------------------------------------------
// storage
// ---------------------------------------------------------------------------

/// Storage is shared by every character of an account; a fresh marker
/// for the owner means another character just crawled it.
pub async fn storage(
    deps: &CrawlDeps,
    character: &Character,
    base_url: &str,
) -> Result<StepPartial, CrawlError> {
    let ocid = character.ocid.as_str();
    let marker = character.user_id.map(cache_keys::shared_storage);

    if let Some(key) = &marker {
        match deps.cache.exists(key).await {
            Ok(true) => {
                tracing::info!(character_id = %ocid, "Shared storage crawled recently, skipping");
                return Ok(StepPartial::success(json!({ "skipped": true })));
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Shared storage marker lookup failed"),
        }
    }

    let crawled_at = Utc::now();
    let html = deps.pages.fetch_subpage(base_url, SubPage::Storage).await?;
    let report = validate_items(parse_storage(&html, &deps.config.site_origin));
    let meso = parse_meso(&html);

    for item in &report.valid {
        deps.stores.items.insert_storage(ocid, item, crawled_at).await?;
    }
    deps.stores
        .items
        .insert_storage_meso(ocid, meso, crawled_at)
        .await?;

    if let Some(key) = &marker {
        if let Err(e) = deps
            .cache
            .set_ex(key, "1", deps.config.shared_storage_ttl())
            .await
        {
            tracing::warn!(key = %key, error = %e, "Failed to set shared storage marker");
        }
    }

    tracing::info!(
        character_id = %ocid,
        saved = report.valid.len(),
        dropped = report.dropped.len(),
        "Storage saved",
    );
    let mut data = items_summary(&report, crawled_at);
    data["meso"] = json!(meso);
    Ok(StepPartial::success(data))
}

// ---------------------------------------------------------------------------
// meso
// ---------------------------------------------------------------------------

/// Write the balance onto the character and, when today's history row
/// already exists, onto that row too. No history row is created here.
pub async fn meso(
    deps: &CrawlDeps,
    character: &Character,
    base_url: &str,
) -> Result<StepPartial, CrawlError> {
    let ocid = character.ocid.as_str();

    let html = deps.pages.fetch_subpage(base_url, SubPage::Main).await?;
    let meso = parse_meso(&html);
    if meso.is_none() {
        tracing::warn!(character_id = %ocid, "No meso reading found on character page");
    }

    deps.stores.characters.update_meso(ocid, meso).await?;
    let history_updated = deps
        .stores
        .characters
        .update_history_meso(ocid, local_date(Utc::now()), meso)
        .await?;

    Ok(StepPartial::success(json!({
        "meso": meso,
        "history_updated": history_updated,
    })))
}

// ---------------------------------------------------------------------------
// item_details
// ---------------------------------------------------------------------------

/// Walk inventory rows still missing a detail record, oldest first.
/// A failing item is listed and skipped.
pub async fn item_details(
    deps: &CrawlDeps,
    character: &Character,
) -> Result<StepPartial, CrawlError> {
    let ocid = character.ocid.as_str();
    let pending = deps.stores.items.pending_detail_items(ocid).await?;
    let pacer = DetailPacer::from_config(&deps.config);

    let mut saved = 0usize;
    let mut failed_items = Vec::new();

    for (index, item) in pending.iter().enumerate() {
        let Some(url) = item.detail_url.as_deref() else {
            continue;
        };
        pacer.before_item(index).await;

        match fetch_detail(deps, item.id, url).await {
            Ok(()) => saved += 1,
            Err(e) => {
                tracing::warn!(item_id = item.id, error = %e, "Item detail failed");
                failed_items.push(json!({
                    "id": item.id,
                    "name": item.name,
                    "error": e.detail,
                }));
            }
        }
    }

    tracing::info!(
        character_id = %ocid,
        pending = pending.len(),
        saved,
        failed = failed_items.len(),
        "Item details walked",
    );
    Ok(StepPartial::success(json!({
        "pending": pending.len(),
        "saved": saved,
        "failed_items": failed_items,
    })))
}

async fn fetch_detail(deps: &CrawlDeps, item_id: DbId, url: &str) -> Result<(), CrawlError> {
    let html = deps.pages.fetch_subpage(url, SubPage::Main).await?;
    let detail = parse_item_detail(&html);
    if detail.is_empty() {
        let kind = if is_maintenance_page(&html) {
            ErrorKind::Maintenance
        } else {
            ErrorKind::Unknown
        };
        return Err(CrawlError::new(kind, format!("no detail fields on {url}")));
    }
    validate_detail(&detail).map_err(|e| CrawlError::new(ErrorKind::Unknown, e.to_string()))?;
    deps.stores.items.upsert_detail(item_id, &detail).await?;
    Ok(())
}
