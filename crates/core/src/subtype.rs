//! Crawl sub-steps and request validation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One unit of work within a crawl run.
///
/// Variants are declared in execution order; the derived `Ord` is what
/// orders a run's sub-steps. `ItemDetails` follows `Inventory` so it sees
/// the rows the same run just inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlSubtype {
    ApiData,
    Inventory,
    ItemDetails,
    Storage,
    Meso,
}

/// Seconds added to the estimate when the run must resolve a character URL.
const URL_RESOLUTION_ESTIMATE_SECS: u32 = 10;

impl CrawlSubtype {
    pub const ALL: [CrawlSubtype; 5] = [
        CrawlSubtype::ApiData,
        CrawlSubtype::Inventory,
        CrawlSubtype::ItemDetails,
        CrawlSubtype::Storage,
        CrawlSubtype::Meso,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlSubtype::ApiData => "api_data",
            CrawlSubtype::Inventory => "inventory",
            CrawlSubtype::ItemDetails => "item_details",
            CrawlSubtype::Storage => "storage",
            CrawlSubtype::Meso => "meso",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "api_data" => Some(CrawlSubtype::ApiData),
            "inventory" => Some(CrawlSubtype::Inventory),
            "item_details" => Some(CrawlSubtype::ItemDetails),
            "storage" => Some(CrawlSubtype::Storage),
            "meso" => Some(CrawlSubtype::Meso),
            _ => None,
        }
    }

    /// Sub-steps that load character pages and so need a fresh `base_url`.
    pub fn needs_character_url(&self) -> bool {
        matches!(
            self,
            CrawlSubtype::Inventory | CrawlSubtype::Storage | CrawlSubtype::Meso
        )
    }

    /// Rough wall-clock cost used for the accepted-response estimate.
    pub fn estimated_secs(&self) -> u32 {
        match self {
            CrawlSubtype::ApiData => 3,
            CrawlSubtype::Inventory => 20,
            CrawlSubtype::ItemDetails => 120,
            CrawlSubtype::Storage => 20,
            CrawlSubtype::Meso => 15,
        }
    }
}

impl std::fmt::Display for CrawlSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a requested sub-step list into an ordered set.
///
/// Rejects an empty list and any unrecognised name. Duplicates collapse.
pub fn parse_subtypes<S: AsRef<str>>(values: &[S]) -> Result<BTreeSet<CrawlSubtype>, CoreError> {
    if values.is_empty() {
        return Err(CoreError::Validation(
            "at least one crawl subtype is required".into(),
        ));
    }

    values
        .iter()
        .map(|v| {
            CrawlSubtype::parse(v.as_ref()).ok_or_else(|| {
                CoreError::Validation(format!("unknown crawl subtype: {}", v.as_ref()))
            })
        })
        .collect()
}

/// Estimated run duration in seconds for a set of sub-steps.
pub fn estimate_secs(subtypes: &BTreeSet<CrawlSubtype>) -> u32 {
    let steps: u32 = subtypes.iter().map(CrawlSubtype::estimated_secs).sum();
    if subtypes.iter().any(CrawlSubtype::needs_character_url) {
        steps + URL_RESOLUTION_ESTIMATE_SECS
    } else {
        steps
    }
}
