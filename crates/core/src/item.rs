//! Typed item model produced by the page parsers.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// ItemType
// ---------------------------------------------------------------------------

/// Inventory bucket an item card was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Equip,
    Consumable,
    Etc,
    Install,
    Cash,
}

impl ItemType {
    /// Section order on the inventory page.
    pub const SECTION_ORDER: [ItemType; 5] = [
        ItemType::Equip,
        ItemType::Consumable,
        ItemType::Etc,
        ItemType::Install,
        ItemType::Cash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Equip => "equip",
            ItemType::Consumable => "consumable",
            ItemType::Etc => "etc",
            ItemType::Install => "install",
            ItemType::Cash => "cash",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "equip" => Some(ItemType::Equip),
            "consumable" => Some(ItemType::Consumable),
            "etc" => Some(ItemType::Etc),
            "install" => Some(ItemType::Install),
            "cash" => Some(ItemType::Cash),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ItemSource
// ---------------------------------------------------------------------------

/// Which table an item row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    Inventory,
    Storage,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSource::Inventory => "inventory",
            ItemSource::Storage => "storage",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "inventory" => Some(ItemSource::Inventory),
            "storage" => Some(ItemSource::Storage),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ParsedItem
// ---------------------------------------------------------------------------

/// Enhancement and rarity cues read off an item card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOptions {
    /// Starforce level from "N성 강화".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starforce: Option<i32>,
    /// Spell-trace upgrade count from a "+N" name suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade: Option<i32>,
    /// Rarity label, e.g. "레전드리 아이템".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
}

impl ItemOptions {
    pub fn is_empty(&self) -> bool {
        self.starforce.is_none() && self.upgrade.is_none() && self.rarity.is_none()
    }
}

/// One item card as read from an inventory or storage page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ParsedItem {
    #[validate(range(min = 0))]
    pub slot_index: i32,
    pub item_type: ItemType,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(url)]
    pub icon_url: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub options: ItemOptions,
    #[validate(url)]
    pub detail_url: Option<String>,
    pub expiry_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// ItemDetail
// ---------------------------------------------------------------------------

/// Extended stats from an item's detail page.
///
/// Every field is optional; labels the page does not show stay `None`.
/// Flat stats may be negative on cursed or penalty items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ItemDetail {
    #[validate(range(min = -10000, max = 10000))]
    pub attack: Option<i32>,
    #[validate(range(min = -10000, max = 10000))]
    pub magic_attack: Option<i32>,
    #[validate(range(min = -10000, max = 10000))]
    pub str_stat: Option<i32>,
    #[validate(range(min = -10000, max = 10000))]
    pub dex_stat: Option<i32>,
    #[validate(range(min = -10000, max = 10000))]
    pub int_stat: Option<i32>,
    #[validate(range(min = -10000, max = 10000))]
    pub luk_stat: Option<i32>,
    #[validate(range(min = -1000000, max = 1000000))]
    pub max_hp: Option<i32>,
    #[validate(range(min = -1000000, max = 1000000))]
    pub max_mp: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub boss_damage: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub ignore_defense: Option<i32>,

    pub potential_grade: Option<String>,
    pub potential_option_1: Option<String>,
    pub potential_option_2: Option<String>,
    pub potential_option_3: Option<String>,
    pub additional_grade: Option<String>,
    pub additional_option_1: Option<String>,
    pub additional_option_2: Option<String>,
    pub additional_option_3: Option<String>,

    pub soul_name: Option<String>,
    pub soul_option: Option<String>,
    pub category: Option<String>,
    #[validate(range(min = 0, max = 300))]
    pub required_level: Option<i32>,
    pub required_job: Option<String>,
}

impl ItemDetail {
    /// True when the page yielded no field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
