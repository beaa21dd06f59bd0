//! Inventory page parser.
//!
//! The page lists one section per item bucket in [`ItemType::SECTION_ORDER`]
//! and one `<li>` card per occupied slot. Sections and cards are cut out of
//! the raw HTML by their opening markers; each card is then read with CSS
//! selectors.

use std::sync::LazyLock;

use mapletrack_core::item::{ItemOptions, ItemType, ParsedItem};
use mapletrack_core::types::Timestamp;
use scraper::{ElementRef, Html, Selector};

use crate::expiry::parse_expiry;
use crate::text::{absolutize, element_text, select_text, selector, split_name, starforce};

/// Opening marker of each item-bucket section.
pub const SECTION_DELIMITER: &str = r#"<div class="tab_item_con""#;
/// Opening marker of each item card.
pub const CARD_DELIMITER: &str = r#"<li class="item_li""#;

/// Cards shorter than this are layout placeholders.
const MIN_CARD_BYTES: usize = 200;
/// Text shown in an empty section.
const EMPTY_MARKER: &str = "없습니다.";

static CARD: LazyLock<Selector> = LazyLock::new(|| selector("li.item_li"));
static ICON: LazyLock<Selector> = LazyLock::new(|| selector(".item_img img"));
static NAME: LazyLock<Selector> = LazyLock::new(|| selector(".item_name"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static RARITY: LazyLock<Selector> = LazyLock::new(|| selector(".item_rare"));
static EMPHASIS: LazyLock<Selector> = LazyLock::new(|| selector("em"));
static EXPIRY: LazyLock<Selector> = LazyLock::new(|| selector(".item_expire"));

/// Parse every item card on an inventory page.
///
/// `slot_index` is the running position across all sections after empty
/// and placeholder cards are skipped.
pub fn parse_inventory(html: &str, origin: &str) -> Vec<ParsedItem> {
    let mut items = Vec::new();

    for (section, item_type) in html
        .split(SECTION_DELIMITER)
        .skip(1)
        .zip(ItemType::SECTION_ORDER)
    {
        for body in section.split(CARD_DELIMITER).skip(1) {
            if body.len() < MIN_CARD_BYTES || body.contains(EMPTY_MARKER) {
                continue;
            }
            let slot_index = items.len() as i32;
            if let Some(item) = parse_card(body, item_type, slot_index, origin) {
                items.push(item);
            }
        }
    }

    tracing::debug!(count = items.len(), "Parsed inventory page");
    items
}

fn parse_card(
    body: &str,
    item_type: ItemType,
    slot_index: i32,
    origin: &str,
) -> Option<ParsedItem> {
    let fragment = Html::parse_fragment(&format!("{CARD_DELIMITER}{body}"));
    let card = fragment.select(&CARD).next()?;

    let name_el = card.select(&NAME).next();
    let raw_name = name_el
        .map(element_text)
        .or_else(|| select_text(card, &ANCHOR))?;
    let parts = split_name(&raw_name);
    if parts.name.is_empty() {
        return None;
    }

    let icon_url = card
        .select(&ICON)
        .find_map(|img| img.value().attr("src"))
        .and_then(|src| absolutize(origin, src));

    let detail_url = name_el
        .and_then(|el| el.value().attr("href"))
        .or_else(|| card.select(&ANCHOR).find_map(|a| a.value().attr("href")))
        .and_then(|href| absolutize(origin, href));

    let starforce = card
        .select(&EMPHASIS)
        .find_map(|em| starforce(&element_text(em)));

    Some(ParsedItem {
        slot_index,
        item_type,
        name: parts.name,
        icon_url,
        quantity: parts.quantity.unwrap_or(1),
        options: ItemOptions {
            starforce,
            upgrade: parts.upgrade,
            rarity: select_text(card, &RARITY),
        },
        detail_url,
        expiry_at: card_expiry(card),
    })
}

fn card_expiry(card: ElementRef<'_>) -> Option<Timestamp> {
    select_text(card, &EXPIRY)
        .and_then(|text| parse_expiry(&text))
        .or_else(|| {
            let text = element_text(card);
            text.contains("까지").then(|| parse_expiry(&text)).flatten()
        })
}
