//! Storage page parser.
//!
//! Storage cards are plain `<li>` elements carrying an `item_img` block.
//! The markup is looser than the inventory's: rarity may be a coloured
//! `<font>` or a bare text node, and durations share the "(N…)" form with
//! quantities.

use std::sync::LazyLock;

use mapletrack_core::item::{ItemOptions, ItemType, ParsedItem};
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::expiry::parse_expiry;
use crate::text::{absolutize, element_text, select_text, selector, split_name, squash, starforce};

/// Parenthesised suffixes that are durations or sides, not stack counts.
const UNIT_MARKERS: [&str; 4] = ["일", "유닛", "분", "왼쪽용"];

static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static ICON_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector(".item_img"));
static ICON: LazyLock<Selector> = LazyLock::new(|| selector(".item_img img"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static NAME: LazyLock<Selector> = LazyLock::new(|| selector(".item_name"));
static FONT: LazyLock<Selector> = LazyLock::new(|| selector("font[color]"));

static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s*\((\d+)\s*([^)<]*)\)").expect("valid regex"));

/// Parse every occupied storage slot. `slot_index` is the ordinal among
/// the cards that were kept.
pub fn parse_storage(html: &str, origin: &str) -> Vec<ParsedItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for li in document.select(&LIST_ITEM) {
        if is_nested(li) || li.select(&ICON_BLOCK).next().is_none() {
            continue;
        }
        let slot_index = items.len() as i32;
        if let Some(item) = parse_card(li, slot_index, origin) {
            items.push(item);
        }
    }

    tracing::debug!(count = items.len(), "Parsed storage page");
    items
}

fn is_nested(li: ElementRef<'_>) -> bool {
    li.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == "li")
}

fn parse_card(li: ElementRef<'_>, slot_index: i32, origin: &str) -> Option<ParsedItem> {
    let icon = li.select(&ICON).next();
    let raw_name = select_text(li, &NAME)
        .or_else(|| select_text(li, &ANCHOR))
        .or_else(|| icon.and_then(|img| img.value().attr("alt")).map(squash))?;
    let parts = split_name(&raw_name);
    if parts.name.is_empty() {
        return None;
    }

    let text = element_text(li);
    let starforce = starforce(&text);
    let quantity = parts.quantity.or_else(|| stack_count(&li.html())).unwrap_or(1);

    Some(ParsedItem {
        slot_index,
        item_type: storage_item_type(starforce, parts.upgrade),
        name: parts.name,
        icon_url: icon
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| absolutize(origin, src)),
        quantity,
        options: ItemOptions {
            starforce,
            upgrade: parts.upgrade,
            rarity: rarity(li),
        },
        detail_url: li
            .select(&ANCHOR)
            .find_map(|a| a.value().attr("href"))
            .and_then(|href| absolutize(origin, href)),
        expiry_at: parse_expiry(&text),
    })
}

/// Storage does not group by bucket; enhanced gear is the only kind the
/// card itself identifies.
fn storage_item_type(starforce: Option<i32>, upgrade: Option<i32>) -> ItemType {
    if starforce.is_some() || upgrade.is_some() {
        ItemType::Equip
    } else {
        ItemType::Etc
    }
}

/// "(N개)" stack count, ignoring duration and side suffixes.
fn stack_count(card_html: &str) -> Option<i32> {
    COUNT_RE.captures_iter(card_html).find_map(|caps| {
        let suffix = caps[2].trim();
        if UNIT_MARKERS.contains(&suffix) {
            return None;
        }
        (suffix == "개").then(|| caps[1].parse::<i32>().ok()).flatten()
    })
}

/// Coloured `<font>` label, else the first bare text after the icon.
fn rarity(li: ElementRef<'_>) -> Option<String> {
    if let Some(label) = select_text(li, &FONT) {
        return Some(label);
    }

    let mut after_icon = false;
    for child in li.children() {
        match child.value() {
            Node::Element(el) if el.classes().any(|c| c == "item_img") => after_icon = true,
            Node::Text(text) if after_icon => {
                let text = squash(text);
                if !text.is_empty() && !text.starts_with('(') {
                    return Some(text);
                }
            }
            _ => {}
        }
    }
    None
}
