//! Character lookup on the public ranking page.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::text::{absolutize, element_text, selector};

static RANKING_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| selector("table.rank_table td.left dt a"));

/// Find the ranking row whose name equals `name` (case-insensitive) and
/// return its absolute character info URL.
pub fn find_character_anchor(html: &str, name: &str, origin: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let wanted = name.trim().to_lowercase();

    document
        .select(&RANKING_ANCHOR)
        .find(|a| element_text(*a).to_lowercase() == wanted)
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| absolutize(origin, href))
}
