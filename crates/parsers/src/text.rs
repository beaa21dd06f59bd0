//! Small text helpers shared by the page parsers.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

static QUANTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)개\)").expect("valid regex"));

static UPGRADE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?\+(\d+)\)?\s*$").expect("valid regex"));

static STARFORCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*성\s*강화").expect("valid regex"));

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

static SIGNED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d+").expect("valid regex"));

/// Compile a selector literal.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

/// Collapse runs of whitespace to single spaces and trim.
pub(crate) fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All text under `el`, whitespace-squashed.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    squash(&el.text().collect::<String>())
}

/// First element under `root` matching `sel`, as squashed text, if non-empty.
pub(crate) fn select_text(root: ElementRef<'_>, sel: &Selector) -> Option<String> {
    root.select(sel)
        .map(element_text)
        .find(|text| !text.is_empty())
}

/// Resolve `href` against `origin`, ignoring script and fragment links.
pub fn absolutize(origin: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let base = Url::parse(origin).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Item name with its quantity and upgrade suffixes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NameParts {
    pub name: String,
    pub quantity: Option<i32>,
    pub upgrade: Option<i32>,
}

/// Split "이름 (+8) (3개)"-style card titles into their parts.
pub(crate) fn split_name(raw: &str) -> NameParts {
    let mut name = squash(raw);

    let quantity = QUANTITY_RE
        .captures(&name)
        .and_then(|c| c[1].parse::<i32>().ok());
    if quantity.is_some() {
        name = squash(&QUANTITY_RE.replace_all(&name, ""));
    }

    let upgrade = UPGRADE_RE
        .captures(&name)
        .and_then(|c| c[1].parse::<i32>().ok());
    if upgrade.is_some() {
        name = squash(&UPGRADE_RE.replace(&name, ""));
    }

    NameParts {
        name,
        quantity,
        upgrade,
    }
}

/// Starforce level from an "N성 강화" label.
pub(crate) fn starforce(text: &str) -> Option<i32> {
    STARFORCE_RE
        .captures(text)
        .and_then(|c| c[1].parse::<i32>().ok())
}

/// First digit run after dropping thousands separators and whitespace.
pub(crate) fn first_number(text: &str) -> Option<i64> {
    let compact: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    DIGITS_RE
        .find(&compact)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Stat value shown as "+N", "-N" or "+N%", as a signed integer.
pub(crate) fn stat_value(text: &str) -> Option<i32> {
    let compact: String = text.chars().filter(|c| *c != ',').collect();
    SIGNED_RE
        .find(&compact)
        .and_then(|m| m.as_str().trim_start_matches('+').parse::<i32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_strips_quantity_and_upgrade() {
        assert_eq!(
            split_name("  파워 엘릭서 (120개) "),
            NameParts {
                name: "파워 엘릭서".into(),
                quantity: Some(120),
                upgrade: None,
            }
        );
        assert_eq!(
            split_name("아케인셰이드 투핸드소드 (+8)"),
            NameParts {
                name: "아케인셰이드 투핸드소드".into(),
                quantity: None,
                upgrade: Some(8),
            }
        );
        assert_eq!(split_name("앱솔랩스 숄더 +11").upgrade, Some(11));
    }

    #[test]
    fn first_number_ignores_separators() {
        assert_eq!(first_number("1,234,567 메소"), Some(1_234_567));
        assert_eq!(first_number("메소 0"), Some(0));
        assert_eq!(first_number("없음"), None);
    }

    #[test]
    fn stat_value_keeps_sign_and_drops_percent() {
        assert_eq!(stat_value("+150"), Some(150));
        assert_eq!(stat_value("-5"), Some(-5));
        assert_eq!(stat_value("-1,000"), Some(-1000));
        assert_eq!(stat_value("+30%"), Some(30));
        assert_eq!(stat_value("+1,200 (1000 +200)"), Some(1200));
        assert_eq!(stat_value("-"), None);
    }

    #[test]
    fn absolutize_resolves_relative_links() {
        assert_eq!(
            absolutize("https://maplestory.nexon.com", "/Common/Item?p=1").as_deref(),
            Some("https://maplestory.nexon.com/Common/Item?p=1")
        );
        assert_eq!(absolutize("https://maplestory.nexon.com", "javascript:void(0)"), None);
        assert_eq!(absolutize("https://maplestory.nexon.com", "#"), None);
    }
}
