//! Meso balance extraction.
//!
//! Used on the character basic page and on the storage page. Zero is a
//! real balance; `None` means no reading was found.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::text::{element_text, first_number, select_text, selector};

const MESO_LABELS: [&str; 2] = ["메소", "골드"];

static MESO_CELL: LazyLock<Selector> =
    LazyLock::new(|| selector("div.char_info_tb table tr td.meso span"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("table tr"));
static HEADER: LazyLock<Selector> = LazyLock::new(|| selector("th"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static DIV: LazyLock<Selector> = LazyLock::new(|| selector("div"));

/// Read the meso balance from a rendered page.
pub fn parse_meso(html: &str) -> Option<i64> {
    let document = Html::parse_document(html);

    if let Some(value) = document
        .select(&MESO_CELL)
        .find_map(|span| first_number(&element_text(span)))
    {
        return Some(value);
    }

    if let Some(value) = document.select(&ROW).find_map(|row| {
        let header = select_text(row, &HEADER)?;
        if !header.contains(MESO_LABELS[0]) {
            return None;
        }
        first_number(&select_text(row, &CELL)?)
    }) {
        return Some(value);
    }

    // Innermost labelled block: the shortest text that carries a label
    // and a number after it.
    document
        .select(&DIV)
        .filter_map(|div| {
            let text = element_text(div);
            let value = MESO_LABELS.iter().find_map(|label| {
                let (_, after) = text.split_once(label)?;
                first_number(after)
            })?;
            Some((text.len(), value))
        })
        .min_by_key(|(len, _)| *len)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_basic_page_cell() {
        let html = r#"<div class="char_info_tb"><table><tbody><tr>
            <td class="meso"><span>12,345,678</span></td></tr></tbody></table></div>"#;
        assert_eq!(parse_meso(html), Some(12_345_678));
    }

    #[test]
    fn falls_back_to_labelled_table_row() {
        let html = r#"<table><tr><th>레벨</th><td>275</td></tr>
            <tr><th>보유 메소</th><td> 9,876 </td></tr></table>"#;
        assert_eq!(parse_meso(html), Some(9_876));
    }

    #[test]
    fn falls_back_to_labelled_div() {
        let html = r#"<div class="storage_wrap"><div>창고 정보</div>
            <div class="storage_meso"><span>메소</span> <strong>1,000,000</strong></div></div>"#;
        assert_eq!(parse_meso(html), Some(1_000_000));
    }

    #[test]
    fn zero_is_a_reading() {
        let html = r#"<div class="storage_meso">메소 0</div>"#;
        assert_eq!(parse_meso(html), Some(0));
    }

    #[test]
    fn missing_balance_is_none() {
        assert_eq!(parse_meso("<div>메소 정보 없음</div>"), None);
        assert_eq!(parse_meso("<p>nothing</p>"), None);
    }
}
