//! Item detail page parser.
//!
//! The detail card is a flat grid: each `<span>` is a label and the next
//! sibling element holds its value.

use std::sync::LazyLock;

use mapletrack_core::item::ItemDetail;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::text::{element_text, first_number, selector, squash, stat_value};

static LABEL: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static EMPHASIS: LazyLock<Selector> = LazyLock::new(|| selector("em"));

/// "아이템 (레전드리)" / "에디셔널 아이템 (유니크)" potential headers.
static POTENTIAL_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(에디셔널\s*)?(?:잠재옵션|아이템)\s*\(([^)]+)\)$").expect("valid regex")
});

fn keep_first<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn next_element(span: ElementRef<'_>) -> Option<ElementRef<'_>> {
    span.next_siblings().find_map(ElementRef::wrap)
}

fn lines(value: ElementRef<'_>) -> Vec<String> {
    value
        .text()
        .map(squash)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Parse an item detail page. Labels the page does not show stay `None`.
pub fn parse_item_detail(html: &str) -> ItemDetail {
    let document = Html::parse_document(html);
    let mut detail = ItemDetail::default();

    for span in document.select(&LABEL) {
        let label = element_text(span);
        if label.is_empty() {
            continue;
        }
        let Some(value) = next_element(span) else {
            continue;
        };
        let text = element_text(value);

        match label.as_str() {
            "공격력" => keep_first(&mut detail.attack, stat_value(&text)),
            "마력" => keep_first(&mut detail.magic_attack, stat_value(&text)),
            "STR" => keep_first(&mut detail.str_stat, stat_value(&text)),
            "DEX" => keep_first(&mut detail.dex_stat, stat_value(&text)),
            "INT" => keep_first(&mut detail.int_stat, stat_value(&text)),
            "LUK" => keep_first(&mut detail.luk_stat, stat_value(&text)),
            "최대 HP" | "MaxHP" => keep_first(&mut detail.max_hp, stat_value(&text)),
            "최대 MP" | "MaxMP" => keep_first(&mut detail.max_mp, stat_value(&text)),
            "보스 몬스터 공격 시 데미지" | "보스 몬스터 데미지" => {
                keep_first(&mut detail.boss_damage, stat_value(&text))
            }
            "몬스터 방어율 무시" | "방어율 무시" => {
                keep_first(&mut detail.ignore_defense, stat_value(&text))
            }
            "소울옵션" => {
                let (name, option) = match text.split_once(':') {
                    Some((name, option)) => (squash(name), Some(squash(option))),
                    None => (text.clone(), None),
                };
                keep_first(&mut detail.soul_name, Some(name).filter(|s| !s.is_empty()));
                keep_first(&mut detail.soul_option, option.filter(|s| !s.is_empty()));
            }
            "장비분류" => {
                let category = text.rsplit('|').next().map(squash);
                keep_first(&mut detail.category, category.filter(|s| !s.is_empty()));
            }
            "REQ LEV" => {
                let level = value
                    .select(&EMPHASIS)
                    .find_map(|em| first_number(&element_text(em)))
                    .or_else(|| first_number(&text))
                    .and_then(|n| i32::try_from(n).ok());
                keep_first(&mut detail.required_level, level);
            }
            "착용 가능한 직업" => {
                keep_first(&mut detail.required_job, Some(text).filter(|s| !s.is_empty()))
            }
            other => {
                if let Some(caps) = POTENTIAL_LABEL.captures(other) {
                    let grade = Some(squash(&caps[2]));
                    let mut options = lines(value).into_iter();
                    if caps.get(1).is_some() {
                        keep_first(&mut detail.additional_grade, grade);
                        keep_first(&mut detail.additional_option_1, options.next());
                        keep_first(&mut detail.additional_option_2, options.next());
                        keep_first(&mut detail.additional_option_3, options.next());
                    } else {
                        keep_first(&mut detail.potential_grade, grade);
                        keep_first(&mut detail.potential_option_1, options.next());
                        keep_first(&mut detail.potential_option_2, options.next());
                        keep_first(&mut detail.potential_option_3, options.next());
                    }
                }
            }
        }
    }

    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_lose_sign_and_percent() {
        let html = r#"<div class="stet_info">
            <span>STR</span><div class="point_td">+40</div>
            <span>공격력</span><div class="point_td">+295 (283 +12)</div>
            <span>보스 몬스터 공격 시 데미지</span><div class="point_td">+30%</div>
        </div>"#;
        let detail = parse_item_detail(html);
        assert_eq!(detail.str_stat, Some(40));
        assert_eq!(detail.attack, Some(295));
        assert_eq!(detail.boss_damage, Some(30));
        assert_eq!(detail.dex_stat, None);
    }

    #[test]
    fn potential_grades_come_from_labels() {
        let html = r#"<div>
            <span>아이템 (레전드리)</span><div class="point_td">STR +12%<br>STR +9%<br>올스탯 +6%</div>
            <span>에디셔널 아이템 (유니크)</span><div class="point_td">공격력 +12<br>STR +7%</div>
        </div>"#;
        let detail = parse_item_detail(html);
        assert_eq!(detail.potential_grade.as_deref(), Some("레전드리"));
        assert_eq!(detail.potential_option_3.as_deref(), Some("올스탯 +6%"));
        assert_eq!(detail.additional_grade.as_deref(), Some("유니크"));
        assert_eq!(detail.additional_option_2.as_deref(), Some("STR +7%"));
        assert_eq!(detail.additional_option_3, None);
    }

    #[test]
    fn special_labels() {
        let html = r#"<div>
            <span>REQ LEV</span><div class="point_td"><em>200</em></div>
            <span>장비분류</span><div class="point_td">두손무기 | 두손검</div>
            <span>착용 가능한 직업</span><div class="point_td">전사</div>
            <span>소울옵션</span><div class="point_td">위대한 카웅의 소울 : 보스 몬스터 공격 시 데미지 +7%</div>
        </div>"#;
        let detail = parse_item_detail(html);
        assert_eq!(detail.required_level, Some(200));
        assert_eq!(detail.category.as_deref(), Some("두손검"));
        assert_eq!(detail.required_job.as_deref(), Some("전사"));
        assert_eq!(detail.soul_name.as_deref(), Some("위대한 카웅의 소울"));
        assert_eq!(
            detail.soul_option.as_deref(),
            Some("보스 몬스터 공격 시 데미지 +7%")
        );
    }

    #[test]
    fn empty_page_is_all_none() {
        assert_eq!(parse_item_detail("<html></html>"), ItemDetail::default());
    }
}
