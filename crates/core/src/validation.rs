//! Field-level validation of parsed items.
//!
//! A bad item is dropped with a warning; it never fails the crawl that
//! produced it.

use validator::Validate;

use crate::error::CoreError;
use crate::item::{ItemDetail, ParsedItem};

/// An item that failed validation, kept for the step's partial result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedItem {
    pub slot_index: i32,
    pub name: String,
    pub reason: String,
}

/// Outcome of validating one page's worth of items.
#[derive(Debug, Clone, Default)]
pub struct ItemReport {
    pub valid: Vec<ParsedItem>,
    pub dropped: Vec<DroppedItem>,
}

/// Split parsed items into valid and dropped, preserving slot order.
pub fn validate_items(items: Vec<ParsedItem>) -> ItemReport {
    let mut report = ItemReport::default();

    for item in items {
        match item.validate() {
            Ok(()) => report.valid.push(item),
            Err(errors) => {
                tracing::warn!(
                    slot_index = item.slot_index,
                    name = %item.name,
                    error = %errors,
                    "Dropping item that failed validation",
                );
                report.dropped.push(DroppedItem {
                    slot_index: item.slot_index,
                    name: item.name,
                    reason: errors.to_string(),
                });
            }
        }
    }

    report
}

/// Validate a parsed item detail.
pub fn validate_detail(detail: &ItemDetail) -> Result<(), CoreError> {
    detail.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::item::{ItemOptions, ItemType};

    fn item(slot: i32, quantity: i32) -> ParsedItem {
        ParsedItem {
            slot_index: slot,
            item_type: ItemType::Etc,
            name: "주문의 흔적".into(),
            icon_url: Some("https://avatar.maplestory.nexon.com/ItemIcon/KEHCJAKD.png".into()),
            quantity,
            options: ItemOptions::default(),
            detail_url: None,
            expiry_at: None,
        }
    }

    #[test]
    fn zero_quantity_is_dropped() {
        let report = validate_items(vec![item(0, 0), item(1, 1)]);
        assert_eq!(report.valid.len(), 1);
        assert_eq!(report.valid[0].slot_index, 1);
        assert_eq!(report.dropped.len(), 1);
        assert!(report.dropped[0].reason.contains("quantity"));
    }

    #[test]
    fn negative_slot_is_dropped() {
        let report = validate_items(vec![item(-1, 3)]);
        assert!(report.valid.is_empty());
    }

    #[test]
    fn relative_icon_url_is_dropped() {
        let mut bad = item(0, 1);
        bad.icon_url = Some("/ItemIcon/KEHCJAKD.png".into());
        let report = validate_items(vec![bad]);
        assert_eq!(report.dropped.len(), 1);
        assert!(report.dropped[0].reason.contains("icon_url"));
    }

    #[test]
    fn missing_urls_are_fine() {
        let mut ok = item(0, 1);
        ok.icon_url = None;
        assert_eq!(validate_items(vec![ok]).valid.len(), 1);
    }

    #[test]
    fn detail_ranges_are_enforced() {
        let ok = ItemDetail {
            required_level: Some(200),
            boss_damage: Some(30),
            ..Default::default()
        };
        assert!(validate_detail(&ok).is_ok());

        let too_high = ItemDetail {
            required_level: Some(301),
            ..Default::default()
        };
        assert_matches!(validate_detail(&too_high), Err(CoreError::Validation(_)));

        let boss = ItemDetail {
            boss_damage: Some(140),
            ..Default::default()
        };
        assert_matches!(validate_detail(&boss), Err(CoreError::Validation(_)));
    }

    #[test]
    fn negative_flat_stats_are_valid() {
        let cursed = ItemDetail {
            str_stat: Some(-5),
            max_hp: Some(-300),
            ..Default::default()
        };
        assert!(validate_detail(&cursed).is_ok());

        let floor = ItemDetail {
            attack: Some(-10001),
            ..Default::default()
        };
        assert_matches!(validate_detail(&floor), Err(CoreError::Validation(_)));
    }
}
