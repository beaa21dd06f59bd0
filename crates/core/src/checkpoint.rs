//! Expiry notification checkpoints (D-7, D-3, D-1, expired).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::local_date;
use crate::types::Timestamp;

/// Notification horizon bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Checkpoint {
    #[serde(rename = "D7")]
    D7,
    #[serde(rename = "D3")]
    D3,
    #[serde(rename = "D1")]
    D1,
    #[serde(rename = "EXPIRED")]
    Expired,
}

/// Days-remaining values that trigger a notification.
pub const CHECKPOINT_DAYS: [i64; 3] = [7, 3, 1];

impl Checkpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Checkpoint::D7 => "D7",
            Checkpoint::D3 => "D3",
            Checkpoint::D1 => "D1",
            Checkpoint::Expired => "EXPIRED",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "D7" => Some(Checkpoint::D7),
            "D3" => Some(Checkpoint::D3),
            "D1" => Some(Checkpoint::D1),
            "EXPIRED" => Some(Checkpoint::Expired),
            _ => None,
        }
    }

    /// Label for a days-remaining value, regardless of candidacy.
    pub fn for_days(days: i64) -> Self {
        match days {
            d if d <= 0 => Checkpoint::Expired,
            1 => Checkpoint::D1,
            d if d <= 3 => Checkpoint::D3,
            _ => Checkpoint::D7,
        }
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole vendor-local days from `today` until the day `expiry_at` falls on.
pub fn days_until(expiry_at: Timestamp, today: NaiveDate) -> i64 {
    (local_date(expiry_at) - today).num_days()
}

/// The checkpoint an item is at today, if it is a notification candidate.
///
/// Candidates are exactly 7, 3 or 1 days out, or already past expiry.
pub fn checkpoint_for(days: i64) -> Option<Checkpoint> {
    if CHECKPOINT_DAYS.contains(&days) || days < 0 {
        Some(Checkpoint::for_days(days))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn only_fixed_days_and_past_are_candidates() {
        assert_eq!(checkpoint_for(7), Some(Checkpoint::D7));
        assert_eq!(checkpoint_for(3), Some(Checkpoint::D3));
        assert_eq!(checkpoint_for(1), Some(Checkpoint::D1));
        assert_eq!(checkpoint_for(-1), Some(Checkpoint::Expired));
        assert_eq!(checkpoint_for(-30), Some(Checkpoint::Expired));

        for d in [0, 2, 4, 5, 6, 8, 30] {
            assert_eq!(checkpoint_for(d), None, "day {d}");
        }
    }

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(Checkpoint::for_days(0), Checkpoint::Expired);
        assert_eq!(Checkpoint::for_days(2), Checkpoint::D3);
        assert_eq!(Checkpoint::for_days(6), Checkpoint::D7);
    }

    #[test]
    fn days_until_counts_vendor_local_days() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        // 2024-05-12 23:59:59 KST
        let expiry = Utc.with_ymd_and_hms(2024, 5, 12, 14, 59, 59).unwrap();
        assert_eq!(days_until(expiry, today), 2);

        // 2024-05-09 KST is in the past.
        let past = Utc.with_ymd_and_hms(2024, 5, 9, 3, 0, 0).unwrap();
        assert_eq!(days_until(past, today), -1);
        assert_eq!(checkpoint_for(days_until(past, today)), Some(Checkpoint::Expired));
    }

    #[test]
    fn serde_uses_upper_labels() {
        assert_eq!(serde_json::to_string(&Checkpoint::Expired).unwrap(), "\"EXPIRED\"");
        assert_eq!(serde_json::to_string(&Checkpoint::D3).unwrap(), "\"D3\"");
    }
}
