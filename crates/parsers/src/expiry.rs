//! Expiry-date extraction from item card text.
//!
//! Dates on the site are vendor-local (KST). Four formats are recognised,
//! tried from most to least specific; date-only forms expire at the end
//! of the day.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use mapletrack_core::time::from_local;
use mapletrack_core::types::Timestamp;
use regex::{Captures, Regex};

static KOREAN_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일\s*(\d{1,2})시\s*(\d{1,2})분")
        .expect("valid regex")
});

static NUMERIC_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[./-]\s*(\d{1,2})[./-]\s*(\d{1,2})\.?\s+(\d{1,2}):(\d{2})")
        .expect("valid regex")
});

static KOREAN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일").expect("valid regex")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[./-]\s*(\d{1,2})[./-]\s*(\d{1,2})").expect("valid regex")
});

fn field(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i)?.as_str().parse().ok()
}

fn date_of(caps: &Captures<'_>) -> Option<NaiveDate> {
    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, field(caps, 2)?, field(caps, 3)?)
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Parse the first expiry date found in `text`.
///
/// Returns `None` when no pattern matches or the matched numbers do not
/// form a real date; callers treat that as "does not expire".
pub fn parse_expiry(text: &str) -> Option<Timestamp> {
    for re in [&*KOREAN_DATETIME, &*NUMERIC_DATETIME] {
        if let Some(caps) = re.captures(text) {
            let time = NaiveTime::from_hms_opt(field(&caps, 4)?, field(&caps, 5)?, 0)?;
            return from_local(date_of(&caps)?.and_time(time));
        }
    }

    for re in [&*KOREAN_DATE, &*NUMERIC_DATE] {
        if let Some(caps) = re.captures(text) {
            return from_local(date_of(&caps)?.and_time(end_of_day()));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn korean_datetime_is_kst() {
        let ts = parse_expiry("2024년 5월 12일 23시 59분까지 사용가능").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 12, 14, 59, 0).unwrap());
    }

    #[test]
    fn numeric_datetime_accepts_all_separators() {
        let expected = Utc.with_ymd_and_hms(2024, 7, 1, 3, 30, 0).unwrap();
        assert_eq!(parse_expiry("2024.07.01 12:30까지"), Some(expected));
        assert_eq!(parse_expiry("2024-07-01 12:30"), Some(expected));
        assert_eq!(parse_expiry("2024/7/1 12:30"), Some(expected));
    }

    #[test]
    fn date_only_expires_at_end_of_local_day() {
        let expected = Utc.with_ymd_and_hms(2024, 8, 15, 14, 59, 59).unwrap();
        assert_eq!(parse_expiry("유효기간: 2024년 8월 15일"), Some(expected));
        assert_eq!(parse_expiry("2024.08.15까지"), Some(expected));
    }

    #[test]
    fn impossible_dates_and_plain_text_yield_none() {
        assert_eq!(parse_expiry("2024년 2월 30일"), None);
        assert_eq!(parse_expiry("2024.13.01 10:00"), None);
        assert_eq!(parse_expiry("교환 불가"), None);
    }
}
