//! Vendor-local calendar helpers.
//!
//! The vendor publishes in KST (UTC+9, no daylight saving). History
//! snapshots, hourly counters and expiry checkpoints are all bucketed on
//! this fixed offset, never on the host's local zone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::types::Timestamp;

/// Offset of the vendor's nominal time zone from UTC.
pub const VENDOR_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// The vendor's fixed offset.
pub fn vendor_offset() -> FixedOffset {
    FixedOffset::east_opt(VENDOR_UTC_OFFSET_SECS).expect("UTC+9 is a valid offset")
}

/// Convert a UTC instant to vendor-local wall-clock time.
pub fn to_local(ts: Timestamp) -> DateTime<FixedOffset> {
    ts.with_timezone(&vendor_offset())
}

/// The vendor-local calendar day containing `ts`.
pub fn local_date(ts: Timestamp) -> NaiveDate {
    to_local(ts).date_naive()
}

/// The vendor-local hour (0-23) containing `ts`.
pub fn local_hour(ts: Timestamp) -> u32 {
    to_local(ts).hour()
}

/// Interpret a naive vendor-local date-time as a UTC instant.
pub fn from_local(naive: NaiveDateTime) -> Option<Timestamp> {
    vendor_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `YYYY-MM-DD` key used by day-bucketed cache counters.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
