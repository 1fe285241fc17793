//! Exchange-time helpers.
//!
//! Bar timestamps are epoch milliseconds in UTC. The exchanges trade on
//! Asia/Shanghai wall time, so the calendar date a bar belongs to is derived in that
//! zone; a UTC date would put every bar on the previous day.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::{Asia::Shanghai, Tz};

/// Exchange time zone.
pub const EXCHANGE_TZ: Tz = Shanghai;

/// Convert epoch millis to a UTC datetime, `None` when out of range.
pub fn from_millis(ts_ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_ms)
}

/// Exchange-local calendar date of `ts_ms`.
pub fn exchange_date(ts_ms: i64) -> Option<NaiveDate> {
    from_millis(ts_ms).map(|dt| dt.with_timezone(&EXCHANGE_TZ).date_naive())
}

/// Current time as epoch millis.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a UTC datetime as an RFC-3339 string with millisecond precision.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
