//! Small shared helpers.

use chrono::{Datelike, Duration, NaiveDate};

/// Monday and Friday of the week containing `date`.
///
/// Weekend dates resolve to the week they close: Saturday and Sunday map
/// back to the preceding Monday.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(4))
}

/// Label for a closed-out week, e.g. "2026-08-03 a 2026-08-07".
pub fn week_label(monday: NaiveDate, friday: NaiveDate) -> String {
    format!("{} a {}", monday, friday)
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
