use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Midnight UTC on the first day of the calendar month containing `now`. Plan quotas are counted from here.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0).single().unwrap_or(now)
}
