// Timestamp parsing for the ingestion boundary
// accepts any unambiguous datetime string, naive values are taken as UTC

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

// naive layouts tried in order after RFC 3339
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Parse a timestamp column value.
///
/// Accepted forms, first match wins:
/// - RFC 3339 (`2024-01-15T10:30:00Z`, `2024-01-15T10:30:00+02:00`)
/// - `YYYY-MM-DD HH:MM:SS[.f]` with a trailing offset (`+02:00`)
/// - naive `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]`,
///   `YYYY-MM-DD HH:MM`, `YYYY/MM/DD HH:MM:SS[.f]` (UTC)
/// - `YYYY-MM-DD` (midnight UTC)
/// - Unix seconds, integral or fractional
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    raw.parse::<f64>().ok().and_then(from_unix_seconds)
}

/// Convert fractional Unix seconds (the metrics wire format) into an instant.
pub fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
        return None;
    }

    let mut whole = whole as i64;
    let mut nanos = ((secs - secs.floor()) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        whole += 1;
        nanos = 0;
    }
    DateTime::from_timestamp(whole, nanos)
}
