//! Date detection and display formatting.
//!
//! Report payloads carry dates as ISO strings, Unix timestamps or loosely
//! formatted text. [`format_date`] recognizes all of these and renders them as
//! `MM/DD/YYYY`; anything it cannot recognize is "not a date" (`None`) and
//! callers show the raw value instead. Nothing in here ever fails loudly.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use super::value::CellValue;

/// Display format for every recognized date.
pub const DISPLAY_FORMAT: &str = "%m/%d/%Y";

/// Timestamps and loosely parsed text only count as dates strictly inside
/// these years.
const MIN_YEAR_EXCLUSIVE: i32 = 1970;
const MAX_YEAR_EXCLUSIVE: i32 = 2100;

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const LOOSE_DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%Y/%m/%d %H:%M:%S"];

const LOOSE_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%a %b %d %Y",
];

/// Format any cell as `MM/DD/YYYY` if it is recognizable as a date.
pub fn format_date(value: &CellValue) -> Option<String> {
    detect_date(value).map(|dt| dt.format(DISPLAY_FORMAT).to_string())
}

/// Display form of a cell: the formatted date when it is one, the raw value
/// otherwise.
pub fn display_value(value: &CellValue) -> String {
    format_date(value).unwrap_or_else(|| value.to_string())
}

/// Recognize a cell as a date, trying in order:
///
/// 1. an actual date value;
/// 2. text starting with `YYYY-MM-DD` (optionally followed by `T` or whitespace);
/// 3. digit-only text as a Unix timestamp (seconds when exactly 10 digits,
///    milliseconds otherwise), year-bounded;
/// 4. any other parseable date text, year-bounded;
/// 5. a number taken as milliseconds since the epoch, year-bounded.
pub fn detect_date(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Date(dt) => Some(*dt),
        CellValue::Text(s) => detect_text_date(s),
        CellValue::Number(n) => from_millis_f64(*n).filter(within_bounds),
        CellValue::Null | CellValue::Bool(_) => None,
    }
}

fn detect_text_date(raw: &str) -> Option<NaiveDateTime> {
    let s = strip_quotes(raw.trim());
    if s.is_empty() {
        return None;
    }

    if is_iso_like(s) {
        if let Some(dt) = parse_datetime(s) {
            return Some(dt);
        }
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = s.parse::<i64>() {
            let millis = if s.len() == 10 { n.checked_mul(1000) } else { Some(n) };
            if let Some(dt) = millis.and_then(from_millis).filter(within_bounds) {
                return Some(dt);
            }
        }
    }

    parse_datetime(s).filter(within_bounds)
}

/// Interpret a cell as a point in time for date filters, without the year
/// bounds applied to display detection.
pub fn as_datetime(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::Date(dt) => Some(*dt),
        CellValue::Text(s) => parse_datetime(s),
        CellValue::Number(n) => from_millis_f64(*n),
        CellValue::Null | CellValue::Bool(_) => None,
    }
}

/// Parse free-form date text.
///
/// Accepts RFC 3339 / ISO 8601 (with or without time and offset), RFC 2822
/// and a handful of common human formats. Offsets are dropped after
/// conversion so the wall-clock date written in the text is kept.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in ISO_DATETIME_FORMATS.iter().chain(LOOSE_DATETIME_FORMATS) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_time(NaiveTime::MIN));
    }
    for fmt in LOOSE_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.naive_local())
}

/// Parse date text down to its calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_datetime(s).map(|dt| dt.date())
}

/// `YYYY-MM-DD` at the start of the string, optionally followed by `T` or
/// whitespace and anything after that.
fn is_iso_like(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 10 {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    digits(0..4) && b[4] == b'-' && digits(5..7) && b[7] == b'-' && digits(8..10)
}

/// Drop one leading and one trailing quote character, if present.
fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s);
    s.strip_suffix(['"', '\'']).unwrap_or(s)
}

fn from_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

fn from_millis_f64(millis: f64) -> Option<NaiveDateTime> {
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    from_millis(millis as i64)
}

fn within_bounds(dt: &NaiveDateTime) -> bool {
    dt.year() > MIN_YEAR_EXCLUSIVE && dt.year() < MAX_YEAR_EXCLUSIVE
}
