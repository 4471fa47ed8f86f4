//! Helpers for input validation and conversion.
//!
//! Parsing of transport values (ids, dates, colours, names) lives here so that
//! the server and the engine agree on one set of rules. The functions that the
//! server needs are re-exported from the crate root.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Maximum length (in characters) of a category name.
pub(crate) const MAX_NAME_LEN: usize = 50;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a UUID coming from user input and return a labeled error on failure.
pub fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_day(value: &str, label: &str) -> ResultEngine<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        EngineError::InvalidDate(format!("invalid {label} format (expected YYYY-MM-DD)"))
    })
}

/// Parse an expense timestamp.
///
/// Accepts RFC 3339 (`2024-01-15T12:30:00Z`) or a bare date, which is read as
/// midnight UTC.
pub fn parse_timestamp(value: &str, label: &str) -> ResultEngine<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(start_of_day)
        .map_err(|_| {
            EngineError::InvalidDate(format!(
                "invalid {label} format (expected YYYY-MM-DD or RFC 3339)"
            ))
        })
}

/// First instant of `day` in UTC.
pub(crate) fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// First instant after `day` in UTC, or `None` at the end of the calendar.
pub(crate) fn end_of_day_exclusive(day: NaiveDate) -> Option<DateTime<Utc>> {
    day.checked_add_days(Days::new(1)).map(start_of_day)
}

/// Ensure `end` is not earlier than `start`.
pub(crate) fn ensure_date_order(start: NaiveDate, end: NaiveDate) -> ResultEngine<()> {
    if end < start {
        return Err(EngineError::InvalidDate(
            "end_date must be later than or equal to start_date".to_string(),
        ));
    }
    Ok(())
}

/// Trim and collapse inner whitespace of a display name.
pub(crate) fn normalize_display_name(value: &str) -> ResultEngine<String> {
    let display = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if display.is_empty() {
        return Err(EngineError::InvalidName(
            "category name is required".to_string(),
        ));
    }
    if display.chars().count() > MAX_NAME_LEN {
        return Err(EngineError::InvalidName(format!(
            "category name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(display)
}

/// Case- and accent-insensitive key used to compare names.
///
/// `"Café"`, `"cafe"` and `" CAFE "` share the key `"cafe"`.
pub(crate) fn normalize_name_key(value: &str) -> String {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in value.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_whitespace() {
            if !out.is_empty() && !prev_space {
                out.push(' ');
                prev_space = true;
            }
            continue;
        }
        for lower in ch.to_lowercase() {
            out.push(lower);
        }
        prev_space = false;
    }
    out.trim_end().to_string()
}

/// Validate a colour code and return it as `#RRGGBB` (upper-case).
pub(crate) fn normalize_color(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EngineError::InvalidColor(format!(
            "color_code must be 6 hex digits, got '{trimmed}'"
        )));
    }
    Ok(format!("#{}", hex.to_ascii_uppercase()))
}

/// Generate a random colour code (`#RRGGBB`).
pub(crate) fn random_color() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!("#{:02X}{:02X}{:02X}", bytes[0], bytes[1], bytes[2])
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Round a percentage to two decimals.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
