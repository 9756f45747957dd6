//! Calendar-date parsing with time-of-day and offsets stripped.

use chrono::NaiveDate;

/// Day-first and month-name layouts seen in exported index histories.
///
/// Numeric day/month layouts are always read day-first, slashed or dashed.
const DATE_FORMATS: [&str; 7] = [
    "%d-%m-%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%Y%m%d",
];

/// Parse a date cell into a calendar date.
///
/// ISO-style values keep their wall-clock date: `2007-09-17 00:00:00+05:30`,
/// `2007-09-17T09:15:00Z` and `2007-09-17` all parse to 2007-09-17, so the
/// same trading day from two time zones compares equal.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let head = value.split(['T', ' ']).next().unwrap_or(value);
    if let Ok(date) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        return Some(date);
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
