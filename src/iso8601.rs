//! Recognition of the ISO 8601 date and time forms accepted in rules.
//!
//! Values with a UTC offset are normalized to UTC; values without one are
//! returned as written.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%Y%m%dT%H%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%G-W%V-%u", "%GW%V%u"];

/// Parse an ISO 8601 date or date-time.
#[must_use]
pub fn parse(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(utc) = text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        return parse_naive(utc);
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.naive_utc());
    }
    OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(text, format).ok())
        .map(|with_offset| with_offset.naive_utc())
        .or_else(|| parse_naive(text))
}

#[must_use]
pub fn is_iso8601_date(text: &str) -> bool {
    parse(text).is_some()
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(datetime);
    }
    parse_date(text).map(|date| date.and_time(NaiveTime::MIN))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if !text.is_ascii() {
        return None;
    }
    // chrono's %j takes one to three digits, so reduced precision forms and
    // ordinal dates are told apart by length before the full formats run.
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    let dashed = text.len() > 4 && text.as_bytes()[4] == b'-';
    match text.len() {
        4 if all_digits(text) => {
            return NaiveDate::parse_from_str(&format!("{text}-01-01"), "%Y-%m-%d").ok();
        }
        7 if dashed && all_digits(&text[..4]) && all_digits(&text[5..]) => {
            return NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d").ok();
        }
        8 if dashed && all_digits(&text[..4]) && all_digits(&text[5..]) => {
            return NaiveDate::parse_from_str(text, "%Y-%j").ok();
        }
        8 if text.contains("-W") => {
            return NaiveDate::parse_from_str(&format!("{text}-1"), "%G-W%V-%u").ok();
        }
        _ => {}
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}
