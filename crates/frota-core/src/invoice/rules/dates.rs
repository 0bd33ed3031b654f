//! Date parsing and normalization to ISO `YYYY-MM-DD`.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

use super::patterns::{DATE_DMY, DATE_ISO};
use super::{ExtractionMatch, FieldExtractor};

/// Finds `DD/MM/YYYY` dates in text.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in DATE_DMY.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let year: i32 = caps[3].parse().unwrap_or(0);

            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                let Some(full_match) = caps.get(0) else { continue };
                results.push(
                    ExtractionMatch::new(date, 0.9, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                );
            }
        }

        results
    }
}

/// Date-only formats tried after ISO and `DD/MM/YYYY`.
///
/// Two-digit years come first; `%Y` would otherwise read `24` as year 24.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d.%m.%y",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d/%b/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parse a date in any of the accepted notations.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    if DATE_ISO.is_match(s) {
        return iso_date(s);
    }

    if let Some(caps) = DATE_DMY.captures(s) {
        if caps.get(0).map(|m| m.as_str().len()) == Some(s.len()) {
            if let Some(date) = NaiveDate::from_ymd_opt(
                caps[3].parse().ok()?,
                caps[2].parse().ok()?,
                caps[1].parse().ok()?,
            ) {
                return Some(date);
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

/// Normalize a date to `YYYY-MM-DD`.
///
/// ISO input is returned unchanged, `DD/MM/YYYY` is reordered, other
/// notations go through [`parse_date`]. Unparsable input comes back as given.
pub fn normalize_date(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if DATE_ISO.is_match(trimmed) {
        return trimmed.to_string();
    }

    match parse_date(trimmed) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => value.to_string(),
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn iso_date(value: &str) -> Option<NaiveDate> {
    let caps = DATE_ISO.captures(value.trim())?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

/// Due date `days` after an ISO issue date; empty when the issue date is not valid.
pub fn due_date_from_issue(issue_date: &str, days: u32) -> String {
    iso_date(issue_date)
        .and_then(|date| date.checked_add_days(Days::new(u64::from(days))))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
