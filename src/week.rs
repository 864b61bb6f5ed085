//! ISO week helpers used to name and locate weekly snapshot files.
//!
//! Snapshot files are published as `{year}-W{week:02}.json`. The reverse
//! mapping (`approximate_week_start`) is intentionally coarse: it adds
//! `(week - 1) * 7` days to January 1st, so it can sit a few days away from
//! the real ISO Monday. Everything downstream only sorts on it.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;

fn re_snapshot_file() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-W(\d{1,2})\.json$").unwrap())
}

/// ISO-8601 week-year and week number (1..=53) for a calendar date.
pub fn iso_week(date: NaiveDate) -> (i32, u32) {
    let iso = date.iso_week();
    (iso.year(), iso.week())
}

/// ISO week of an instant, truncated to its UTC calendar day.
pub fn iso_week_of(instant: DateTime<Utc>) -> (i32, u32) {
    iso_week(instant.date_naive())
}

/// Approximate first day of `(year, week)`: Jan 1 plus `(week - 1) * 7` days.
pub fn approximate_week_start(year: i32, week: u32) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let offset = i64::from(week.saturating_sub(1)) * 7;
    jan1.checked_add_signed(Duration::days(offset))
}

/// Label used for chart axes and records, e.g. `2025-W07`.
pub fn week_label(year: i32, week: u32) -> String {
    format!("{}-W{:02}", year, week)
}

pub fn snapshot_filename(year: i32, week: u32) -> String {
    format!("{}.json", week_label(year, week))
}

pub fn in_canada_filename(year: i32, week: u32) -> String {
    format!("{}-in-canada-services.json", week_label(year, week))
}

/// Parse `{year}-W{week}.json` back into `(year, week)`.
///
/// Anything else (including the in-Canada services files) returns `None`.
pub fn parse_snapshot_filename(filename: &str) -> Option<(i32, u32)> {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    let caps = re_snapshot_file().captures(name)?;
    let year: i32 = caps[1].parse().ok()?;
    let week: u32 = caps[2].parse().ok()?;
    if (1..=53).contains(&week) {
        Some((year, week))
    } else {
        None
    }
}
