//! Weekly snapshot loading.
//!
//! Resolution order for the list of available snapshot files:
//! 1. `{history}/index.json` (a JSON array of filenames, or `{ "files": [...] }`)
//! 2. If the index is missing or unreadable, the last 52 ISO weeks by name
//!
//! Files are fetched one at a time. A failed or malformed file is logged and
//! skipped; it never stops the rest of the load.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::error::FetchError;
use crate::services::parse_in_canada_services;
use crate::state::Session;
use crate::types::{InCanadaServices, Snapshot};
use crate::week::{
    approximate_week_start, in_canada_filename, iso_week, parse_snapshot_filename,
    snapshot_filename,
};

/// Weeks covered by the generated fallback list.
pub const FALLBACK_WEEKS: usize = 52;

/// In-Canada probes: the current week plus this many weeks back.
pub const IN_CANADA_LOOKBACK_WEEKS: u32 = 4;

pub const INDEX_FILE: &str = "index.json";

/// Candidate filenames for the last 52 weeks, oldest first.
pub fn generate_weekly_file_list(today: NaiveDate) -> Vec<String> {
    let mut files: Vec<String> = (0..FALLBACK_WEEKS)
        .filter_map(|i| today.checked_sub_signed(Duration::days(7 * i as i64)))
        .map(|date| {
            let (year, week) = iso_week(date);
            snapshot_filename(year, week)
        })
        .collect();
    files.reverse();
    files
}

/// Filenames listed by an index document, if it has a recognizable shape.
fn files_from_index(index: &Value) -> Option<Vec<String>> {
    let list = match index {
        Value::Array(items) => items,
        Value::Object(map) => map.get("files")?.as_array()?,
        _ => return None,
    };
    Some(
        list.iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
    )
}

/// List the snapshot files that should exist, preferring the published index.
pub async fn resolve_available_snapshot_files(session: &Session, today: NaiveDate) -> Vec<String> {
    let index_path = session.config().history_file(INDEX_FILE);

    match session.fetch_with_cache(&index_path).await {
        Ok(index) => match files_from_index(&index) {
            Some(files) => {
                log::info!("Snapshot index lists {} files", files.len());
                return files;
            }
            None => log::warn!("Snapshot index has an unexpected shape, using generated list"),
        },
        Err(e) => log::info!("No snapshot index ({}), using generated list", e),
    }

    generate_weekly_file_list(today)
}

/// Build a snapshot from a fetched file. Unrecognized names give the sentinel form.
pub fn snapshot_from_file(filename: &str, payload: Value) -> Snapshot {
    let parsed = parse_snapshot_filename(filename);
    let timestamp = parsed.and_then(|(year, week)| approximate_week_start(year, week));
    Snapshot {
        filename: filename.to_string(),
        year: parsed.map(|(year, _)| year),
        week: parsed.map(|(_, week)| week),
        timestamp,
        payload,
    }
}

/// Drop duplicate names and order chronologically by parsed `(year, week)`.
///
/// `2025-W9.json` sorts before `2025-W10.json`. Names that do not parse keep
/// their relative order and go first, like sentinel snapshots.
pub fn order_snapshot_files(files: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut files: Vec<String> = files
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect();
    files.sort_by_key(|name| parse_snapshot_filename(name));
    files
}

/// Load at most `max_weeks` of the most recent snapshots into the session.
pub async fn load_weekly_data<'s>(
    session: &'s mut Session,
    max_weeks: usize,
    today: NaiveDate,
) -> &'s [Snapshot] {
    let files = order_snapshot_files(resolve_available_snapshot_files(session, today).await);
    let start = files.len().saturating_sub(max_weeks);
    let selected = &files[start..];

    let mut snapshots = Vec::with_capacity(selected.len());
    for filename in selected {
        let path = session.config().history_file(filename);
        match session.fetch_with_cache(&path).await {
            Ok(payload) => {
                let snapshot = snapshot_from_file(filename, payload);
                if !snapshot.is_valid() {
                    log::warn!("Snapshot {} has an unrecognized filename", filename);
                }
                snapshots.push(snapshot);
            }
            Err(e) => log::warn!("Skipping snapshot {}: {}", filename, e),
        }
    }

    // Stable: equal timestamps keep fetch order; sentinels (None) sort first
    snapshots.sort_by_key(|s| s.timestamp);
    log::info!(
        "Loaded {} of {} requested snapshots",
        snapshots.len(),
        selected.len()
    );

    session.set_snapshots(snapshots);
    session.snapshots()
}

/// Candidate `(year, week)` pairs probed for in-Canada services, newest first.
///
/// Weeks before week 1 wrap to `52 + week` of the previous year. Years with 53
/// ISO weeks are not special-cased; published filenames follow the same rule.
pub fn in_canada_candidates(today: NaiveDate) -> Vec<(i32, u32)> {
    let (year, week) = iso_week(today);
    (0..=IN_CANADA_LOOKBACK_WEEKS)
        .map(|back| {
            let week_to_try = week as i64 - back as i64;
            if week_to_try <= 0 {
                (year - 1, (52 + week_to_try) as u32)
            } else {
                (year, week_to_try as u32)
            }
        })
        .collect()
}

/// Find the newest in-Canada services file, probing recent weeks.
pub async fn find_latest_in_canada_file(
    session: &Session,
    today: NaiveDate,
) -> Result<String, FetchError> {
    for (year, week) in in_canada_candidates(today) {
        let path = session.config().history_file(&in_canada_filename(year, week));
        if session.source().exists(&path).await {
            log::info!("Found in-Canada services data: {}", path);
            return Ok(path);
        }
        log::debug!("No in-Canada services file at {}", path);
    }
    Err(FetchError::NotFound(
        "No in-Canada services data found for recent weeks".to_string(),
    ))
}

/// Load and parse the newest in-Canada services document.
pub async fn load_in_canada_services(
    session: &Session,
    today: NaiveDate,
) -> Result<InCanadaServices, FetchError> {
    let path = find_latest_in_canada_file(session, today).await?;
    let doc = session.fetch_with_cache(&path).await?;
    let mut services = parse_in_canada_services(&doc);
    services.source_file = path;
    Ok(services)
}
