use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration stored in ~/.proctime/config.json
///
/// Every field has a default, so an empty `{}` (or no file at all) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL every document path is resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_country_names_path")]
    pub country_names_path: String,
    #[serde(default = "default_current_times_path")]
    pub current_times_path: String,
    /// Directory (relative to the base) holding weekly snapshots and `index.json`.
    #[serde(default = "default_history_path")]
    pub history_path: String,
    /// How many of the most recent weekly snapshots to load.
    #[serde(default = "default_max_weeks")]
    pub max_weeks: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Extra attempts for retryable failures. Zero keeps single-shot fetches.
    #[serde(default)]
    pub retries: u32,
    /// Read documents from a local directory instead of `base_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

fn default_base_url() -> String {
    "https://www.canada.ca/content/dam/ircc/documents/json/".to_string()
}

fn default_country_names_path() -> String {
    "data-country-name-en.json".to_string()
}

fn default_current_times_path() -> String {
    "data-ptime-en.json".to_string()
}

fn default_history_path() -> String {
    "history/".to_string()
}

fn default_max_weeks() -> usize {
    12
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            country_names_path: default_country_names_path(),
            current_times_path: default_current_times_path(),
            history_path: default_history_path(),
            max_weeks: default_max_weeks(),
            request_timeout_secs: default_request_timeout_secs(),
            retries: 0,
            data_dir: None,
        }
    }
}

impl Config {
    /// Path of a file inside the history directory.
    pub fn history_file(&self, filename: &str) -> String {
        let dir = self.history_path.trim_end_matches('/');
        if dir.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", dir, filename)
        }
    }
}

/// One weekly processing-times document.
///
/// `year`, `week` and `timestamp` are `None` when the filename did not follow
/// `{year}-W{week}.json`; such snapshots are skipped by the aggregator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub filename: String,
    pub year: Option<i32>,
    pub week: Option<u32>,
    pub timestamp: Option<NaiveDate>,
    pub payload: Value,
}

impl Snapshot {
    pub fn is_valid(&self) -> bool {
        self.year.is_some() && self.week.is_some() && self.timestamp.is_some()
    }
}

/// A single (week, category, country) observation taken from a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub week_label: String,
    pub category: String,
    pub country: String,
    pub raw_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub week_label: String,
    /// Always finite; points without a numeric value never get this far.
    pub value: f64,
    pub raw: Value,
}

/// Points for one category, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySeries {
    pub category: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficient-data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSummary {
    pub trend: TrendDirection,
    /// Percent change of the recent window against the older one, 2 decimals.
    pub change: f64,
}

impl TrendSummary {
    pub fn insufficient() -> Self {
        Self {
            trend: TrendDirection::InsufficientData,
            change: 0.0,
        }
    }
}

/// Headline numbers for one category series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub category: String,
    pub points: usize,
    pub latest: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub trend: TrendSummary,
}

/// One row of the per-country processing table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRow {
    pub category: String,
    pub label: String,
    pub display_value: String,
    pub raw: Value,
}

/// One in-Canada service entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTime {
    /// Category block the service was listed under (object-shaped documents only).
    pub group: Option<String>,
    pub service: String,
    pub time: Value,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InCanadaServices {
    pub source_file: String,
    pub entries: Vec<ServiceTime>,
    pub last_updated: Option<String>,
}
