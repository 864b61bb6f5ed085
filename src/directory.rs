//! Country directory and the current processing-times table.
//!
//! Both documents are fetched together when a dashboard opens; if either one
//! fails, there is no dashboard.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FetchError;
use crate::extract::display_time_value;
use crate::state::Session;
use crate::types::ProcessingRow;

pub const NO_DATA_MESSAGE: &str = "No processing time data available.";

const COUNTRY_NAME_KEY: &str = "country-name";
const LAST_UPDATED: &str = "lastupdated";

/// Country code → display name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CountryDirectory {
    names: BTreeMap<String, String>,
}

impl CountryDirectory {
    /// Read `{ "country-name": { "<code>": "<name>" } }`. Non-string names are ignored.
    pub fn from_value(doc: &Value) -> Self {
        let names = doc
            .get(COUNTRY_NAME_KEY)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(code, name)| Some((code.clone(), name.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Self { names }
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(code, name)` pairs ordered by display name, as shown in the selector.
    pub fn sorted_by_name(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .names
            .iter()
            .map(|(code, name)| (code.as_str(), name.as_str()))
            .collect();
        entries.sort_by(|a, b| a.1.to_lowercase().cmp(&b.1.to_lowercase()));
        entries
    }

    /// Resolve a code or a display name (case-insensitive) to a country code.
    pub fn resolve(&self, query: &str) -> Option<&str> {
        let query = query.trim();
        if let Some((code, _)) = self.names.get_key_value(query) {
            return Some(code.as_str());
        }
        self.names
            .iter()
            .find(|(code, name)| {
                code.eq_ignore_ascii_case(query) || name.eq_ignore_ascii_case(query)
            })
            .map(|(code, _)| code.as_str())
    }
}

/// The current processing-times document, in document order.
#[derive(Debug, Clone, Default)]
pub struct CurrentTimes {
    categories: Vec<(String, Map<String, Value>)>,
    last_updated: Option<String>,
}

impl CurrentTimes {
    /// `lastupdated` may appear in several category blocks; the last one wins.
    pub fn from_value(doc: &Value) -> Self {
        let mut current = CurrentTimes::default();
        let Some(map) = doc.as_object() else {
            log::warn!("Current processing-times document is not an object");
            return current;
        };

        for (category, block) in map {
            let Some(block) = block.as_object() else {
                continue;
            };
            if let Some(updated) = block.get(LAST_UPDATED).and_then(Value::as_str) {
                current.last_updated = Some(updated.to_string());
            }
            current.categories.push((category.clone(), block.clone()));
        }

        current
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }

    /// One row per category that lists `country_code`.
    pub fn rows_for_country(&self, country_code: &str) -> Vec<ProcessingRow> {
        if country_code == LAST_UPDATED {
            return Vec::new();
        }
        self.categories
            .iter()
            .filter_map(|(category, block)| {
                let raw = block.get(country_code)?;
                Some(ProcessingRow {
                    category: category.clone(),
                    label: category_label(category),
                    display_value: display_time_value(raw),
                    raw: raw.clone(),
                })
            })
            .collect()
    }
}

/// Everything the country table needs, loaded once per session.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub directory: CountryDirectory,
    pub current: CurrentTimes,
}

impl Dashboard {
    /// Fetch the country directory and current times concurrently.
    pub async fn load(session: &Session) -> Result<Self, FetchError> {
        let config = session.config();
        let (names, times) = tokio::try_join!(
            session.fetch_with_cache(&config.country_names_path),
            session.fetch_with_cache(&config.current_times_path)
        )?;

        let dashboard = Self::from_documents(&names, &times);
        log::info!(
            "Dashboard ready: {} countries, last updated {}",
            dashboard.directory.len(),
            dashboard.current.last_updated().unwrap_or("unknown")
        );
        Ok(dashboard)
    }

    pub fn from_documents(names: &Value, times: &Value) -> Self {
        Self {
            directory: CountryDirectory::from_value(names),
            current: CurrentTimes::from_value(times),
        }
    }

    pub fn rows_for_country(&self, country_code: &str) -> Vec<ProcessingRow> {
        self.current.rows_for_country(country_code)
    }
}

/// Resolve a country code or display name for commands that do not load the
/// whole dashboard. Without a readable directory the query is taken as a code.
pub async fn resolve_country_code(session: &Session, query: &str) -> String {
    let fallback = query.trim().to_uppercase();
    match session
        .fetch_with_cache(&session.config().country_names_path)
        .await
    {
        Ok(doc) => CountryDirectory::from_value(&doc)
            .resolve(query)
            .map(|code| code.to_string())
            .unwrap_or(fallback),
        Err(e) => {
            log::debug!("Country directory unavailable ({}), using {} as a code", e, fallback);
            fallback
        }
    }
}

/// Human label for a category code: "study-permit" → "Study Permit".
pub fn category_label(code: &str) -> String {
    code.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::types::Config;
    use serde_json::json;

    fn directory_doc() -> Value {
        json!({ "country-name": { "IN": "India", "PH": "Philippines", "AF": "Afghanistan", "XX": 4 } })
    }

    #[test]
    fn test_directory_parsing_and_order() {
        let dir = CountryDirectory::from_value(&directory_doc());
        assert_eq!(dir.len(), 3);
        assert_eq!(dir.name("IN"), Some("India"));
        assert_eq!(dir.name("XX"), None);
        let names: Vec<&str> = dir.sorted_by_name().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["Afghanistan", "India", "Philippines"]);
    }

    #[test]
    fn test_directory_resolve() {
        let dir = CountryDirectory::from_value(&directory_doc());
        assert_eq!(dir.resolve("PH"), Some("PH"));
        assert_eq!(dir.resolve("ph"), Some("PH"));
        assert_eq!(dir.resolve("india"), Some("IN"));
        assert_eq!(dir.resolve("Atlantis"), None);
    }

    #[test]
    fn test_directory_missing_block_is_empty() {
        assert!(CountryDirectory::from_value(&json!({})).is_empty());
    }

    #[test]
    fn test_last_updated_last_one_wins() {
        let current = CurrentTimes::from_value(&json!({
            "visitor": { "IN": "20 days", "lastupdated": "2025-01-01" },
            "study": { "IN": "8 weeks", "lastupdated": "2025-01-08" },
            "work": { "IN": "10 weeks" }
        }));
        assert_eq!(current.last_updated(), Some("2025-01-08"));
        let cats: Vec<&str> = current.categories().collect();
        assert_eq!(cats, vec!["visitor", "study", "work"]);
    }

    #[test]
    fn test_rows_follow_document_order() {
        let current = CurrentTimes::from_value(&json!({
            "work-permit": { "IN": { "weeks": 10 } },
            "study-permit": { "IN": "12 months", "PH": "9 months" }
        }));
        let rows = current.rows_for_country("IN");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Work Permit");
        assert_eq!(rows[0].display_value, "10 weeks");
        assert_eq!(rows[1].category, "study-permit");
        assert!(current.rows_for_country("lastupdated").is_empty());
    }

    #[test]
    fn test_category_label() {
        assert_eq!(category_label("study-permit"), "Study Permit");
        assert_eq!(category_label("refugees_gov"), "Refugees Gov");
        assert_eq!(category_label("visitor"), "Visitor");
        assert_eq!(category_label(""), "");
    }

    #[tokio::test]
    async fn test_resolve_country_code_by_name_or_code() {
        let config = Config::default();
        let source = MemorySource::new().with_json(&config.country_names_path, directory_doc());
        let session = Session::new(config, Box::new(source));

        assert_eq!(resolve_country_code(&session, "india").await, "IN");
        assert_eq!(resolve_country_code(&session, " ph ").await, "PH");
        assert_eq!(resolve_country_code(&session, "zz").await, "ZZ");
    }

    #[tokio::test]
    async fn test_resolve_country_code_without_directory() {
        let session = Session::new(Config::default(), Box::new(MemorySource::new()));
        assert_eq!(resolve_country_code(&session, "in").await, "IN");
    }

    #[tokio::test]
    async fn test_dashboard_load_requires_both_documents() {
        let config = Config::default();
        let only_names = MemorySource::new().with_json(&config.country_names_path, directory_doc());
        let session = Session::new(config.clone(), Box::new(only_names));
        assert!(Dashboard::load(&session).await.is_err());

        let both = MemorySource::new()
            .with_json(&config.country_names_path, directory_doc())
            .with_json(
                &config.current_times_path,
                json!({ "study-permit": { "IN": "12 months", "lastupdated": "2025-01-01" } }),
            );
        let session = Session::new(config, Box::new(both));
        let dashboard = Dashboard::load(&session).await.unwrap();
        assert_eq!(dashboard.rows_for_country("IN").len(), 1);
        assert_eq!(dashboard.current.last_updated(), Some("2025-01-01"));
    }
}
