//! Time-value extraction from loosely typed JSON.
//!
//! Published processing times come in several shapes: a bare number, a string
//! such as `"45 days"`, or an object keyed by a unit (`{ "months": 3 }`).
//! Every function here is total over `serde_json::Value`: unknown shapes give
//! `None`, never a panic.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Object keys probed for a duration, in priority order.
pub const TIME_KEYS: [&str; 5] = ["months", "days", "weeks", "time", "duration"];

const DAYS_PER_MONTH: f64 = 30.44;
const WEEKS_PER_MONTH: f64 = 4.35;

fn re_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").unwrap())
}

fn re_number_with_unit() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*([A-Za-z]+)?").unwrap())
}

/// Unit a processing time is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Days,
    Weeks,
    Months,
    Years,
    Unknown,
}

impl TimeUnit {
    /// Recognize a unit word ("day", "Days", "month", ...). Anything else is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => TimeUnit::Days,
            "week" | "weeks" => TimeUnit::Weeks,
            "month" | "months" => TimeUnit::Months,
            "year" | "years" => TimeUnit::Years,
            _ => TimeUnit::Unknown,
        }
    }
}

/// Pull a numeric duration out of an arbitrary JSON value.
pub fn extract_time_value(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => first_number(s),
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::Object(map) => {
            let key = TIME_KEYS.iter().find(|k| map.contains_key(**k))?;
            extract_time_value(&map[*key])
        }
        Value::Array(_) | Value::Bool(_) | Value::Null => None,
    }
}

fn first_number(text: &str) -> Option<f64> {
    re_number()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Like [`extract_time_value`], but also reports the unit the value was given in.
pub fn extract_with_unit(value: &Value) -> Option<(f64, TimeUnit)> {
    match value {
        Value::String(s) => {
            let caps = re_number_with_unit().captures(s)?;
            let number = caps[1].parse::<f64>().ok()?;
            let unit = caps
                .get(2)
                .map(|m| TimeUnit::from_label(m.as_str()))
                .unwrap_or(TimeUnit::Unknown);
            Some((number, unit))
        }
        Value::Number(_) => extract_time_value(value).map(|v| (v, TimeUnit::Unknown)),
        Value::Object(map) => {
            let key = TIME_KEYS.iter().find(|k| map.contains_key(**k))?;
            let (number, nested_unit) = extract_with_unit(&map[*key])?;
            let unit = match TimeUnit::from_label(key) {
                // "time"/"duration" say nothing about the unit
                TimeUnit::Unknown => nested_unit,
                keyed => keyed,
            };
            Some((number, unit))
        }
        Value::Array(_) | Value::Bool(_) | Value::Null => None,
    }
}

/// Convert a duration to months. `None` and zero stay `None`.
pub fn normalize_to_months(value: Option<f64>, unit: TimeUnit) -> Option<f64> {
    let v = value.filter(|v| *v != 0.0)?;
    let months = match unit {
        TimeUnit::Days => v / DAYS_PER_MONTH,
        TimeUnit::Weeks => v / WEEKS_PER_MONTH,
        TimeUnit::Years => v * 12.0,
        TimeUnit::Months | TimeUnit::Unknown => v,
    };
    Some(months)
}

/// Extract a duration and express it in months.
pub fn extract_months(value: &Value) -> Option<f64> {
    let (number, unit) = extract_with_unit(value)?;
    normalize_to_months(Some(number), unit)
}

/// Text shown in the processing table for a raw time-value.
pub fn display_time_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(v) => format_number(v),
            None => n.to_string(),
        },
        Value::Object(map) => TIME_KEYS
            .iter()
            .find(|k| map.contains_key(**k))
            .map(|key| {
                let inner = display_time_value(&map[*key]);
                match *key {
                    "time" | "duration" => inner,
                    unit => format!("{} {}", inner, unit),
                }
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}
