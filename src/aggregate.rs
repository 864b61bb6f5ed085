//! Historical aggregation: weekly snapshots → per-category time series.
//!
//! Snapshots are only read. Records and series are new values owned by the
//! caller. Points whose raw value has no numeric reading are dropped quietly.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::extract::{extract_months, extract_time_value};
use crate::types::{
    CategorySeries, HistoricalRecord, SeriesPoint, SeriesSummary, Snapshot, TrendDirection,
    TrendSummary,
};
use crate::week::week_label;

/// Size of each averaging window used by [`calculate_trend`].
pub const TREND_WINDOW: usize = 4;

/// Percent change beyond which a series counts as moving.
pub const TREND_THRESHOLD: f64 = 5.0;

/// Flatten snapshots into `(week, category, country)` observations.
///
/// Snapshots with an unrecognized filename are skipped with a warning.
pub fn flatten_records(
    snapshots: &[Snapshot],
    country_code: &str,
    category: Option<&str>,
) -> Vec<HistoricalRecord> {
    let mut records = Vec::new();

    for snapshot in snapshots {
        let (Some(year), Some(week), Some(date)) = (snapshot.year, snapshot.week, snapshot.timestamp)
        else {
            log::warn!(
                "Skipping snapshot {}: filename is not year-week formatted",
                snapshot.filename
            );
            continue;
        };
        let Some(payload) = snapshot.payload.as_object() else {
            log::warn!("Skipping snapshot {}: payload is not an object", snapshot.filename);
            continue;
        };

        let label = week_label(year, week);
        for (name, block) in payload {
            if category.is_some_and(|wanted| wanted != name.as_str()) {
                continue;
            }
            let Some(raw) = block.as_object().and_then(|b| b.get(country_code)) else {
                continue;
            };
            records.push(HistoricalRecord {
                date,
                week_label: label.clone(),
                category: name.clone(),
                country: country_code.to_string(),
                raw_value: raw.clone(),
            });
        }
    }

    records
}

fn group_records(
    records: Vec<HistoricalRecord>,
    extractor: fn(&Value) -> Option<f64>,
) -> BTreeMap<String, CategorySeries> {
    let mut grouped: BTreeMap<String, CategorySeries> = BTreeMap::new();

    for record in records {
        let Some(value) = extractor(&record.raw_value).filter(|v| v.is_finite()) else {
            continue;
        };
        grouped
            .entry(record.category.clone())
            .or_insert_with(|| CategorySeries {
                category: record.category.clone(),
                points: Vec::new(),
            })
            .points
            .push(SeriesPoint {
                date: record.date,
                week_label: record.week_label,
                value,
                raw: record.raw_value,
            });
    }

    for series in grouped.values_mut() {
        // sort_by_key is stable: same-date points keep input order
        series.points.sort_by_key(|p| p.date);
    }

    grouped
}

/// Series per category for one country, values as published.
pub fn build_series(
    snapshots: &[Snapshot],
    country_code: &str,
    category: Option<&str>,
) -> BTreeMap<String, CategorySeries> {
    group_records(
        flatten_records(snapshots, country_code, category),
        extract_time_value,
    )
}

/// Series per category for one country, values normalized to months.
pub fn build_month_series(
    snapshots: &[Snapshot],
    country_code: &str,
    category: Option<&str>,
) -> BTreeMap<String, CategorySeries> {
    group_records(
        flatten_records(snapshots, country_code, category),
        extract_months,
    )
}

/// The series of a single category (empty when nothing was extracted).
pub fn build_category_series(
    snapshots: &[Snapshot],
    country_code: &str,
    category: &str,
) -> CategorySeries {
    build_series(snapshots, country_code, Some(category))
        .remove(category)
        .unwrap_or_else(|| CategorySeries {
            category: category.to_string(),
            points: Vec::new(),
        })
}

fn mean(points: &[SeriesPoint]) -> f64 {
    points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64
}

/// Compare the mean of the last 4 points with the mean of the 4 before them.
pub fn calculate_trend(points: &[SeriesPoint]) -> TrendSummary {
    if points.len() < TREND_WINDOW * 2 {
        return TrendSummary::insufficient();
    }

    let recent = &points[points.len() - TREND_WINDOW..];
    let older = &points[points.len() - TREND_WINDOW * 2..points.len() - TREND_WINDOW];

    let recent_avg = mean(recent);
    let older_avg = mean(older);
    if older_avg == 0.0 || !older_avg.is_finite() {
        return TrendSummary::insufficient();
    }

    let change = ((recent_avg - older_avg) / older_avg * 100.0 * 100.0).round() / 100.0;
    if !change.is_finite() {
        return TrendSummary::insufficient();
    }
    let trend = if change > TREND_THRESHOLD {
        TrendDirection::Increasing
    } else if change < -TREND_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    TrendSummary { trend, change }
}

/// Latest, min, max and trend for a series.
pub fn summarize(series: &CategorySeries) -> SeriesSummary {
    let values = series.points.iter().map(|p| p.value);
    SeriesSummary {
        category: series.category.clone(),
        points: series.points.len(),
        latest: series.points.last().map(|p| p.value),
        min: values.clone().reduce(f64::min),
        max: values.reduce(f64::max),
        trend: calculate_trend(&series.points),
    }
}
