//! In-Canada services snapshots.
//!
//! Two document shapes are published:
//! - grouped: `{ "<group>": { "<service>": <time-value> }, "default-update": { "lastupdated": ... } }`
//! - flat list: `{ "data": [ { "service_name_en", "processing_time_en", "service_desc_en" } ] }`

use serde_json::{Map, Value};

use crate::types::{InCanadaServices, ServiceTime};

const UPDATE_BLOCK: &str = "default-update";
const LAST_UPDATED: &str = "lastupdated";

/// Parse either document shape. Unknown shapes give an empty result.
pub fn parse_in_canada_services(doc: &Value) -> InCanadaServices {
    match doc.get("data").and_then(Value::as_array) {
        Some(items) => parse_list_shape(items),
        None => match doc.as_object() {
            Some(map) => parse_grouped_shape(map),
            None => {
                log::warn!("In-Canada services document is not an object");
                InCanadaServices::default()
            }
        },
    }
}

fn parse_list_shape(items: &[Value]) -> InCanadaServices {
    let entries = items
        .iter()
        .filter_map(|item| {
            let service = item.get("service_name_en")?.as_str()?.trim();
            if service.is_empty() {
                return None;
            }
            Some(ServiceTime {
                group: None,
                service: service.to_string(),
                time: item.get("processing_time_en").cloned().unwrap_or(Value::Null),
                description: item
                    .get("service_desc_en")
                    .and_then(Value::as_str)
                    .map(|s| s.to_string()),
            })
        })
        .collect();

    InCanadaServices {
        entries,
        ..InCanadaServices::default()
    }
}

fn parse_grouped_shape(map: &Map<String, Value>) -> InCanadaServices {
    let mut result = InCanadaServices::default();

    for (group, block) in map {
        let Some(block) = block.as_object() else {
            continue;
        };
        if let Some(updated) = block.get(LAST_UPDATED).and_then(Value::as_str) {
            result.last_updated = Some(updated.to_string());
        }
        if group == UPDATE_BLOCK {
            continue;
        }
        for (service, time) in block {
            if service == LAST_UPDATED {
                continue;
            }
            result.entries.push(ServiceTime {
                group: Some(group.clone()),
                service: service.clone(),
                time: time.clone(),
                description: None,
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grouped_shape() {
        let doc = json!({
            "work": { "extension": "120 days", "open-work-permit": { "days": 95 } },
            "study": { "extension": "90 days" },
            "default-update": { "lastupdated": "2025-06-10" }
        });
        let parsed = parse_in_canada_services(&doc);

        assert_eq!(parsed.entries.len(), 3);
        assert_eq!(parsed.entries[0].group.as_deref(), Some("work"));
        assert_eq!(parsed.entries[0].service, "extension");
        assert_eq!(parsed.entries[1].time, json!({ "days": 95 }));
        assert_eq!(parsed.entries[2].group.as_deref(), Some("study"));
        assert_eq!(parsed.last_updated.as_deref(), Some("2025-06-10"));
    }

    #[test]
    fn test_list_shape() {
        let doc = json!({
            "data": [
                {
                    "service_name_en": "Citizenship grant",
                    "processing_time_en": "9 months",
                    "service_desc_en": "Adults 18 and older"
                },
                { "service_name_en": "  ", "processing_time_en": "1 day" },
                { "processing_time_en": "missing name" },
                { "service_name_en": "PR card renewal" }
            ]
        });
        let parsed = parse_in_canada_services(&doc);

        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].service, "Citizenship grant");
        assert_eq!(parsed.entries[0].time, json!("9 months"));
        assert_eq!(
            parsed.entries[0].description.as_deref(),
            Some("Adults 18 and older")
        );
        assert_eq!(parsed.entries[1].time, Value::Null);
        assert!(parsed.last_updated.is_none());
    }

    #[test]
    fn test_unknown_shape_is_empty() {
        assert!(parse_in_canada_services(&json!([1, 2])).entries.is_empty());
        assert!(parse_in_canada_services(&json!({ "a": 1 })).entries.is_empty());
    }
}
