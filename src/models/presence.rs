use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::driver::GeoPoint;

/// Position shapes found in the realtime `drivers/` tree. Nested is tried
/// first, so it wins whenever both of its coordinates are numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PositionShape {
    Nested { location: GeoPoint },
    Flat { latitude: f64, longitude: f64 },
}

impl PositionShape {
    fn into_point(self) -> GeoPoint {
        match self {
            PositionShape::Nested { location } => location,
            PositionShape::Flat {
                latitude,
                longitude,
            } => GeoPoint {
                latitude,
                longitude,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub is_online: bool,
    pub position: Option<GeoPoint>,
}

impl PresenceEntry {
    pub fn from_value(value: &Value) -> Self {
        let position = PositionShape::deserialize(value)
            .ok()
            .map(PositionShape::into_point)
            .filter(|p| p.latitude.is_finite() && p.longitude.is_finite());

        Self {
            is_online: coerce_online(value.get("isOnline")),
            position,
        }
    }
}

/// `true` and any casing of `"true"` count as online; everything else does not.
pub fn coerce_online(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(raw)) => raw.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub type PresenceSnapshot = HashMap<String, PresenceEntry>;

/// Resolves a full `drivers/` tree into canonical entries keyed by driver id.
pub fn ingest_presence_tree(tree: &Value) -> PresenceSnapshot {
    match tree {
        Value::Object(entries) => entries
            .iter()
            .map(|(id, entry)| (id.clone(), PresenceEntry::from_value(entry)))
            .collect(),
        _ => PresenceSnapshot::new(),
    }
}

pub type BookedSet = HashSet<String>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedDriversResponse {
    #[serde(default)]
    pub driver_ids: Vec<Value>,
}

impl BookedDriversResponse {
    pub fn into_set(self) -> BookedSet {
        self.driver_ids
            .into_iter()
            .filter_map(|id| match id {
                Value::String(id) => Some(id),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{coerce_online, ingest_presence_tree, BookedDriversResponse, PresenceEntry};
    use crate::models::driver::GeoPoint;

    #[test]
    fn online_flag_coercion() {
        for value in [json!(true), json!("true"), json!("TRUE"), json!("True")] {
            assert!(coerce_online(Some(&value)), "{value} should be online");
        }
        for value in [json!(false), json!("false"), json!(0), json!(1), json!("yes")] {
            assert!(!coerce_online(Some(&value)), "{value} should be offline");
        }
        assert!(!coerce_online(None));
    }

    #[test]
    fn nested_location_wins_over_flat_fields() {
        let entry = PresenceEntry::from_value(&json!({
            "isOnline": true,
            "location": { "latitude": 10.0, "longitude": 20.0 },
            "latitude": 1.0,
            "longitude": 2.0
        }));

        assert_eq!(
            entry.position,
            Some(GeoPoint {
                latitude: 10.0,
                longitude: 20.0
            })
        );
    }

    #[test]
    fn flat_fields_used_when_nested_is_not_numeric() {
        let entry = PresenceEntry::from_value(&json!({
            "isOnline": "false",
            "location": { "latitude": "n/a", "longitude": 20.0 },
            "latitude": 14.5,
            "longitude": 121
        }));

        assert!(!entry.is_online);
        assert_eq!(
            entry.position,
            Some(GeoPoint {
                latitude: 14.5,
                longitude: 121.0
            })
        );
    }

    #[test]
    fn entry_without_position_has_none() {
        let entry = PresenceEntry::from_value(&json!({ "isOnline": true, "latitude": 3.0 }));
        assert!(entry.is_online);
        assert!(entry.position.is_none());
    }

    #[test]
    fn non_object_tree_is_empty_snapshot() {
        assert!(ingest_presence_tree(&json!(null)).is_empty());

        let snapshot = ingest_presence_tree(&json!({ "a": { "isOnline": true } }));
        assert!(snapshot["a"].is_online);
    }

    #[test]
    fn booked_ids_are_compared_as_strings() {
        let response: BookedDriversResponse =
            serde_json::from_value(json!({ "driverIds": ["a", 42, null] })).unwrap();
        let set = response.into_set();

        assert!(set.contains("a"));
        assert!(set.contains("42"));
        assert_eq!(set.len(), 2);
    }
}
