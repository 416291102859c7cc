use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geo::{format_distance, Coordinates};

/// A news article or event as seen by the cache.
///
/// Only `id` and `coordinates` are interpreted here; every other field the
/// remote source sends is carried untouched in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Set by ranking only, never persisted.
    #[serde(skip)]
    pub distance_km: Option<f64>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ContentItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            coordinates: None,
            distance_km: None,
            payload: Map::new(),
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(name.to_string(), value.into());
        self
    }

    /// Best-effort title for list display.
    pub fn title(&self) -> Option<&str> {
        ["title", "titulo", "name", "nombre"]
            .iter()
            .find_map(|field| self.payload.get(*field).and_then(Value::as_str))
    }

    /// Distance formatted for display, if ranking attached one.
    pub fn distance_display(&self) -> Option<String> {
        self.distance_km.map(format_distance)
    }
}
