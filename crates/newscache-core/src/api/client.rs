//! HTTP implementation of `RemoteSource`.
//!
//! Collections are fetched with `GET {base_url}/{key}`. The body may be a bare
//! JSON array of items or an envelope object holding the array under the
//! collection key (`{"success": true, "count": 2, "news": [...]}`), `items`
//! or `data`.

use std::time::Duration;

use reqwest::{header, Client};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{RemoteError, RemoteSource};
use crate::geo::Coordinates;
use crate::models::ContentItem;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Envelope fields checked, after the collection key, for the item array.
const ENVELOPE_FIELDS: [&str; 2] = ["items", "data"];

/// Flat coordinate field pairs some backends send instead of `coordinates`.
const FLAT_COORDINATE_FIELDS: [(&str, &str); 3] = [
    ("latitude", "longitude"),
    ("latitud", "longitud"),
    ("lat", "lon"),
];

/// Remote source backed by a JSON HTTP API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpRemoteSource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new source with the given bearer token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    async fn get_collection(&self, key: &str) -> Result<Vec<ContentItem>, RemoteError> {
        let url = self.collection_url(key);
        debug!(url = %url, "Fetching collection");

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::from_status(status, &body));
        }

        let body: Value = response.json().await?;
        decode_collection(key, body)
    }
}

impl RemoteSource for HttpRemoteSource {
    async fn fetch(&self, key: &str) -> Result<Vec<ContentItem>, RemoteError> {
        self.get_collection(key).await
    }
}

/// Pull the item array out of a response body and decode each item.
pub(crate) fn decode_collection(key: &str, body: Value) -> Result<Vec<ContentItem>, RemoteError> {
    let array = match body {
        Value::Array(items) => items,
        Value::Object(mut envelope) => take_item_array(&mut envelope, key).ok_or_else(|| {
            RemoteError::InvalidResponse(format!("No item array found for '{}'", key))
        })?,
        other => {
            return Err(RemoteError::InvalidResponse(format!(
                "Expected an array or object, got {}",
                other
            )))
        }
    };

    array
        .into_iter()
        .map(|raw| {
            let raw = lift_flat_coordinates(raw);
            serde_json::from_value::<ContentItem>(raw)
                .map_err(|e| RemoteError::InvalidResponse(format!("Bad item in '{}': {}", key, e)))
        })
        .collect()
}

fn take_item_array(envelope: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    if let Some(Value::Array(items)) = envelope.remove(key) {
        return Some(items);
    }
    for field in ENVELOPE_FIELDS {
        if let Some(Value::Array(items)) = envelope.remove(field) {
            return Some(items);
        }
    }
    None
}

/// Move flat latitude/longitude fields into a `coordinates` object so the
/// item decodes with a location.
fn lift_flat_coordinates(raw: Value) -> Value {
    let Value::Object(mut fields) = raw else {
        return raw;
    };
    if fields.contains_key("coordinates") {
        return Value::Object(fields);
    }

    for (lat_field, lon_field) in FLAT_COORDINATE_FIELDS {
        let lat = fields.get(lat_field).and_then(Value::as_f64);
        let lon = fields.get(lon_field).and_then(Value::as_f64);
        if let (Some(latitude), Some(longitude)) = (lat, lon) {
            fields.remove(lat_field);
            fields.remove(lon_field);
            insert_coordinates(&mut fields, Coordinates { latitude, longitude });
            break;
        } else if lat.is_some() != lon.is_some() {
            warn!(lat_field, lon_field, "Item has only half of a coordinate pair");
        }
    }
    Value::Object(fields)
}

fn insert_coordinates(fields: &mut Map<String, Value>, coordinates: Coordinates) {
    let mut point = Map::new();
    point.insert("latitude".to_string(), coordinates.latitude.into());
    point.insert("longitude".to_string(), coordinates.longitude.into());
    fields.insert("coordinates".to_string(), Value::Object(point));
}
