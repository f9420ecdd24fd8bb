//! Blocking Qdrant REST client.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::{Map, Value, json};

use super::{PayloadFilter, ScanRequest, VectorStore};
use crate::config::StoreSettings;
use crate::error::{StoreError, StoreResult};
use crate::types::{PointId, ScanCursor, ScanPage, ScoredPoint, WordPayload, WordRecord};
use crate::vector::VectorDimension;

/// Payload fields indexed on collection creation: keyword indexes for
/// exact matches, a full-text index for substring filters on `meaning`.
const PAYLOAD_INDEXES: &[(&str, &str)] = &[
    ("word", "keyword"),
    ("category", "keyword"),
    ("meaning", "text"),
];

/// [`VectorStore`] backed by one Qdrant collection.
#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
    collection: String,
    distance: String,
}

impl QdrantStore {
    pub fn new(settings: &StoreSettings) -> StoreResult<Self> {
        let url = settings.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(StoreError::Unavailable(format!(
                "store url must be an http(s) URL, got '{url}'"
            )));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = settings.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let value = HeaderValue::from_str(key.trim())
                .map_err(|e| StoreError::Unavailable(format!("invalid Qdrant API key: {e}")))?;
            headers.insert("api-key", value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
            distance: settings.distance.clone(),
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{suffix}", self.base_url, self.collection)
    }

    /// Send a request and return the `result` member of the response body.
    fn call(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        body: Option<&Value>,
    ) -> StoreResult<Value> {
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                StoreError::Unavailable(format!("{operation} timed out: {e}"))
            } else {
                StoreError::Unavailable(format!("{operation}: {e}"))
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionNotFound(self.collection.clone()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(StoreError::Backend {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: Value = response
            .json()
            .map_err(|e| StoreError::MalformedResponse(format!("{operation}: {e}")))?;
        Ok(parsed.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    fn create_payload_indexes(&self) {
        for (field, schema) in PAYLOAD_INDEXES {
            let body = json!({"field_name": field, "field_schema": schema});
            let request = self.client.put(self.collection_url("/index?wait=true"));
            if let Err(e) = self.call("create_index", request, Some(&body)) {
                tracing::warn!("failed to create payload index on '{field}': {e}");
            }
        }
    }
}

/// Point ids may be UUID strings or unsigned integers.
fn id_to_json(id: &PointId) -> Value {
    match id.as_str().parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(id.as_str()),
    }
}

fn id_from_json(value: &Value) -> Option<PointId> {
    match value {
        Value::String(s) => Some(PointId::new(s.clone())),
        Value::Number(n) => Some(PointId::new(n.to_string())),
        _ => None,
    }
}

fn parse_payload(point: &Value) -> Option<WordPayload> {
    let raw = point.get("payload")?.clone();
    match WordPayload::from_value(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!("skipping point with malformed payload: {e}");
            None
        }
    }
}

fn parse_vector(point: &Value) -> Option<Vec<f32>> {
    point
        .get("vector")?
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn parse_record(point: &Value, with_vector: bool) -> Option<WordRecord> {
    let id = id_from_json(point.get("id")?)?;
    let payload = parse_payload(point)?;
    let vector = if with_vector {
        let vector = parse_vector(point);
        if vector.is_none() {
            tracing::warn!("point {id} returned without a usable vector");
        }
        vector
    } else {
        None
    };
    Some(WordRecord {
        id,
        vector,
        payload,
    })
}

impl VectorStore for QdrantStore {
    fn collection_exists(&self) -> StoreResult<bool> {
        let request = self.client.get(self.collection_url(""));
        match self.call("get_collection", request, None) {
            Ok(_) => Ok(true),
            Err(StoreError::CollectionNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_collection(&self, dimension: VectorDimension) -> StoreResult<()> {
        let body = json!({
            "vectors": {"size": dimension.get(), "distance": self.distance}
        });
        let request = self.client.put(self.collection_url(""));
        self.call("create_collection", request, Some(&body))?;
        self.create_payload_indexes();
        Ok(())
    }

    fn delete_collection(&self) -> StoreResult<()> {
        let request = self.client.delete(self.collection_url(""));
        self.call("delete_collection", request, None).map(|_| ())
    }

    fn insert(&self, vector: Vec<f32>, payload: &WordPayload) -> StoreResult<PointId> {
        let id = PointId::generate();
        let body = json!({
            "points": [{
                "id": id_to_json(&id),
                "vector": vector,
                "payload": payload.to_map(),
            }]
        });
        let request = self.client.put(self.collection_url("/points?wait=true"));
        self.call("upsert", request, Some(&body))?;
        Ok(id)
    }

    fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> StoreResult<Vec<ScoredPoint>> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = filter {
            filter.validate()?;
            body["filter"] = filter.to_qdrant();
        }

        let request = self.client.post(self.collection_url("/points/search"));
        let result = self.call("search", request, Some(&body))?;
        let points = result
            .as_array()
            .ok_or_else(|| StoreError::MalformedResponse("search result is not a list".into()))?;

        Ok(points
            .iter()
            .filter_map(|point| {
                let id = id_from_json(point.get("id")?)?;
                let score = point.get("score")?.as_f64()? as f32;
                let payload = parse_payload(point)?;
                Some(ScoredPoint { id, score, payload })
            })
            .collect())
    }

    fn scan(&self, request: &ScanRequest) -> StoreResult<ScanPage> {
        let mut body = json!({
            "limit": request.limit,
            "with_payload": true,
            "with_vector": request.with_vectors,
        });
        if let Some(filter) = &request.filter {
            filter.validate()?;
            body["filter"] = filter.to_qdrant();
        }
        if let Some(ScanCursor(raw)) = &request.cursor {
            let offset: Value = serde_json::from_str(raw)
                .map_err(|_| StoreError::InvalidFilter(format!("invalid scan cursor '{raw}'")))?;
            body["offset"] = offset;
        }

        let http = self.client.post(self.collection_url("/points/scroll"));
        let result = self.call("scroll", http, Some(&body))?;

        let points = result
            .get("points")
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::MalformedResponse("scroll result has no points".into()))?;

        let records = points
            .iter()
            .filter_map(|point| parse_record(point, request.with_vectors))
            .collect();

        let next_cursor = result
            .get("next_page_offset")
            .filter(|v| !v.is_null())
            .map(|v| ScanCursor(v.to_string()));

        Ok(ScanPage {
            records,
            next_cursor,
        })
    }

    fn patch_payload(&self, id: &PointId, fields: &Map<String, Value>) -> StoreResult<()> {
        let body = json!({
            "payload": fields,
            "points": [id_to_json(id)],
        });
        let request = self
            .client
            .post(self.collection_url("/points/payload?wait=true"));
        self.call("set_payload", request, Some(&body)).map(|_| ())
    }

    fn count(&self, filter: Option<&PayloadFilter>) -> StoreResult<usize> {
        let mut body = json!({"exact": true});
        if let Some(filter) = filter {
            filter.validate()?;
            body["filter"] = filter.to_qdrant();
        }
        let request = self.client.post(self.collection_url("/points/count"));
        let result = self.call("count", request, Some(&body))?;
        result
            .get("count")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| StoreError::MalformedResponse("count result has no count".into()))
    }
}
