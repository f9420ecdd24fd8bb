//! Records, payloads and request/response shapes shared across the crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque identifier of a stored point, assigned at insertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(String);

impl PointId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh random UUID v4 id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata stored next to each word vector.
///
/// `category` and `cluster_id` stay absent until the first categorization
/// run reaches this record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordPayload {
    pub word: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<u32>,
}

impl WordPayload {
    /// Parse a raw backend payload.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Serialize into the JSON object sent to the backend.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Apply a partial update, leaving unmentioned fields untouched.
    ///
    /// Unknown keys and values of the wrong type are ignored.
    pub fn apply_patch(&mut self, fields: &Map<String, Value>) {
        let mut merged = self.to_map();
        for (key, value) in fields {
            merged.insert(key.clone(), value.clone());
        }
        if let Ok(updated) = serde_json::from_value(Value::Object(merged)) {
            *self = updated;
        }
    }
}

/// One stored point. `vector` is only populated when explicitly requested.
#[derive(Debug, Clone, PartialEq)]
pub struct WordRecord {
    pub id: PointId,
    pub vector: Option<Vec<f32>>,
    pub payload: WordPayload,
}

/// A similarity search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    pub payload: WordPayload,
}

/// Continuation token returned by a paginated scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanCursor(pub String);

/// One page of a scan. `next_cursor == None` marks the end of data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub records: Vec<WordRecord>,
    pub next_cursor: Option<ScanCursor>,
}

/// A word submitted for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordItem {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl WordItem {
    pub fn into_payload(self) -> WordPayload {
        WordPayload {
            word: self.word,
            meaning: self.meaning,
            synonyms: self.synonyms,
            antonyms: self.antonyms,
            examples: self.examples,
            category: None,
            cluster_id: None,
        }
    }
}

fn default_search_limit() -> usize {
    3
}

/// A similarity lookup by word text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub word: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

/// A word returned from a read path; `score` is absent for unranked scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordHit {
    pub id: PointId,
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub meaning: String,
    pub synonyms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<ScoredPoint> for WordHit {
    fn from(point: ScoredPoint) -> Self {
        Self {
            id: point.id,
            word: point.payload.word,
            score: Some(point.score),
            meaning: point.payload.meaning,
            synonyms: point.payload.synonyms,
            category: point.payload.category,
        }
    }
}

impl From<WordRecord> for WordHit {
    fn from(record: WordRecord) -> Self {
        Self {
            id: record.id,
            word: record.payload.word,
            score: None,
            meaning: record.payload.meaning,
            synonyms: record.payload.synonyms,
            category: record.payload.category,
        }
    }
}
