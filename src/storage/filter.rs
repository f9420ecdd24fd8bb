//! Payload filters shared by every store backend.
//!
//! A filter is a conjunction of field conditions. Backends either evaluate
//! it locally with [`PayloadFilter::matches`] or translate it into their
//! native query language (see [`PayloadFilter::to_qdrant`]).

use serde_json::{Value, json};

use crate::error::StoreError;

/// A single predicate on a payload field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// Field equals the value exactly.
    Equals { field: String, value: Value },
    /// String field contains the text as a substring.
    Contains { field: String, text: String },
}

/// Conjunction of conditions; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFilter {
    must: Vec<FieldCondition>,
}

impl PayloadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must.push(FieldCondition::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.must.push(FieldCondition::Contains {
            field: field.into(),
            text: text.into(),
        });
        self
    }

    /// Shorthand for an exact `category` match.
    pub fn category(name: &str) -> Self {
        Self::new().equals("category", name)
    }

    /// Shorthand for an exact `word` match.
    pub fn word(word: &str) -> Self {
        Self::new().equals("word", word)
    }

    pub fn conditions(&self) -> &[FieldCondition] {
        &self.must
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Reject conditions no backend can evaluate.
    pub fn validate(&self) -> Result<(), StoreError> {
        for condition in &self.must {
            match condition {
                FieldCondition::Equals { field, .. } | FieldCondition::Contains { field, .. }
                    if field.trim().is_empty() =>
                {
                    return Err(StoreError::InvalidFilter(
                        "field name cannot be empty".to_string(),
                    ));
                }
                FieldCondition::Contains { text, field } if text.is_empty() => {
                    return Err(StoreError::InvalidFilter(format!(
                        "substring for '{field}' cannot be empty"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Evaluate the filter against a payload object.
    pub fn matches(&self, payload: &Value) -> bool {
        self.must.iter().all(|condition| match condition {
            FieldCondition::Equals { field, value } => payload.get(field) == Some(value),
            FieldCondition::Contains { field, text } => payload
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.contains(text.as_str())),
        })
    }

    /// Qdrant filter JSON: `{"must": [{"key": .., "match": {..}}]}`.
    pub fn to_qdrant(&self) -> Value {
        let must: Vec<Value> = self
            .must
            .iter()
            .map(|condition| match condition {
                FieldCondition::Equals { field, value } => {
                    json!({"key": field, "match": {"value": value}})
                }
                FieldCondition::Contains { field, text } => {
                    json!({"key": field, "match": {"text": text}})
                }
            })
            .collect();
        json!({ "must": must })
    }
}
