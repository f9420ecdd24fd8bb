//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tempfile::TempDir;

use wordsense::error::{EmbedResult, StoreError, StoreResult};
use wordsense::storage::{MemoryVectorStore, PayloadFilter, ScanRequest, VectorStore};
use wordsense::types::{PointId, ScanPage, ScoredPoint, WordPayload};
use wordsense::vector::{EmbeddingGenerator, VectorDimension};
use wordsense::{CategorizeOptions, WordItem, WordService};

/// Deterministic embedder: each keyword group owns one axis of a
/// 384-dimensional space.
pub struct KeywordEmbedder;

const GROUPS: &[&[&str]] = &[
    &["cat", "dog", "kitten", "puppy", "pet", "feline", "canine"],
    &["car", "truck", "bus", "train", "vehicle", "motor"],
    &["apple", "bread", "cheese", "food", "fruit"],
];

impl EmbeddingGenerator for KeywordEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> EmbedResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn dimension(&self) -> VectorDimension {
        VectorDimension::dimension_384()
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.01_f32; 384];
    let lower = text.to_lowercase();
    for (axis, group) in GROUPS.iter().enumerate() {
        if group.iter().any(|k| lower.contains(k)) {
            vector[axis] += 1.0;
        }
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    vector.iter().map(|x| x / norm).collect()
}

pub fn memory_store() -> MemoryVectorStore {
    MemoryVectorStore::with_collection(VectorDimension::dimension_384())
}

/// Insert `(word, meaning)` pairs with keyword vectors.
pub fn seed(store: &dyn VectorStore, words: &[(&str, &str)]) -> Vec<PointId> {
    words
        .iter()
        .map(|(word, meaning)| {
            let payload = WordPayload {
                word: word.to_string(),
                meaning: meaning.to_string(),
                ..WordPayload::default()
            };
            store
                .insert(keyword_vector(word), &payload)
                .expect("insert into memory store")
        })
        .collect()
}

/// Insert a word already labelled with `category`.
pub fn seed_labelled(store: &dyn VectorStore, word: &str, meaning: &str, category: &str) {
    let payload = WordPayload {
        word: word.to_string(),
        meaning: meaning.to_string(),
        category: Some(category.to_string()),
        cluster_id: Some(0),
        ..WordPayload::default()
    };
    store
        .insert(keyword_vector(word), &payload)
        .expect("insert into memory store");
}

pub fn word_service(store: MemoryVectorStore) -> WordService {
    WordService::new(Arc::new(store), Arc::new(KeywordEmbedder), 2)
}

pub fn item(word: &str, meaning: &str) -> WordItem {
    WordItem {
        word: word.to_string(),
        meaning: meaning.to_string(),
        synonyms: vec![],
        antonyms: vec![],
        examples: vec![],
    }
}

pub fn options_in(dir: &Path, k: usize) -> CategorizeOptions {
    CategorizeOptions {
        num_clusters: k,
        snapshot_path: dir.join("word_categories.json"),
        model_path: Some(dir.join("cluster_model.json")),
        scan_batch_size: 2,
        ..CategorizeOptions::default()
    }
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Category of the first record named `word`.
pub fn category_of(store: &dyn VectorStore, word: &str) -> Option<String> {
    let request = ScanRequest::new(1).with_filter(PayloadFilter::word(word));
    store
        .scan(&request)
        .expect("scan memory store")
        .records
        .into_iter()
        .next()
        .and_then(|r| r.payload.category)
}

/// Every operation fails as if the backend were down.
pub struct FailingStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

impl VectorStore for FailingStore {
    fn collection_exists(&self) -> StoreResult<bool> {
        down()
    }

    fn create_collection(&self, _dimension: VectorDimension) -> StoreResult<()> {
        down()
    }

    fn delete_collection(&self) -> StoreResult<()> {
        down()
    }

    fn insert(&self, _vector: Vec<f32>, _payload: &WordPayload) -> StoreResult<PointId> {
        down()
    }

    fn search(
        &self,
        _vector: &[f32],
        _limit: usize,
        _filter: Option<&PayloadFilter>,
    ) -> StoreResult<Vec<ScoredPoint>> {
        down()
    }

    fn scan(&self, _request: &ScanRequest) -> StoreResult<ScanPage> {
        down()
    }

    fn patch_payload(&self, _id: &PointId, _fields: &Map<String, Value>) -> StoreResult<()> {
        down()
    }

    fn count(&self, _filter: Option<&PayloadFilter>) -> StoreResult<usize> {
        down()
    }
}
