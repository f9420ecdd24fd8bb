//! Vector store boundary.
//!
//! [`VectorStore`] is the narrow interface the rest of the crate uses to
//! talk to the vector database: point insertion, similarity search,
//! paginated scans, and partial payload updates. Two backends implement
//! it: [`QdrantStore`] over the Qdrant REST API and [`MemoryVectorStore`]
//! for tests and local experiments.

mod filter;
mod memory;
mod qdrant;

pub use filter::{FieldCondition, PayloadFilter};
pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::{StoreBackend, StoreSettings};
use crate::error::StoreResult;
use crate::types::{PointId, ScanCursor, ScanPage, ScoredPoint, WordPayload, WordRecord};
use crate::vector::VectorDimension;

/// Parameters of one scan page request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub filter: Option<PayloadFilter>,
    pub limit: usize,
    pub cursor: Option<ScanCursor>,
    pub with_vectors: bool,
}

impl ScanRequest {
    pub fn new(limit: usize) -> Self {
        Self {
            filter: None,
            limit,
            cursor: None,
            with_vectors: false,
        }
    }

    pub fn with_filter(mut self, filter: PayloadFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_vectors(mut self) -> Self {
        self.with_vectors = true;
        self
    }

    pub fn starting_at(mut self, cursor: Option<ScanCursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Operations consumed from the vector database.
///
/// Every method operates on the single collection the store was opened for.
/// Implementations report backend failures as `StoreError`; whether a
/// caller aborts, continues, or degrades to an empty result is decided at
/// the call site.
pub trait VectorStore: Send + Sync {
    fn collection_exists(&self) -> StoreResult<bool>;

    fn create_collection(&self, dimension: VectorDimension) -> StoreResult<()>;

    fn delete_collection(&self) -> StoreResult<()>;

    /// Store a vector with its payload under a freshly generated id.
    fn insert(&self, vector: Vec<f32>, payload: &WordPayload) -> StoreResult<PointId>;

    /// Up to `limit` nearest neighbours, best first.
    fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> StoreResult<Vec<ScoredPoint>>;

    /// One page of a full or filtered enumeration.
    fn scan(&self, request: &ScanRequest) -> StoreResult<ScanPage>;

    /// Merge `fields` into the payload of one point without touching its
    /// vector. Applying the same patch twice yields the same state.
    fn patch_payload(&self, id: &PointId, fields: &Map<String, Value>) -> StoreResult<()>;

    /// Number of points matching the filter.
    fn count(&self, filter: Option<&PayloadFilter>) -> StoreResult<usize>;
}

/// Open the configured backend.
pub fn open_store(settings: &StoreSettings) -> StoreResult<Arc<dyn VectorStore>> {
    match settings.backend {
        StoreBackend::Qdrant => Ok(Arc::new(QdrantStore::new(settings)?)),
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost when the process exits");
            Ok(Arc::new(MemoryVectorStore::new()))
        }
    }
}

/// Create the collection unless it already exists. Returns `true` if it
/// was created.
pub fn ensure_collection(store: &dyn VectorStore, dimension: VectorDimension) -> StoreResult<bool> {
    if store.collection_exists()? {
        tracing::debug!("collection already exists");
        return Ok(false);
    }
    store.create_collection(dimension)?;
    tracing::info!("created collection ({} dimensions)", dimension.get());
    Ok(true)
}

/// Drop the collection if present and create it empty.
pub fn recreate_collection(store: &dyn VectorStore, dimension: VectorDimension) -> StoreResult<()> {
    if store.collection_exists()? {
        store.delete_collection()?;
        tracing::info!("deleted existing collection");
    }
    store.create_collection(dimension)
}

/// First record whose `word` equals `word` exactly.
pub fn find_by_word(store: &dyn VectorStore, word: &str) -> StoreResult<Option<WordRecord>> {
    let request = ScanRequest::new(1).with_filter(PayloadFilter::word(word));
    Ok(store.scan(&request)?.records.into_iter().next())
}

/// Lazily pages through a scan until the backend reports no further cursor.
///
/// Only one page is held in memory at a time. Iteration ends after the
/// first error.
pub struct ScanPages<'a> {
    store: &'a dyn VectorStore,
    request: ScanRequest,
    finished: bool,
}

impl<'a> ScanPages<'a> {
    pub fn new(store: &'a dyn VectorStore, request: ScanRequest) -> Self {
        Self {
            store,
            request,
            finished: false,
        }
    }
}

impl Iterator for ScanPages<'_> {
    type Item = StoreResult<Vec<WordRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.store.scan(&self.request) {
            Ok(page) => {
                match page.next_cursor {
                    Some(cursor) if !page.records.is_empty() => self.request.cursor = Some(cursor),
                    _ => self.finished = true,
                }
                Some(Ok(page.records))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
