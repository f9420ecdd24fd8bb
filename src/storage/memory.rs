use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::{PayloadFilter, ScanRequest, VectorStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{PointId, ScanCursor, ScanPage, ScoredPoint, WordPayload, WordRecord};
use crate::vector::{VectorDimension, cosine_similarity};

const COLLECTION: &str = "memory";

#[derive(Debug, Clone)]
struct StoredPoint {
    id: PointId,
    vector: Vec<f32>,
    payload: WordPayload,
    // Cached JSON form for filter evaluation
    payload_json: Value,
}

#[derive(Debug, Default)]
struct State {
    dimension: Option<VectorDimension>,
    points: Vec<StoredPoint>,
}

/// In-process store with cosine search and insertion-order scans.
///
/// Clones share the same data. Cursors are positions in insertion order.
/// `Contains` conditions use case-sensitive substring matching.
#[derive(Clone, Debug, Default)]
pub struct MemoryVectorStore {
    state: Arc<RwLock<State>>,
}

impl MemoryVectorStore {
    /// A store without a collection; call `create_collection` first.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with an empty collection of the given dimension.
    pub fn with_collection(dimension: VectorDimension) -> Self {
        let store = Self::new();
        store.state.write().dimension = Some(dimension);
        store
    }

    fn dimension(state: &State) -> StoreResult<VectorDimension> {
        state
            .dimension
            .ok_or_else(|| StoreError::CollectionNotFound(COLLECTION.to_string()))
    }
}

fn parse_cursor(cursor: Option<&ScanCursor>) -> StoreResult<usize> {
    match cursor {
        None => Ok(0),
        Some(ScanCursor(raw)) => raw
            .parse()
            .map_err(|_| StoreError::InvalidFilter(format!("invalid scan cursor '{raw}'"))),
    }
}

impl VectorStore for MemoryVectorStore {
    fn collection_exists(&self) -> StoreResult<bool> {
        Ok(self.state.read().dimension.is_some())
    }

    fn create_collection(&self, dimension: VectorDimension) -> StoreResult<()> {
        let mut state = self.state.write();
        state.dimension = Some(dimension);
        state.points.clear();
        Ok(())
    }

    fn delete_collection(&self) -> StoreResult<()> {
        let mut state = self.state.write();
        state.dimension = None;
        state.points.clear();
        Ok(())
    }

    fn insert(&self, vector: Vec<f32>, payload: &WordPayload) -> StoreResult<PointId> {
        let mut state = self.state.write();
        Self::dimension(&state)?.validate_vector(&vector)?;

        let id = PointId::generate();
        state.points.push(StoredPoint {
            id: id.clone(),
            vector,
            payload: payload.clone(),
            payload_json: Value::Object(payload.to_map()),
        });
        Ok(id)
    }

    fn search(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> StoreResult<Vec<ScoredPoint>> {
        if let Some(filter) = filter {
            filter.validate()?;
        }
        let state = self.state.read();
        Self::dimension(&state)?.validate_vector(vector)?;

        let mut hits: Vec<ScoredPoint> = state
            .points
            .iter()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload_json)))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    fn scan(&self, request: &ScanRequest) -> StoreResult<ScanPage> {
        if let Some(filter) = &request.filter {
            filter.validate()?;
        }
        let start = parse_cursor(request.cursor.as_ref())?;
        let state = self.state.read();
        Self::dimension(&state)?;

        let mut matching = state
            .points
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, p)| {
                request
                    .filter
                    .as_ref()
                    .is_none_or(|f| f.matches(&p.payload_json))
            });

        let records = matching
            .by_ref()
            .take(request.limit)
            .map(|(_, p)| WordRecord {
                id: p.id.clone(),
                vector: request.with_vectors.then(|| p.vector.clone()),
                payload: p.payload.clone(),
            })
            .collect();

        let next_cursor = matching.next().map(|(idx, _)| ScanCursor(idx.to_string()));

        Ok(ScanPage {
            records,
            next_cursor,
        })
    }

    fn patch_payload(&self, id: &PointId, fields: &Map<String, Value>) -> StoreResult<()> {
        let mut state = self.state.write();
        Self::dimension(&state)?;

        let point = state
            .points
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StoreError::PointNotFound(id.to_string()))?;

        point.payload.apply_patch(fields);
        point.payload_json = Value::Object(point.payload.to_map());
        Ok(())
    }

    fn count(&self, filter: Option<&PayloadFilter>) -> StoreResult<usize> {
        let state = self.state.read();
        Self::dimension(&state)?;
        Ok(state
            .points
            .iter()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.payload_json)))
            .count())
    }
}
