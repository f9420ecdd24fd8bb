//! Word service: the process-wide handle on the store and the embedder.
//!
//! Built once at startup and shared (behind an `Arc`) by the CLI and the
//! HTTP server. Text-level operations embed their input and then delegate
//! to the store or to [`CategoryQueries`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::categorize::{Classification, ClusterModel};
use crate::error::{OrEmpty, StoreResult, ValidationError, WordError};
use crate::query::{AdvancedSearch, CategoryQueries};
use crate::storage::{VectorStore, ensure_collection, recreate_collection};
use crate::types::{PointId, SearchQuery, WordHit, WordItem};
use crate::vector::EmbeddingGenerator;

/// Words embedded per model call during bulk import.
const EMBED_CHUNK: usize = 64;

fn default_advanced_limit() -> usize {
    10
}

/// Text form of an advanced search, as received from callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedSearchQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub meaning_keyword: Option<String>,
    #[serde(default = "default_advanced_limit")]
    pub limit: usize,
}

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub failed: usize,
}

pub struct WordService {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingGenerator>,
    scan_batch_size: usize,
}

impl WordService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingGenerator>,
        scan_batch_size: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            scan_batch_size,
        }
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub fn embedder(&self) -> &dyn EmbeddingGenerator {
        self.embedder.as_ref()
    }

    pub fn queries(&self) -> CategoryQueries<'_> {
        CategoryQueries::new(self.store.as_ref(), self.scan_batch_size)
    }

    /// Create the collection sized for the embedder if it is missing.
    pub fn setup_collection(&self) -> StoreResult<bool> {
        ensure_collection(self.store.as_ref(), self.embedder.dimension())
    }

    /// Drop and recreate the collection. Destroys all stored words.
    pub fn recreate_collection(&self) -> StoreResult<()> {
        recreate_collection(self.store.as_ref(), self.embedder.dimension())
    }

    /// Embed and store one word.
    pub fn add_word(&self, item: WordItem) -> Result<PointId, WordError> {
        validate_item(&item)?;
        let vector = self.embedder.embed(&item.word)?;
        let word = item.word.clone();
        let id = self.store.insert(vector, &item.into_payload())?;
        tracing::debug!("inserted '{word}' as {id}");
        Ok(id)
    }

    /// Insert many words, logging and counting failures instead of stopping.
    pub fn add_words(&self, items: Vec<WordItem>) -> ImportSummary {
        let mut summary = ImportSummary::default();

        let (valid, invalid): (Vec<WordItem>, Vec<WordItem>) =
            items.into_iter().partition(|item| validate_item(item).is_ok());
        for item in &invalid {
            tracing::warn!("skipping invalid word entry {:?}", item.word);
        }
        summary.failed += invalid.len();

        for chunk in valid.chunks(EMBED_CHUNK) {
            let texts: Vec<&str> = chunk.iter().map(|item| item.word.as_str()).collect();
            let vectors = match self.embedder.generate_embeddings(&texts) {
                Ok(vectors) if vectors.len() == chunk.len() => vectors,
                Ok(vectors) => {
                    tracing::warn!(
                        "embedder returned {} vectors for {} words; skipping chunk",
                        vectors.len(),
                        chunk.len()
                    );
                    summary.failed += chunk.len();
                    continue;
                }
                Err(e) => {
                    tracing::warn!("failed to embed {} words: {e}", chunk.len());
                    summary.failed += chunk.len();
                    continue;
                }
            };

            for (item, vector) in chunk.iter().zip(vectors) {
                match self.store.insert(vector, &item.clone().into_payload()) {
                    Ok(_) => summary.inserted += 1,
                    Err(e) => {
                        tracing::warn!("failed to insert '{}': {e}", item.word);
                        summary.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            "import finished: {} inserted, {} failed",
            summary.inserted,
            summary.failed
        );
        summary
    }

    pub fn try_search_word(&self, query: &SearchQuery) -> Result<Vec<WordHit>, WordError> {
        let vector = self.embedder.embed(&query.word)?;
        Ok(self
            .store
            .search(&vector, query.limit, None)?
            .into_iter()
            .map(WordHit::from)
            .collect())
    }

    /// Nearest words to `query.word`; empty on any failure.
    pub fn search_word(&self, query: &SearchQuery) -> Vec<WordHit> {
        self.try_search_word(query).or_empty("search_word")
    }

    /// Similarity search for `word` within one category; empty on failure.
    pub fn search_in_category(&self, word: &str, category: &str, limit: usize) -> Vec<WordHit> {
        match self.embedder.embed(word) {
            Ok(vector) => self.queries().search_in_category(&vector, category, limit),
            Err(e) => {
                tracing::warn!("search_in_category failed, returning empty result: {e}");
                Vec::new()
            }
        }
    }

    /// Advanced search from text. Rejects requests without any filter;
    /// other failures yield an empty list.
    pub fn advanced_search(
        &self,
        request: &AdvancedSearchQuery,
    ) -> Result<Vec<WordHit>, ValidationError> {
        let mut search = AdvancedSearch::new(request.limit);
        search.category = request.category.clone();
        search.meaning_keyword = request.meaning_keyword.clone();

        if let Some(text) = request.query.as_deref().filter(|q| !q.trim().is_empty()) {
            match self.embedder.embed(text) {
                Ok(vector) => search.query_vector = Some(vector),
                Err(e) => {
                    tracing::warn!("advanced_search failed, returning empty result: {e}");
                    return Ok(Vec::new());
                }
            }
        }

        self.queries().advanced_search(&search)
    }

    /// Nearest category in a saved cluster model for a new word.
    pub fn classify(
        &self,
        word: &str,
        model: &ClusterModel,
    ) -> Result<Option<Classification>, WordError> {
        let vector = self.embedder.embed(word)?;
        Ok(model.classify(&vector))
    }
}

fn validate_item(item: &WordItem) -> Result<(), ValidationError> {
    if item.word.trim().is_empty() {
        return Err(ValidationError::InvalidArgument {
            field: "word",
            reason: "word cannot be empty".to_string(),
        });
    }
    Ok(())
}
