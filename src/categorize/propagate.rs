//! Writing category labels back onto stored words.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

use super::snapshot::{CategoryEntry, CategorySnapshot};
use crate::error::{CategorizeResult, StoreError, StoreResult};
use crate::storage::{VectorStore, find_by_word};

/// Outcome of one propagation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagationSummary {
    pub categories_processed: usize,
    pub total_updated: usize,
    /// Words that were missing from the store or failed to update.
    pub total_failed: usize,
}

/// Patches `category` and `cluster_id` onto every word of a snapshot.
///
/// Words are matched by exact `word` equality and only the first match is
/// updated. Each word is an independent patch, so a failure is counted and
/// logged without stopping the pass. Re-running with the same snapshot
/// leaves the store unchanged.
pub struct Propagator<'a> {
    store: &'a dyn VectorStore,
    parallel: bool,
    progress: Option<ProgressBar>,
}

impl<'a> Propagator<'a> {
    pub fn new(store: &'a dyn VectorStore) -> Self {
        Self {
            store,
            parallel: true,
            progress: None,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Tick this bar once per processed word.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn run(&self, snapshot: &CategorySnapshot) -> PropagationSummary {
        let updated = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let mut categories_processed = 0;

        for entry in snapshot.entries() {
            tracing::debug!(
                "propagating '{}' to {} words",
                entry.title,
                entry.all_words.len()
            );
            let fields = patch_fields(entry);

            let apply = |word: &String| {
                match self.update_word(word, &fields) {
                    Ok(()) => {
                        updated.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::warn!("failed to update '{word}': {e}");
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                if let Some(progress) = &self.progress {
                    progress.inc(1);
                }
            };

            if self.parallel {
                entry.all_words.par_iter().for_each(apply);
            } else {
                entry.all_words.iter().for_each(apply);
            }
            categories_processed += 1;
        }

        let summary = PropagationSummary {
            categories_processed,
            total_updated: updated.into_inner(),
            total_failed: failed.into_inner(),
        };
        tracing::info!(
            "propagation finished: {} categories, {} updated, {} failed",
            summary.categories_processed,
            summary.total_updated,
            summary.total_failed
        );
        summary
    }

    fn update_word(&self, word: &str, fields: &Map<String, Value>) -> StoreResult<()> {
        let record = find_by_word(self.store, word)?
            .ok_or_else(|| StoreError::PointNotFound(format!("no record for word '{word}'")))?;
        self.store.patch_payload(&record.id, fields)
    }
}

fn patch_fields(entry: &CategoryEntry) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("category".to_string(), Value::from(entry.title.clone()));
    fields.insert("cluster_id".to_string(), Value::from(entry.cluster_id));
    fields
}

/// Re-run propagation from a snapshot file written by an earlier run.
pub fn propagate_snapshot(
    store: &dyn VectorStore,
    path: &Path,
    parallel: bool,
) -> CategorizeResult<PropagationSummary> {
    let snapshot = CategorySnapshot::load(path)?;
    tracing::info!(
        "loaded {} categories from {}",
        snapshot.len(),
        path.display()
    );
    Ok(Propagator::new(store).parallel(parallel).run(&snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryVectorStore, PayloadFilter, ScanRequest};
    use crate::types::WordPayload;
    use crate::vector::VectorDimension;

    fn entry(id: u32, title: &str, words: &[&str]) -> CategoryEntry {
        let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        CategoryEntry {
            cluster_id: id,
            title: title.to_string(),
            representative_words: words.clone(),
            total_words: words.len(),
            sample_words: words.clone(),
            all_words: words,
        }
    }

    fn seeded_store(words: &[&str]) -> MemoryVectorStore {
        let store = MemoryVectorStore::with_collection(VectorDimension::new(2).unwrap());
        for word in words {
            let payload = WordPayload {
                word: word.to_string(),
                ..Default::default()
            };
            store.insert(vec![1.0, 0.0], &payload).unwrap();
        }
        store
    }

    #[test]
    fn test_missing_words_count_as_failures() {
        let store = seeded_store(&["cat", "dog"]);
        let mut snapshot = CategorySnapshot::new();
        snapshot.insert(entry(0, "Pets", &["cat", "dog", "ferret"]));

        let summary = Propagator::new(&store).run(&snapshot);
        assert_eq!(
            summary,
            PropagationSummary {
                categories_processed: 1,
                total_updated: 2,
                total_failed: 1,
            }
        );
        assert_eq!(
            store.count(Some(&PayloadFilter::category("Pets"))).unwrap(),
            2
        );
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let words = ["a", "b", "c", "d", "e", "f"];
        let mut snapshot = CategorySnapshot::new();
        snapshot.insert(entry(0, "First", &words[..3]));
        snapshot.insert(entry(1, "Second", &words[3..]));

        let sequential = seeded_store(&words);
        let parallel = seeded_store(&words);
        let a = Propagator::new(&sequential).parallel(false).run(&snapshot);
        let b = Propagator::new(&parallel).parallel(true).run(&snapshot);
        assert_eq!(a, b);
        assert_eq!(a.total_updated, 6);

        let record = find_by_word(&parallel, "e").unwrap().unwrap();
        assert_eq!(record.payload.category.as_deref(), Some("Second"));
        assert_eq!(record.payload.cluster_id, Some(1));
    }

    #[test]
    fn test_duplicate_words_update_first_match_only() {
        let store = seeded_store(&["bank", "bank"]);
        let mut snapshot = CategorySnapshot::new();
        snapshot.insert(entry(0, "Finance", &["bank"]));

        Propagator::new(&store).run(&snapshot);

        let page = store.scan(&ScanRequest::new(10)).unwrap();
        assert_eq!(page.records[0].payload.category.as_deref(), Some("Finance"));
        assert_eq!(page.records[1].payload.category, None);
    }
}
