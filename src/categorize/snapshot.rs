//! Persisted artifacts of a categorization run.
//!
//! The category snapshot is pretty-printed JSON keyed by title so that
//! successive runs can be diffed. Both files are replaced atomically.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CategorizeError, CategorizeResult};
use crate::vector::{ClusterAssignment, ClusterId, assign_to_nearest_centroid};

/// One titled cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub cluster_id: u32,
    pub title: String,
    pub representative_words: Vec<String>,
    pub total_words: usize,
    pub sample_words: Vec<String>,
    pub all_words: Vec<String>,
}

impl CategoryEntry {
    /// Build an entry from a ranked cluster.
    pub fn from_cluster(
        cluster: &ClusterAssignment,
        title: String,
        representative_count: usize,
        sample_count: usize,
    ) -> Self {
        Self {
            cluster_id: cluster.cluster_id.get(),
            title,
            representative_words: cluster.top_words(representative_count),
            total_words: cluster.len(),
            sample_words: cluster.top_words(sample_count),
            all_words: cluster.all_words(),
        }
    }
}

/// Title -> entry mapping for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorySnapshot {
    categories: BTreeMap<String, CategoryEntry>,
}

impl CategorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry under its title. A previous entry with the same
    /// title is replaced and returned.
    pub fn insert(&mut self, entry: CategoryEntry) -> Option<CategoryEntry> {
        let replaced = self.categories.insert(entry.title.clone(), entry);
        if let Some(previous) = &replaced {
            tracing::warn!(
                "title '{}' produced twice; cluster {} replaces cluster {} in the snapshot",
                previous.title,
                self.categories[&previous.title].cluster_id,
                previous.cluster_id
            );
        }
        replaced
    }

    pub fn get(&self, title: &str) -> Option<&CategoryEntry> {
        self.categories.get(title)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Sum of `total_words` across entries.
    pub fn total_words(&self) -> usize {
        self.categories.values().map(|e| e.total_words).sum()
    }

    /// Entries ordered by descending size, then title.
    pub fn by_size(&self) -> Vec<&CategoryEntry> {
        let mut entries: Vec<&CategoryEntry> = self.categories.values().collect();
        entries.sort_by(|a, b| {
            b.total_words
                .cmp(&a.total_words)
                .then_with(|| a.title.cmp(&b.title))
        });
        entries
    }

    pub fn save(&self, path: &Path) -> CategorizeResult<()> {
        write_json_atomic(path, self)
    }

    pub fn load(path: &Path) -> CategorizeResult<Self> {
        read_json(path)
    }
}

/// Fitted centroids and the title assigned to each cluster, for
/// classifying words that arrive after a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub centroids: Vec<Vec<f32>>,
    pub titles: BTreeMap<u32, String>,
}

/// Result of classifying a vector against a [`ClusterModel`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub cluster_id: ClusterId,
    pub category: Option<String>,
    pub distance: f32,
}

impl ClusterModel {
    pub fn new(centroids: Vec<Vec<f32>>, snapshot: &CategorySnapshot) -> Self {
        let titles = snapshot
            .entries()
            .map(|entry| (entry.cluster_id, entry.title.clone()))
            .collect();
        Self { centroids, titles }
    }

    /// Nearest centroid for `vector`. `None` when the model is empty or
    /// the dimension does not match.
    pub fn classify(&self, vector: &[f32]) -> Option<Classification> {
        let dimension = self.centroids.first()?.len();
        if vector.len() != dimension {
            tracing::warn!(
                "cannot classify a {}-dimensional vector with a {dimension}-dimensional model",
                vector.len()
            );
            return None;
        }

        let (cluster_id, distance) = assign_to_nearest_centroid(vector, &self.centroids);
        Some(Classification {
            cluster_id,
            category: self.titles.get(&cluster_id.get()).cloned(),
            distance,
        })
    }

    pub fn save(&self, path: &Path) -> CategorizeResult<()> {
        write_json_atomic(path, self)
    }

    pub fn load(path: &Path) -> CategorizeResult<Self> {
        read_json(path)
    }
}

/// Write pretty JSON to a temporary sibling file and rename it into place.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> CategorizeResult<()> {
    let persist_error = |source: std::io::Error| CategorizeError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(persist_error)?;

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| persist_error(std::io::Error::other(e)))?;

    let mut file = tempfile::NamedTempFile::new_in(&parent).map_err(persist_error)?;
    file.write_all(json.as_bytes()).map_err(persist_error)?;
    file.write_all(b"\n").map_err(persist_error)?;
    file.persist(path).map_err(|e| persist_error(e.error))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CategorizeResult<T> {
    let load_error = |reason: String| CategorizeError::Load {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))
}
