//! Embedding generation for words and queries.
//!
//! The embedder is an opaque `text -> vector` function. The production
//! implementation wraps fastembed; tests inject deterministic generators
//! through the [`EmbeddingGenerator`] trait.

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::{EmbedError, EmbedResult};
use crate::vector::VectorDimension;

/// Trait for generating embeddings from text.
///
/// Implementations must be deterministic for a fixed model version and
/// safe to share across threads.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per input.
    fn generate_embeddings(&self, texts: &[&str]) -> EmbedResult<Vec<Vec<f32>>>;

    /// Get the dimension of embeddings produced by this generator.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Embed a single text.
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let mut vectors = self.generate_embeddings(&[text])?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() => Ok(vector),
            _ => Err(EmbedError::CountMismatch {
                expected: 1,
                actual: vectors.len() + 1,
            }),
        }
    }
}

/// fastembed-backed generator.
///
/// Defaults to `BAAI/bge-small-en-v1.5`, which produces 384-dimensional
/// normalized embeddings.
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: VectorDimension,
}

impl FastEmbedGenerator {
    /// Load (downloading on first use) the named model.
    ///
    /// # Errors
    /// Returns an error if the model name is unknown or the model fails to
    /// initialize or download.
    pub fn new(
        model_name: &str,
        cache_dir: Option<PathBuf>,
        show_progress: bool,
    ) -> EmbedResult<Self> {
        let (model, dim) = parse_embedding_model(model_name)?;

        let mut options = InitOptions::new(model).with_show_download_progress(show_progress);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model = TextEmbedding::try_new(options).map_err(|e| {
            EmbedError::ModelInit(format!(
                "{e}. Ensure you have internet connection for first-time model download"
            ))
        })?;

        tracing::debug!("loaded embedding model {model_name} ({dim} dimensions)");

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimension: VectorDimension::new(dim)
                .map_err(|e| EmbedError::ModelInit(e.to_string()))?,
        })
    }

    /// Name of the loaded model as configured.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> EmbedResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                EmbedError::Generation(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(text_strings, None)
            .map_err(|e| EmbedError::Generation(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }

        for embedding in &embeddings {
            if embedding.len() != self.dimension.get() {
                return Err(EmbedError::Generation(format!(
                    "expected {} dimensions, got {}",
                    self.dimension.get(),
                    embedding.len()
                )));
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}

/// Resolve a configured model name to a fastembed model and its dimension.
///
/// Accepts both the enum-style name (`BGESmallENV15`) and the Hugging Face
/// id (`BAAI/bge-small-en-v1.5`).
pub fn parse_embedding_model(name: &str) -> EmbedResult<(EmbeddingModel, usize)> {
    let resolved = match name {
        "BGESmallENV15" | "BAAI/bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
        "BGEBaseENV15" | "BAAI/bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
        "AllMiniLML6V2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            (EmbeddingModel::AllMiniLML6V2, 384)
        }
        "MultilingualE5Small" | "intfloat/multilingual-e5-small" => {
            (EmbeddingModel::MultilingualE5Small, 384)
        }
        other => return Err(EmbedError::UnknownModel(other.to_string())),
    };
    Ok(resolved)
}

/// Keyword-driven generator for unit tests.
///
/// Words about pets point along one axis and vehicles along another, so
/// clustering behaves predictably without a real model.
#[cfg(test)]
pub struct MockEmbeddingGenerator {
    dimension: VectorDimension,
}

#[cfg(test)]
impl Default for MockEmbeddingGenerator {
    fn default() -> Self {
        Self {
            dimension: VectorDimension::dimension_384(),
        }
    }
}

#[cfg(test)]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> EmbedResult<Vec<Vec<f32>>> {
        let dim = self.dimension.get();
        Ok(texts
            .iter()
            .map(|text| {
                let mut embedding = vec![0.01; dim];
                if ["cat", "dog", "kitten", "puppy", "pet"]
                    .iter()
                    .any(|k| text.contains(k))
                {
                    embedding[0] = 1.0;
                }
                if ["car", "truck", "bus", "vehicle"].iter().any(|k| text.contains(k)) {
                    embedding[1] = 1.0;
                }
                let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
                embedding.iter_mut().for_each(|v| *v /= magnitude);
                embedding
            })
            .collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}
