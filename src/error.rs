//! Error types for the word lookup and categorization system
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use std::path::PathBuf;
use thiserror::Error;

use crate::vector::ClusteringError;

/// Errors raised by a vector store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport level failure (connection refused, timeout, DNS)
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),

    #[error("Vector store returned HTTP {status} during {operation}: {body}")]
    Backend {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Collection '{0}' does not exist")]
    CollectionNotFound(String),

    #[error("Point '{0}' not found")]
    PointNotFound(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Malformed response from vector store: {0}")]
    MalformedResponse(String),
}

impl StoreError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> String {
        match self {
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
            Self::Backend { .. } => "STORE_BACKEND_ERROR",
            Self::CollectionNotFound(_) => "COLLECTION_NOT_FOUND",
            Self::PointNotFound(_) => "POINT_NOT_FOUND",
            Self::InvalidFilter(_) => "INVALID_FILTER",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::MalformedResponse(_) => "MALFORMED_RESPONSE",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Unavailable(_) | Self::Backend { .. } => vec![
                "Check that the vector store is running and reachable at the configured URL",
                "Run 'wordsense config' to inspect the active store settings",
            ],
            Self::CollectionNotFound(_) => vec!["Run 'wordsense setup' to create the collection"],
            Self::DimensionMismatch { .. } => vec![
                "The collection was created for a different embedding model",
                "Run 'wordsense setup --recreate' and re-import the words",
            ],
            _ => vec![],
        }
    }
}

/// Errors raised while turning text into a vector
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Unknown embedding model '{0}'")]
    UnknownModel(String),

    #[error("Failed to generate embedding: {0}")]
    Generation(String),

    #[error("Embedding model returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

/// Errors from a single title generation attempt.
///
/// The titler recovers from these internally with a fallback title; they
/// never reach callers of the categorization pipeline.
#[derive(Error, Debug)]
pub enum TitlingError {
    #[error("Title request failed: {0}")]
    Transport(String),

    #[error("Title service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Title service response could not be read: {0}")]
    MalformedResponse(String),

    #[error("Title service returned nothing usable")]
    EmptyTitle,

    #[error("Title generation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: String },
}

/// Requests that cannot be satisfied regardless of backend health
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one of query, category or meaning_keyword must be provided")]
    MissingSearchFilter,

    #[error("No words found in the vector store. Import words before categorizing")]
    EmptyPopulation,

    #[error("Invalid argument '{field}': {reason}")]
    InvalidArgument { field: &'static str, reason: String },
}

/// Errors from the combined-filter query entry point
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from inserting or searching words
#[derive(Error, Debug)]
pub enum WordError {
    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors that abort a categorization run
#[derive(Error, Debug)]
pub enum CategorizeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to fetch words for clustering: {0}")]
    Fetch(#[source] StoreError),

    #[error("Clustering failed: {0}")]
    Clustering(#[from] ClusteringError),

    #[error("Failed to write '{path}': {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read '{path}': {reason}")]
    Load { path: PathBuf, reason: String },
}

impl CategorizeError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> String {
        match self {
            Self::Validation(ValidationError::EmptyPopulation) => "EMPTY_POPULATION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Fetch(_) => "FETCH_ERROR",
            Self::Clustering(_) => "CLUSTERING_ERROR",
            Self::Persist { .. } => "PERSIST_ERROR",
            Self::Load { .. } => "LOAD_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Validation(ValidationError::EmptyPopulation) => vec![
                "Import words first with 'wordsense import <file>' or 'wordsense add'",
            ],
            Self::Fetch(_) => vec!["Check that the vector store is running and reachable"],
            Self::Clustering(_) => vec![
                "Use fewer clusters than stored words (--clusters)",
                "Make sure every stored vector comes from the same embedding model",
            ],
            Self::Persist { .. } => vec!["Check disk space and write permissions for the snapshot path"],
            Self::Load { .. } => vec!["Run 'wordsense categorize' to regenerate the snapshot"],
            Self::Validation(_) => vec![],
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for embedding operations
pub type EmbedResult<T> = Result<T, EmbedError>;

/// Result type alias for the combined-filter query
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type alias for categorization runs
pub type CategorizeResult<T> = Result<T, CategorizeError>;

/// Maps read-path failures to an empty result.
///
/// Serving paths prefer availability: a backend hiccup looks the same as
/// "nothing found". The swallowed error is logged so it is not lost.
pub trait OrEmpty<T> {
    /// Return the value, or `T::default()` after logging the error.
    fn or_empty(self, operation: &str) -> T;
}

impl<T, E> OrEmpty<T> for Result<T, E>
where
    T: Default,
    E: std::fmt::Display,
{
    fn or_empty(self, operation: &str) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("{operation} failed, returning empty result: {e}");
                T::default()
            }
        }
    }
}
