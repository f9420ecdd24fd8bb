//! Semantic word lookup over a vector store, with k-means categories
//! titled by a language model.

pub mod categorize;
pub mod config;
pub mod display;
pub mod error;
pub mod query;
#[cfg(feature = "http-server")]
pub mod server;
pub mod storage;
pub mod titling;
pub mod types;
pub mod vector;
pub mod words;

pub use categorize::{
    CategorizationPipeline, CategorizationReport, CategorizeOptions, CategorySnapshot,
    ClusterModel,
};
pub use config::Settings;
pub use error::{
    CategorizeError, CategorizeResult, EmbedError, OrEmpty, QueryError, StoreError, StoreResult,
    TitlingError, ValidationError, WordError,
};
pub use query::{AdvancedSearch, CategoryCount, CategoryPage, CategoryQueries, CategoryStats};
pub use storage::{MemoryVectorStore, PayloadFilter, QdrantStore, VectorStore, open_store};
pub use titling::{ClusterTitler, RetryPolicy, TitleGenerator};
pub use types::{PointId, SearchQuery, WordHit, WordItem, WordPayload, WordRecord};
pub use vector::{EmbeddingGenerator, FastEmbedGenerator, KMeansParams, VectorDimension};
pub use words::{AdvancedSearchQuery, ImportSummary, WordService};
