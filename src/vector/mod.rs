//! Embeddings and clustering over the word vector space.
//!
//! Embeddings are produced by an [`EmbeddingGenerator`]; the clustering
//! engine partitions the full population into `k` groups and ranks each
//! group's members by distance to its centroid.

mod clustering;
mod embedding;
mod types;

pub use clustering::{
    ClusterAssignment, ClusterMember, ClusteringError, DEFAULT_MAX_ITERATIONS, KMeansParams,
    KMeansResult, WordClusters, assign_to_nearest_centroid, cluster_words, cosine_similarity,
    euclidean_distance, kmeans_clustering,
};
#[cfg(test)]
pub use embedding::MockEmbeddingGenerator;
pub use embedding::{EmbeddingGenerator, FastEmbedGenerator, parse_embedding_model};
pub use types::{ClusterId, VECTOR_DIMENSION_384, VectorDimension};
