//! K-means clustering of word embeddings.
//!
//! This module provides a pure Rust implementation of K-means clustering
//! used to partition the whole word population into semantic groups. It
//! uses Euclidean distance and K-means++ for centroid initialization.
//!
//! # Algorithm Details
//! - Distance metric: Euclidean
//! - Initialization: K-means++ from a seeded RNG, best of `n_init` restarts
//! - Small populations (<= `batch_size`): full Lloyd iterations
//! - Large populations: mini-batch updates with per-centroid learning rates
//! - Max iterations: 100 by default
//! - Convergence tolerance: 1e-4 mean centroid shift
//!
//! # Performance Characteristics
//! - O(n * k * d * iterations) for Lloyd, O(b * k * d * iterations) for mini-batch
//! - O(k * d) space for centroids
//! - Assignment over the full population runs on the rayon pool

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

use crate::vector::types::ClusterId;

/// Default maximum number of iterations for K-means clustering.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Convergence tolerance for centroid updates.
const CONVERGENCE_TOLERANCE: f32 = 1e-4;

/// Epsilon for floating-point comparisons.
const EPSILON: f32 = 1e-10;

/// Parameters of one clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    /// Number of clusters to produce.
    pub k: usize,

    /// Upper bound on Lloyd or mini-batch iterations per restart.
    pub max_iterations: usize,

    /// Populations larger than this are fitted with mini-batches of this size.
    pub batch_size: usize,

    /// Number of K-means++ restarts; the lowest inertia wins.
    pub n_init: usize,

    /// Seed for initialization and batch sampling.
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 50,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            batch_size: 1000,
            n_init: 3,
            seed: 42,
        }
    }
}

impl KMeansParams {
    /// Default parameters with a specific cluster count.
    #[must_use]
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }
}

/// Result of K-means clustering operation.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster centroids, each a vector of the same dimension as input vectors.
    pub centroids: Vec<Vec<f32>>,

    /// Cluster assignment for each input vector.
    pub assignments: Vec<ClusterId>,

    /// Number of iterations of the winning restart.
    pub iterations: usize,

    /// Sum of squared distances from each vector to its centroid.
    pub inertia: f32,
}

/// Errors that can occur during clustering operations.
#[derive(Error, Debug)]
pub enum ClusteringError {
    #[error(
        "Empty vector set provided for clustering\nSuggestion: Ensure words are imported before clustering"
    )]
    EmptyVectorSet,

    #[error(
        "Invalid cluster count: {k} for {available} vectors\nSuggestion: Use k between 1 and the number of vectors"
    )]
    InvalidClusterCount { k: usize, available: usize },

    #[error(
        "Dimension mismatch in vectors\nSuggestion: Ensure all vectors come from the same embedding model"
    )]
    DimensionMismatch,

    #[error("Got {words} words but {vectors} vectors")]
    LengthMismatch { words: usize, vectors: usize },

    #[error(
        "Failed to initialize centroids\nSuggestion: The population has fewer distinct vectors than clusters"
    )]
    InitializationFailed,
}

/// One member of a cluster with its distance to the cluster centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterMember {
    pub word: String,
    pub distance: f32,
}

/// Members of one cluster, closest to the centroid first.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    pub cluster_id: ClusterId,
    pub members: Vec<ClusterMember>,
}

impl ClusterAssignment {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The `n` most representative words.
    #[must_use]
    pub fn top_words(&self, n: usize) -> Vec<String> {
        self.members.iter().take(n).map(|m| m.word.clone()).collect()
    }

    /// Every member word in representativeness order.
    #[must_use]
    pub fn all_words(&self) -> Vec<String> {
        self.top_words(self.members.len())
    }
}

/// Clusters of a word population together with the fitted centroids.
#[derive(Debug, Clone)]
pub struct WordClusters {
    /// Non-empty clusters ordered by cluster id.
    pub clusters: Vec<ClusterAssignment>,

    /// All `k` centroids, indexed by cluster id.
    pub centroids: Vec<Vec<f32>>,

    pub iterations: usize,
}

/// Performs K-means clustering on a set of vectors.
///
/// # Arguments
/// * `vectors` - Input vectors to cluster (must be non-empty and same dimension)
/// * `params` - Cluster count and fitting parameters
///
/// # Algorithm
/// 1. Initialize centroids using K-means++ method
/// 2. Fit with Lloyd iterations or mini-batches depending on population size
/// 3. Repeat for `n_init` restarts and keep the lowest inertia
/// 4. Label every vector with its nearest final centroid
#[must_use = "clustering results should be used or the computation is wasted"]
pub fn kmeans_clustering(
    vectors: &[Vec<f32>],
    params: &KMeansParams,
) -> Result<KMeansResult, ClusteringError> {
    if vectors.is_empty() {
        return Err(ClusteringError::EmptyVectorSet);
    }

    if params.k == 0 || params.k > vectors.len() {
        return Err(ClusteringError::InvalidClusterCount {
            k: params.k,
            available: vectors.len(),
        });
    }

    let dimension = vectors[0].len();
    if dimension == 0 || vectors.iter().any(|v| v.len() != dimension) {
        return Err(ClusteringError::DimensionMismatch);
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansResult> = None;

    for restart in 0..params.n_init.max(1) {
        let result = fit_once(vectors, params, &mut rng)?;
        tracing::debug!(
            "k-means restart {restart}: inertia {:.4} after {} iterations",
            result.inertia,
            result.iterations
        );
        if best.as_ref().is_none_or(|b| result.inertia < b.inertia) {
            best = Some(result);
        }
    }

    best.ok_or(ClusteringError::InitializationFailed)
}

/// Clusters words by their vectors and ranks each cluster's members.
///
/// Every input word appears in exactly one returned cluster. Within a
/// cluster, members are sorted by ascending distance to the centroid.
pub fn cluster_words(
    words: &[String],
    vectors: &[Vec<f32>],
    params: &KMeansParams,
) -> Result<WordClusters, ClusteringError> {
    if words.len() != vectors.len() {
        return Err(ClusteringError::LengthMismatch {
            words: words.len(),
            vectors: vectors.len(),
        });
    }

    let result = kmeans_clustering(vectors, params)?;

    let mut grouped: Vec<Vec<ClusterMember>> = vec![Vec::new(); result.centroids.len()];
    for ((word, vector), cluster) in words.iter().zip(vectors).zip(&result.assignments) {
        let distance = euclidean_distance(vector, &result.centroids[cluster.index()]);
        grouped[cluster.index()].push(ClusterMember {
            word: word.clone(),
            distance,
        });
    }

    let clusters = grouped
        .into_iter()
        .enumerate()
        .filter(|(_, members)| !members.is_empty())
        .map(|(idx, mut members)| {
            members.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            ClusterAssignment {
                cluster_id: ClusterId::new(idx as u32),
                members,
            }
        })
        .collect();

    Ok(WordClusters {
        clusters,
        centroids: result.centroids,
        iterations: result.iterations,
    })
}

/// Assigns a vector to the nearest centroid by Euclidean distance.
///
/// Returns the centroid's id and the distance to it.
pub fn assign_to_nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> (ClusterId, f32) {
    let mut best_distance = f32::INFINITY;
    let mut best_cluster = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(vector, centroid);
        if distance < best_distance {
            best_distance = distance;
            best_cluster = i;
        }
    }

    (ClusterId::new(best_cluster as u32), best_distance.sqrt())
}

/// Euclidean distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_distance(a, b).sqrt()
}

/// Computes cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]; zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn fit_once(
    vectors: &[Vec<f32>],
    params: &KMeansParams,
    rng: &mut StdRng,
) -> Result<KMeansResult, ClusteringError> {
    let mut centroids = initialize_centroids_kmeans_plus_plus(vectors, params.k, rng)?;

    let iterations = if vectors.len() > params.batch_size.max(1) {
        fit_mini_batch(vectors, &mut centroids, params, rng)
    } else {
        fit_lloyd(vectors, &mut centroids, params.max_iterations, rng)
    };

    if iterations >= params.max_iterations {
        tracing::warn!(
            "K-means did not fully converge after {} iterations",
            params.max_iterations
        );
    }

    let (assignments, inertia) = assign_all(vectors, &centroids);

    Ok(KMeansResult {
        centroids,
        assignments,
        iterations,
        inertia,
    })
}

/// Full-batch Lloyd iterations. Returns the number of iterations run.
fn fit_lloyd(
    vectors: &[Vec<f32>],
    centroids: &mut Vec<Vec<f32>>,
    max_iterations: usize,
    rng: &mut StdRng,
) -> usize {
    let mut assignments: Vec<ClusterId> = Vec::new();
    let mut iterations = 0;

    loop {
        iterations += 1;

        let (new_assignments, _) = assign_all(vectors, centroids);
        let converged = new_assignments == assignments;
        assignments = new_assignments;

        if converged || iterations >= max_iterations {
            break;
        }

        let new_centroids = update_centroids(vectors, &assignments, centroids.len(), rng);
        let movement = calculate_centroid_movement(centroids, &new_centroids);
        *centroids = new_centroids;

        if movement < CONVERGENCE_TOLERANCE {
            break;
        }
    }

    iterations
}

/// Mini-batch updates: each sampled vector pulls its centroid towards it
/// with a rate of 1 / (times that centroid has been updated).
fn fit_mini_batch(
    vectors: &[Vec<f32>],
    centroids: &mut [Vec<f32>],
    params: &KMeansParams,
    rng: &mut StdRng,
) -> usize {
    let batch_size = params.batch_size.clamp(1, vectors.len());
    let mut counts = vec![0usize; centroids.len()];

    for iteration in 1..=params.max_iterations {
        let batch = rand::seq::index::sample(rng, vectors.len(), batch_size).into_vec();
        let previous = centroids.to_vec();

        let labels: Vec<ClusterId> = batch
            .par_iter()
            .map(|&i| assign_to_nearest_centroid(&vectors[i], &previous).0)
            .collect();

        for (&i, cluster) in batch.iter().zip(labels) {
            let c = cluster.index();
            counts[c] += 1;
            let eta = 1.0 / counts[c] as f32;
            for (value, x) in centroids[c].iter_mut().zip(&vectors[i]) {
                *value += eta * (x - *value);
            }
        }

        if calculate_centroid_movement(&previous, centroids) < CONVERGENCE_TOLERANCE {
            return iteration;
        }
    }

    params.max_iterations
}

fn assign_all(vectors: &[Vec<f32>], centroids: &[Vec<f32>]) -> (Vec<ClusterId>, f32) {
    let nearest: Vec<(ClusterId, f32)> = vectors
        .par_iter()
        .map(|vector| assign_to_nearest_centroid(vector, centroids))
        .collect();

    let inertia = nearest.iter().map(|(_, d)| d * d).sum();
    (nearest.into_iter().map(|(c, _)| c).collect(), inertia)
}

/// Updates centroids as the mean of their assigned vectors.
fn update_centroids(
    vectors: &[Vec<f32>],
    assignments: &[ClusterId],
    k: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f32>> {
    let dimension = vectors[0].len();
    let mut new_centroids = vec![vec![0.0; dimension]; k];
    let mut cluster_sizes = vec![0usize; k];

    for (vector, cluster_id) in vectors.iter().zip(assignments.iter()) {
        let idx = cluster_id.index();
        for (sum, &value) in new_centroids[idx].iter_mut().zip(vector.iter()) {
            *sum += value;
        }
        cluster_sizes[idx] += 1;
    }

    for (centroid, &size) in new_centroids.iter_mut().zip(cluster_sizes.iter()) {
        if size == 0 {
            // Empty cluster: reseed from a random member of the population
            let random_idx = rng.random_range(0..vectors.len());
            *centroid = vectors[random_idx].clone();
        } else {
            for value in centroid.iter_mut() {
                *value /= size as f32;
            }
        }
    }

    new_centroids
}

/// Initializes centroids using the K-means++ algorithm.
///
/// K-means++ selects initial centroids that are far apart, leading to
/// better convergence properties than random initialization.
fn initialize_centroids_kmeans_plus_plus(
    vectors: &[Vec<f32>],
    k: usize,
    rng: &mut StdRng,
) -> Result<Vec<Vec<f32>>, ClusteringError> {
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);

    let first_idx = rng.random_range(0..vectors.len());
    centroids.push(vectors[first_idx].clone());

    // Squared distance of every vector to its nearest chosen centroid
    let mut distances: Vec<f32> = vectors
        .iter()
        .map(|v| squared_distance(v, &centroids[0]))
        .collect();

    for _ in 1..k {
        let total_distance: f32 = distances.iter().sum();
        if total_distance < EPSILON {
            // All points coincide with existing centroids
            break;
        }

        let target = rng.random::<f32>() * total_distance;
        let mut cumulative = 0.0;
        let mut chosen = vectors.len() - 1;
        for (i, &distance) in distances.iter().enumerate() {
            cumulative += distance;
            if cumulative >= target && distance > 0.0 {
                chosen = i;
                break;
            }
        }

        let centroid = vectors[chosen].clone();
        for (d, v) in distances.iter_mut().zip(vectors) {
            *d = d.min(squared_distance(v, &centroid));
        }
        centroids.push(centroid);
    }

    if centroids.len() != k {
        return Err(ClusteringError::InitializationFailed);
    }

    Ok(centroids)
}

/// Mean Euclidean shift of centroids between iterations.
fn calculate_centroid_movement(old: &[Vec<f32>], new: &[Vec<f32>]) -> f32 {
    old.iter()
        .zip(new.iter())
        .map(|(old_c, new_c)| euclidean_distance(old_c, new_c))
        .sum::<f32>()
        / old.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn axis_clusters() -> Vec<Vec<f32>> {
        vec![
            // Cluster 1: mostly x-axis
            vec![1.0, 0.1, 0.0],
            vec![0.9, 0.2, 0.1],
            vec![1.1, 0.0, 0.2],
            // Cluster 2: mostly y-axis
            vec![0.1, 1.0, 0.0],
            vec![0.2, 0.9, 0.1],
            vec![0.0, 1.1, 0.2],
            // Cluster 3: mostly z-axis
            vec![0.0, 0.1, 1.0],
            vec![0.1, 0.2, 0.9],
            vec![0.2, 0.0, 1.1],
        ]
    }

    /// Three tight groups of `per_group` points around far-apart centers.
    fn separated_groups(per_group: usize) -> Vec<Vec<f32>> {
        let centers = [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]];
        let mut vectors = Vec::new();
        for center in centers {
            for i in 0..per_group {
                let jitter = (i % 5) as f32 * 0.02;
                vectors.push(vec![center[0] + jitter, center[1] - jitter, center[2] + jitter]);
            }
        }
        vectors
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);

        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);

        let a = vec![1.0, 2.0, 3.0];
        let b = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < f32::EPSILON);
        assert_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_assign_to_nearest_centroid() {
        let centroids = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];

        let (cluster, _) = assign_to_nearest_centroid(&[0.9, 0.1, 0.0], &centroids);
        assert_eq!(cluster.get(), 0);

        let (cluster, _) = assign_to_nearest_centroid(&[0.1, 0.9, 0.1], &centroids);
        assert_eq!(cluster.get(), 1);

        let (cluster, distance) = assign_to_nearest_centroid(&[0.0, 0.0, 1.0], &centroids);
        assert_eq!(cluster.get(), 2);
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn test_kmeans_clustering_basic() {
        let vectors = axis_clusters();
        let result = kmeans_clustering(&vectors, &KMeansParams::with_k(3)).unwrap();

        assert_eq!(result.centroids.len(), 3);
        assert_eq!(result.assignments.len(), 9);
        assert!(result.iterations <= DEFAULT_MAX_ITERATIONS);
        assert!(result.assignments.iter().all(|c| c.index() < 3));

        for group in result.assignments.chunks(3) {
            assert!(group.iter().all(|&c| c == group[0]));
        }
        let distinct: HashSet<_> = result.assignments.iter().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_kmeans_is_deterministic_for_a_seed() {
        let vectors = axis_clusters();
        let params = KMeansParams::with_k(3);
        let first = kmeans_clustering(&vectors, &params).unwrap();
        let second = kmeans_clustering(&vectors, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mini_batch_path_separates_groups() {
        let vectors = separated_groups(20);
        let params = KMeansParams {
            k: 3,
            batch_size: 8,
            ..KMeansParams::default()
        };

        let result = kmeans_clustering(&vectors, &params).unwrap();
        for group in result.assignments.chunks(20) {
            assert!(group.iter().all(|&c| c == group[0]));
        }
        let distinct: HashSet<_> = result.assignments.iter().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_kmeans_edge_cases() {
        let vectors: Vec<Vec<f32>> = vec![];
        assert!(matches!(
            kmeans_clustering(&vectors, &KMeansParams::with_k(1)),
            Err(ClusteringError::EmptyVectorSet)
        ));

        let vectors = vec![vec![1.0, 2.0]];
        assert!(matches!(
            kmeans_clustering(&vectors, &KMeansParams::with_k(0)),
            Err(ClusteringError::InvalidClusterCount { k: 0, .. })
        ));

        let vectors = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(matches!(
            kmeans_clustering(&vectors, &KMeansParams::with_k(3)),
            Err(ClusteringError::InvalidClusterCount { k: 3, available: 2 })
        ));

        let vectors = vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0]];
        assert!(matches!(
            kmeans_clustering(&vectors, &KMeansParams::with_k(1)),
            Err(ClusteringError::DimensionMismatch)
        ));
    }

    #[test]
    fn test_single_cluster() {
        let vectors = vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ];

        let result = kmeans_clustering(&vectors, &KMeansParams::with_k(1)).unwrap();

        assert_eq!(result.centroids.len(), 1);
        assert!(result.assignments.iter().all(|c| c.get() == 0));
        // Centroid is the mean of all vectors
        assert!((result.centroids[0][0] - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_cluster_words_covers_every_word_once() {
        let vectors = axis_clusters();
        let words: Vec<String> = (0..vectors.len()).map(|i| format!("w{i}")).collect();

        let clustered = cluster_words(&words, &vectors, &KMeansParams::with_k(3)).unwrap();

        let mut seen: Vec<String> = clustered
            .clusters
            .iter()
            .flat_map(|c| c.all_words())
            .collect();
        seen.sort();
        let mut expected = words.clone();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_cluster_members_sorted_by_distance() {
        let vectors = separated_groups(10);
        let words: Vec<String> = (0..vectors.len()).map(|i| format!("w{i}")).collect();

        let clustered = cluster_words(&words, &vectors, &KMeansParams::with_k(3)).unwrap();

        for cluster in &clustered.clusters {
            assert!(
                cluster
                    .members
                    .windows(2)
                    .all(|pair| pair[0].distance <= pair[1].distance)
            );
        }
        assert_eq!(clustered.centroids.len(), 3);
    }

    #[test]
    fn test_cluster_words_length_mismatch() {
        let words = vec!["a".to_string()];
        let vectors = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            cluster_words(&words, &vectors, &KMeansParams::with_k(1)),
            Err(ClusteringError::LengthMismatch {
                words: 1,
                vectors: 2
            })
        ));
    }
}
