//! Categorization pipeline.
//!
//! An offline batch job that runs five stages in order:
//!
//! 1. **Fetch** every `(word, vector)` pair from the store. An empty store
//!    aborts the run.
//! 2. **Cluster** the population into `num_clusters` groups.
//! 3. **Title** each cluster. Titling never fails; exhausted retries fall
//!    back to a synthetic title.
//! 4. **Persist** the category snapshot (and the cluster model). A failed
//!    snapshot write aborts before any record is touched.
//! 5. **Propagate** titles back onto the stored words. Per-word failures are
//!    counted, not fatal.
//!
//! Stages never roll back earlier ones. Only one run should execute at a
//! time; concurrent runs race on the snapshot file and on payload patches.

mod propagate;
mod snapshot;

pub use propagate::{PropagationSummary, Propagator, propagate_snapshot};
pub use snapshot::{CategoryEntry, CategorySnapshot, Classification, ClusterModel};

use std::path::PathBuf;

use serde::Serialize;

use crate::config::CategorizeSettings;
use crate::display::progress::{create_progress_bar, create_spinner};
use crate::error::{CategorizeError, CategorizeResult, ValidationError};
use crate::storage::{ScanPages, ScanRequest, VectorStore};
use crate::titling::ClusterTitler;
use crate::vector::{KMeansParams, WordClusters, cluster_words};

/// Stages of a categorization run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Fetch,
    Cluster,
    Title,
    Persist,
    Propagate,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Cluster => "cluster",
            Self::Title => "title",
            Self::Persist => "persist",
            Self::Propagate => "propagate",
        };
        f.write_str(name)
    }
}

/// Every stored word with its vector, in scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    pub words: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

impl Population {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Page through the whole store collecting words and vectors.
///
/// Records returned without a vector are skipped with a warning.
pub fn fetch_population(
    store: &dyn VectorStore,
    scan_batch_size: usize,
) -> CategorizeResult<Population> {
    let request = ScanRequest::new(scan_batch_size.max(1)).with_vectors();
    let mut population = Population::default();

    for page in ScanPages::new(store, request) {
        for record in page.map_err(CategorizeError::Fetch)? {
            match record.vector {
                Some(vector) => {
                    population.words.push(record.payload.word);
                    population.vectors.push(vector);
                }
                None => tracing::warn!(
                    "skipping '{}' ({}): no vector returned",
                    record.payload.word,
                    record.id
                ),
            }
        }
        tracing::debug!("fetched {} words so far", population.len());
    }

    if population.is_empty() {
        return Err(ValidationError::EmptyPopulation.into());
    }
    Ok(population)
}

/// Knobs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorizeOptions {
    pub num_clusters: usize,
    /// Representative words handed to the titler.
    pub top_n: usize,
    pub representative_count: usize,
    pub sample_count: usize,
    pub max_iterations: usize,
    pub batch_size: usize,
    pub n_init: usize,
    pub seed: u64,
    pub scan_batch_size: usize,
    pub snapshot_path: PathBuf,
    /// Where to save the fitted centroids; `None` skips it.
    pub model_path: Option<PathBuf>,
    pub parallel_propagation: bool,
}

impl Default for CategorizeOptions {
    fn default() -> Self {
        Self::from_settings(&CategorizeSettings::default(), 1000)
    }
}

impl CategorizeOptions {
    pub fn from_settings(settings: &CategorizeSettings, scan_batch_size: usize) -> Self {
        Self {
            num_clusters: settings.num_clusters,
            top_n: settings.top_n,
            representative_count: settings.representative_count,
            sample_count: settings.sample_count,
            max_iterations: settings.max_iterations,
            batch_size: settings.batch_size,
            n_init: settings.n_init,
            seed: settings.seed,
            scan_batch_size,
            snapshot_path: settings.snapshot_path.clone(),
            model_path: Some(settings.model_path.clone()),
            parallel_propagation: settings.parallel_propagation,
        }
    }

    pub fn kmeans_params(&self) -> KMeansParams {
        KMeansParams {
            k: self.num_clusters,
            max_iterations: self.max_iterations,
            batch_size: self.batch_size,
            n_init: self.n_init,
            seed: self.seed,
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizationReport {
    pub total_words: usize,
    pub clusters: usize,
    pub snapshot_path: PathBuf,
    pub snapshot: CategorySnapshot,
    pub propagation: PropagationSummary,
}

/// Drives a categorization run against one store.
pub struct CategorizationPipeline<'a> {
    store: &'a dyn VectorStore,
    titler: ClusterTitler,
    options: CategorizeOptions,
    show_progress: bool,
}

impl<'a> CategorizationPipeline<'a> {
    pub fn new(store: &'a dyn VectorStore, titler: ClusterTitler, options: CategorizeOptions) -> Self {
        Self {
            store,
            titler,
            options,
            show_progress: false,
        }
    }

    /// Show terminal progress bars while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn options(&self) -> &CategorizeOptions {
        &self.options
    }

    /// Run every stage.
    pub fn run(&self) -> CategorizeResult<CategorizationReport> {
        let population = self.fetch()?;
        let clusters = self.cluster(&population)?;
        let snapshot = self.title(&clusters);
        self.persist(&snapshot, &clusters)?;
        let propagation = self.propagate(&snapshot);

        Ok(CategorizationReport {
            total_words: population.len(),
            clusters: snapshot.len(),
            snapshot_path: self.options.snapshot_path.clone(),
            snapshot,
            propagation,
        })
    }

    fn enter(&self, stage: PipelineStage) {
        tracing::info!("stage: {stage}");
    }

    fn fetch(&self) -> CategorizeResult<Population> {
        self.enter(PipelineStage::Fetch);
        let spinner = create_spinner("Fetching words and vectors", self.show_progress);
        let population = fetch_population(self.store, self.options.scan_batch_size);
        spinner.finish_and_clear();

        let population = population?;
        tracing::info!("fetched {} words", population.len());
        Ok(population)
    }

    fn cluster(&self, population: &Population) -> CategorizeResult<WordClusters> {
        self.enter(PipelineStage::Cluster);
        let params = self.options.kmeans_params();
        let spinner = create_spinner(
            &format!("Clustering {} words into {} groups", population.len(), params.k),
            self.show_progress,
        );
        let clusters = cluster_words(&population.words, &population.vectors, &params);
        spinner.finish_and_clear();

        let clusters = clusters?;
        tracing::info!(
            "clustering produced {} non-empty clusters in {} iterations",
            clusters.clusters.len(),
            clusters.iterations
        );
        Ok(clusters)
    }

    fn title(&self, clusters: &WordClusters) -> CategorySnapshot {
        self.enter(PipelineStage::Title);
        let progress = create_progress_bar(
            clusters.clusters.len() as u64,
            "Titling clusters",
            self.show_progress,
        );

        let mut snapshot = CategorySnapshot::new();
        for cluster in &clusters.clusters {
            let representatives = cluster.top_words(self.options.top_n);
            let title = self.titler.title(&representatives);
            tracing::debug!(
                "cluster {} ({} words): {title}",
                cluster.cluster_id,
                cluster.len()
            );
            snapshot.insert(CategoryEntry::from_cluster(
                cluster,
                title,
                self.options.representative_count,
                self.options.sample_count,
            ));
            progress.inc(1);
        }
        progress.finish_and_clear();
        snapshot
    }

    fn persist(&self, snapshot: &CategorySnapshot, clusters: &WordClusters) -> CategorizeResult<()> {
        self.enter(PipelineStage::Persist);
        snapshot.save(&self.options.snapshot_path)?;
        tracing::info!(
            "saved {} categories to {}",
            snapshot.len(),
            self.options.snapshot_path.display()
        );

        if let Some(model_path) = &self.options.model_path {
            let model = ClusterModel::new(clusters.centroids.clone(), snapshot);
            match model.save(model_path) {
                Ok(()) => tracing::info!("saved cluster model to {}", model_path.display()),
                Err(e) => tracing::warn!("cluster model not saved: {e}"),
            }
        }
        Ok(())
    }

    fn propagate(&self, snapshot: &CategorySnapshot) -> PropagationSummary {
        self.enter(PipelineStage::Propagate);
        let progress = create_progress_bar(
            snapshot.total_words() as u64,
            "Updating word categories",
            self.show_progress,
        );
        let summary = Propagator::new(self.store)
            .parallel(self.options.parallel_propagation)
            .with_progress(progress.clone())
            .run(snapshot);
        progress.finish_and_clear();
        summary
    }
}
