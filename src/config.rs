//! Configuration module for the word lookup service.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.wordsense/settings.toml`, searched upwards)
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `WORDSENSE_` and use double
//! underscores to separate nested levels:
//! - `WORDSENSE_STORE__URL=http://qdrant:6333` sets `store.url`
//! - `WORDSENSE_TITLING__API_KEY=...` sets `titling.api_key`
//! - `WORDSENSE_CATEGORIZE__NUM_CLUSTERS=20` sets `categorize.num_clusters`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".wordsense";

const ENV_PREFIX: &str = "WORDSENSE_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    /// Vector store connection
    #[serde(default)]
    pub store: StoreSettings,

    /// Embedding model
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Language model used to title clusters
    #[serde(default)]
    pub titling: TitlingSettings,

    /// Clustering and propagation
    #[serde(default)]
    pub categorize: CategorizeSettings,

    /// HTTP server
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Qdrant,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_store_url")]
    pub url: String,

    /// Sent as the `api-key` header when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_vector_size")]
    pub vector_size: usize,

    #[serde(default = "default_distance")]
    pub distance: String,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Page size for full scans
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingSettings {
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded model files are cached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TitlingSettings {
    #[serde(default = "default_titling_url")]
    pub api_url: String,

    /// Empty means no titling requests are made
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_titling_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_titling_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per cluster
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CategorizeSettings {
    #[serde(default = "default_num_clusters")]
    pub num_clusters: usize,

    /// Representative words sent to the titler
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_representative_count")]
    pub representative_count: usize,

    #[serde(default = "default_sample_count")]
    pub sample_count: usize,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Populations larger than this use mini-batch k-means
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_n_init")]
    pub n_init: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_true")]
    pub parallel_propagation: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

fn default_store_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "words".to_string()
}
fn default_vector_size() -> usize {
    crate::vector::VECTOR_DIMENSION_384
}
fn default_distance() -> String {
    "Cosine".to_string()
}
fn default_store_timeout() -> u64 {
    30
}
fn default_scan_batch_size() -> usize {
    1000
}
fn default_embedding_model() -> String {
    "BGESmallENV15".to_string()
}
fn default_titling_url() -> String {
    "https://api.avalai.ir/v1/chat/completions".to_string()
}
fn default_titling_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    20
}
fn default_titling_timeout() -> u64 {
    30
}
fn default_max_retries() -> usize {
    3
}
fn default_retry_delay_ms() -> u64 {
    2000
}
fn default_num_clusters() -> usize {
    50
}
fn default_top_n() -> usize {
    45
}
fn default_representative_count() -> usize {
    15
}
fn default_sample_count() -> usize {
    30
}
fn default_max_iterations() -> usize {
    crate::vector::DEFAULT_MAX_ITERATIONS
}
fn default_batch_size() -> usize {
    1000
}
fn default_n_init() -> usize {
    3
}
fn default_seed() -> u64 {
    42
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("word_categories.json")
}
fn default_model_path() -> PathBuf {
    PathBuf::from("cluster_model.json")
}
fn default_true() -> bool {
    true
}
fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            store: StoreSettings::default(),
            embedding: EmbeddingSettings::default(),
            titling: TitlingSettings::default(),
            categorize: CategorizeSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_store_url(),
            api_key: None,
            collection: default_collection(),
            vector_size: default_vector_size(),
            distance: default_distance(),
            timeout_secs: default_store_timeout(),
            scan_batch_size: default_scan_batch_size(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
        }
    }
}

impl EmbeddingSettings {
    /// Configured cache directory, else `<user cache dir>/wordsense/models`.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("wordsense").join("models")))
    }
}

impl Default for TitlingSettings {
    fn default() -> Self {
        Self {
            api_url: default_titling_url(),
            api_key: String::new(),
            model: default_titling_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_titling_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for CategorizeSettings {
    fn default() -> Self {
        Self {
            num_clusters: default_num_clusters(),
            top_n: default_top_n(),
            representative_count: default_representative_count(),
            sample_count: default_sample_count(),
            max_iterations: default_max_iterations(),
            batch_size: default_batch_size(),
            n_init: default_n_init(),
            seed: default_seed(),
            snapshot_path: default_snapshot_path(),
            model_path: default_model_path(),
            parallel_propagation: true,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

/// `WORDSENSE_A__B_C` becomes `a.b_c`.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().replace("__", ".").into())
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config().unwrap_or_else(Self::default_config_path);
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring defaults
    /// and environment overrides. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(env_provider())
            .extract()
            .map_err(Box::new)
    }

    /// `.wordsense/settings.toml` relative to the current directory.
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(CONFIG_DIR).join("settings.toml")
    }

    /// Find the settings file by looking for `.wordsense` from the current
    /// directory up to the filesystem root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join("settings.toml"))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = Self::default_config_path();
        Self::write_template(&config_path, force)?;
        Ok(config_path)
    }

    fn write_template(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let defaults = Settings::default();
        let template = format!(
            r#"# wordsense configuration
# Every value can be overridden with WORDSENSE_<SECTION>__<KEY> environment variables.

# Global debug mode
debug = false

[store]
# "qdrant" or "memory"
backend = "qdrant"
url = "{url}"
collection = "{collection}"
# Must match the embedding model's output size
vector_size = {vector_size}
distance = "Cosine"
timeout_secs = {store_timeout}
# Page size used when scanning the whole collection
scan_batch_size = {scan_batch}
# api_key = ""

[embedding]
# BGESmallENV15 (BAAI/bge-small-en-v1.5), BGEBaseENV15, AllMiniLML6V2, MultilingualE5Small
model = "{model}"
# cache_dir = "~/.cache/wordsense/models"

[titling]
# OpenAI-compatible chat completions endpoint
api_url = "{api_url}"
# Leave empty to skip the language model and use Cluster_<w1>_<w2>_<w3> titles
api_key = ""
model = "{titling_model}"
temperature = {temperature}
max_tokens = {max_tokens}
timeout_secs = {titling_timeout}
# Total attempts per cluster and the pause between them
max_retries = {max_retries}
retry_delay_ms = {retry_delay}

[categorize]
num_clusters = {num_clusters}
# Words sent to the language model per cluster
top_n = {top_n}
representative_count = {representative}
sample_count = {sample}
max_iterations = {max_iterations}
# Populations above this size use mini-batch k-means
batch_size = {batch_size}
n_init = {n_init}
seed = {seed}
snapshot_path = "{snapshot}"
model_path = "{model_path}"
parallel_propagation = true

[server]
bind = "{bind}"
"#,
            url = defaults.store.url,
            collection = defaults.store.collection,
            vector_size = defaults.store.vector_size,
            store_timeout = defaults.store.timeout_secs,
            scan_batch = defaults.store.scan_batch_size,
            model = defaults.embedding.model,
            api_url = defaults.titling.api_url,
            titling_model = defaults.titling.model,
            temperature = defaults.titling.temperature,
            max_tokens = defaults.titling.max_tokens,
            titling_timeout = defaults.titling.timeout_secs,
            max_retries = defaults.titling.max_retries,
            retry_delay = defaults.titling.retry_delay_ms,
            num_clusters = defaults.categorize.num_clusters,
            top_n = defaults.categorize.top_n,
            representative = defaults.categorize.representative_count,
            sample = defaults.categorize.sample_count,
            max_iterations = defaults.categorize.max_iterations,
            batch_size = defaults.categorize.batch_size,
            n_init = defaults.categorize.n_init,
            seed = defaults.categorize.seed,
            snapshot = defaults.categorize.snapshot_path.display(),
            model_path = defaults.categorize.model_path.display(),
            bind = defaults.server.bind,
        );

        std::fs::write(config_path, template)?;
        Ok(())
    }
}
