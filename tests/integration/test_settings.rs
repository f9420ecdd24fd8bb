//! Settings files and backend selection.

use wordsense::config::{Settings, StoreBackend};
use wordsense::storage::{VectorStore, open_store};
use wordsense::vector::VectorDimension;

use crate::common::temp_dir;

#[test]
fn test_saved_settings_load_back() {
    let dir = temp_dir();
    let path = dir.path().join("settings.toml");

    let mut settings = Settings::default();
    settings.store.backend = StoreBackend::Memory;
    settings.store.collection = "glossary".to_string();
    settings.categorize.num_clusters = 7;
    settings.save(&path).unwrap();

    let loaded = Settings::load_from(&path).unwrap();
    assert_eq!(loaded.store.backend, StoreBackend::Memory);
    assert_eq!(loaded.store.collection, "glossary");
    assert_eq!(loaded.categorize.num_clusters, 7);
    assert_eq!(loaded.titling, settings.titling);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = temp_dir();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "[categorize]\nnum_clusters = 12\n").unwrap();

    let loaded = Settings::load_from(&path).unwrap();
    let defaults = Settings::default();
    assert_eq!(loaded.categorize.num_clusters, 12);
    assert_eq!(loaded.categorize.top_n, defaults.categorize.top_n);
    assert_eq!(loaded.store, defaults.store);
}

#[test]
fn test_memory_backend_from_settings() {
    let mut settings = Settings::default();
    settings.store.backend = StoreBackend::Memory;

    let store = open_store(&settings.store).unwrap();
    assert!(!store.collection_exists().unwrap());
    store
        .create_collection(VectorDimension::dimension_384())
        .unwrap();
    assert!(store.collection_exists().unwrap());
}
