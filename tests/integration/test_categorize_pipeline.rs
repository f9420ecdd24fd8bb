//! End-to-end categorization runs against the in-memory store.

use std::sync::Arc;

use wordsense::categorize::{CategorySnapshot, ClusterModel, propagate_snapshot};
use wordsense::error::{CategorizeError, TitlingError, ValidationError};
use wordsense::titling::{ClusterTitler, RetryPolicy};
use wordsense::vector::ClusteringError;
use wordsense::{CategorizationPipeline, CategoryQueries};

use crate::common::{
    FailingStore, category_of, keyword_vector, memory_store, options_in, seed, temp_dir,
};

fn topic_titler() -> ClusterTitler {
    let generator = |words: &[String]| -> Result<String, TitlingError> {
        if words.iter().any(|w| w == "car") {
            Ok("Vehicles".to_string())
        } else {
            Ok("Pets".to_string())
        }
    };
    ClusterTitler::new(Arc::new(generator), RetryPolicy::immediate(1))
}

#[test]
fn test_two_clusters_from_three_words() {
    let store = memory_store();
    seed(
        &store,
        &[("cat", "feline pet"), ("dog", "canine pet"), ("car", "motor vehicle")],
    );
    let dir = temp_dir();

    let report = CategorizationPipeline::new(&store, topic_titler(), options_in(dir.path(), 2))
        .run()
        .unwrap();

    assert_eq!(report.total_words, 3);
    assert_eq!(report.clusters, 2);

    let mut sizes: Vec<usize> = report.snapshot.entries().map(|e| e.total_words).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2]);

    assert_eq!(report.propagation.total_updated, 3);
    assert_eq!(report.propagation.total_failed, 0);
    assert_eq!(category_of(&store, "cat").as_deref(), Some("Pets"));
    assert_eq!(category_of(&store, "dog").as_deref(), Some("Pets"));
    assert_eq!(category_of(&store, "car").as_deref(), Some("Vehicles"));
}

#[test]
fn test_snapshot_on_disk_matches_report() {
    let store = memory_store();
    seed(
        &store,
        &[("cat", "feline"), ("dog", "canine"), ("car", "vehicle"), ("bus", "vehicle")],
    );
    let dir = temp_dir();
    let options = options_in(dir.path(), 2);
    let snapshot_path = options.snapshot_path.clone();

    let report = CategorizationPipeline::new(&store, topic_titler(), options)
        .run()
        .unwrap();

    let saved = CategorySnapshot::load(&snapshot_path).unwrap();
    assert_eq!(saved, report.snapshot);

    let vehicles = saved.get("Vehicles").unwrap();
    assert_eq!(vehicles.total_words, 2);
    let mut words = vehicles.all_words.clone();
    words.sort();
    assert_eq!(words, vec!["bus", "car"]);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert!(raw["Pets"]["representative_words"].is_array());
    assert!(raw["Pets"]["cluster_id"].is_u64());
}

#[test]
fn test_repeated_propagation_leaves_store_unchanged() {
    let store = memory_store();
    seed(
        &store,
        &[("cat", "feline"), ("dog", "canine"), ("car", "vehicle")],
    );
    let dir = temp_dir();
    let options = options_in(dir.path(), 2);
    let snapshot_path = options.snapshot_path.clone();

    CategorizationPipeline::new(&store, topic_titler(), options)
        .run()
        .unwrap();
    let before = CategoryQueries::new(&store, 10).list_categories();

    let again = propagate_snapshot(&store, &snapshot_path, true).unwrap();
    assert_eq!(again.total_updated, 3);
    assert_eq!(again.categories_processed, 2);

    let after = CategoryQueries::new(&store, 10).list_categories();
    assert_eq!(before, after);
}

#[test]
fn test_empty_store_aborts_before_writing() {
    let store = memory_store();
    let dir = temp_dir();
    let options = options_in(dir.path(), 2);
    let snapshot_path = options.snapshot_path.clone();

    let result = CategorizationPipeline::new(&store, topic_titler(), options).run();

    assert!(matches!(
        result,
        Err(CategorizeError::Validation(ValidationError::EmptyPopulation))
    ));
    assert!(!snapshot_path.exists());
}

#[test]
fn test_more_clusters_than_words_fails() {
    let store = memory_store();
    seed(&store, &[("cat", "feline"), ("car", "vehicle")]);
    let dir = temp_dir();

    let result = CategorizationPipeline::new(&store, topic_titler(), options_in(dir.path(), 5)).run();

    assert!(matches!(
        result,
        Err(CategorizeError::Clustering(ClusteringError::InvalidClusterCount { .. }))
    ));
}

#[test]
fn test_unreachable_store_is_a_fetch_error() {
    let dir = temp_dir();
    let result =
        CategorizationPipeline::new(&FailingStore, topic_titler(), options_in(dir.path(), 2)).run();
    assert!(matches!(result, Err(CategorizeError::Fetch(_))));
}

#[test]
fn test_persist_failure_leaves_words_unlabelled() {
    let store = memory_store();
    seed(
        &store,
        &[("cat", "feline"), ("dog", "canine"), ("car", "vehicle")],
    );
    let dir = temp_dir();
    // A regular file where the snapshot's parent directory should be.
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "x").unwrap();

    let mut options = options_in(dir.path(), 2);
    options.snapshot_path = blocker.join("word_categories.json");

    let result = CategorizationPipeline::new(&store, topic_titler(), options).run();

    assert!(matches!(result, Err(CategorizeError::Persist { .. })));
    assert_eq!(category_of(&store, "cat"), None);
    assert!(CategoryQueries::new(&store, 10).list_categories().is_empty());
}

#[test]
fn test_saved_model_classifies_new_words() {
    let store = memory_store();
    seed(
        &store,
        &[("cat", "feline"), ("dog", "canine"), ("car", "vehicle"), ("truck", "vehicle")],
    );
    let dir = temp_dir();
    let options = options_in(dir.path(), 2);
    let model_path = options.model_path.clone().unwrap();

    CategorizationPipeline::new(&store, topic_titler(), options)
        .run()
        .unwrap();

    let model = ClusterModel::load(&model_path).unwrap();
    let found = model.classify(&keyword_vector("kitten")).unwrap();
    assert_eq!(found.category.as_deref(), Some("Pets"));

    let found = model.classify(&keyword_vector("bus")).unwrap();
    assert_eq!(found.category.as_deref(), Some("Vehicles"));
}
