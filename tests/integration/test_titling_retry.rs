//! Title retries and fallbacks, alone and inside a pipeline run.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use wordsense::CategorizationPipeline;
use wordsense::error::TitlingError;
use wordsense::titling::{ClusterTitler, RetryPolicy, fallback_title};

use crate::common::{category_of, memory_store, options_in, seed, temp_dir};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

#[test]
fn test_success_on_last_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let generator = move |_: &[String]| -> Result<String, TitlingError> {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(TitlingError::Transport("timeout".to_string()))
        } else {
            Ok("  Domestic Animals  ".to_string())
        }
    };
    let titler = ClusterTitler::new(Arc::new(generator), RetryPolicy::immediate(3));

    assert_eq!(titler.title(&words(&["cat", "dog"])), "Domestic_Animals");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_exhausted_retries_fall_back() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let generator = move |_: &[String]| -> Result<String, TitlingError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(TitlingError::Transport("connection refused".to_string()))
    };
    let titler = ClusterTitler::new(Arc::new(generator), RetryPolicy::immediate(3));

    let cluster = words(&["cat", "dog", "kitten", "puppy"]);
    assert!(matches!(
        titler.try_title(&cluster),
        Err(TitlingError::Exhausted { attempts: 3, .. })
    ));
    assert_eq!(titler.title(&cluster), "Cluster_cat_dog_kitten");
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn test_blank_titles_count_as_failures() {
    let generator = |_: &[String]| -> Result<String, TitlingError> { Ok("  ?!  ".to_string()) };
    let titler = ClusterTitler::new(Arc::new(generator), RetryPolicy::immediate(2));

    assert_eq!(titler.title(&words(&["car"])), "Cluster_car");
}

#[test]
fn test_pipeline_uses_fallback_titles_when_titling_fails() {
    let store = memory_store();
    seed(
        &store,
        &[("cat", "feline"), ("dog", "canine"), ("car", "vehicle")],
    );
    let dir = temp_dir();
    let generator = |_: &[String]| -> Result<String, TitlingError> {
        Err(TitlingError::MalformedResponse("no choices".to_string()))
    };
    let titler = ClusterTitler::new(Arc::new(generator), RetryPolicy::immediate(2));

    let report = CategorizationPipeline::new(&store, titler, options_in(dir.path(), 2))
        .run()
        .unwrap();

    assert_eq!(report.clusters, 2);
    assert!(report.snapshot.entries().all(|e| e.title.starts_with("Cluster_")));
    assert_eq!(category_of(&store, "car").as_deref(), Some("Cluster_car"));
    assert_eq!(report.propagation.total_updated, 3);
}

#[test]
fn test_fallback_only_titler() {
    let titler = ClusterTitler::fallback_only();
    let cluster = words(&["apple", "bread"]);
    assert_eq!(titler.title(&cluster), fallback_title(&cluster));
    assert_eq!(titler.title(&cluster), "Cluster_apple_bread");
}
