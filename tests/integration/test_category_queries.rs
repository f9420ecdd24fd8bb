//! Read paths over a store whose words already carry categories.

use wordsense::error::{QueryError, ValidationError};
use wordsense::query::{AdvancedSearch, CategoryQueries};

use crate::common::{FailingStore, keyword_vector, memory_store, seed, seed_labelled};
use wordsense::storage::MemoryVectorStore;

fn labelled_store() -> MemoryVectorStore {
    let store = memory_store();
    seed_labelled(&store, "cat", "small feline pet", "Pets");
    seed_labelled(&store, "dog", "loyal canine pet", "Pets");
    seed_labelled(&store, "kitten", "young feline", "Pets");
    seed_labelled(&store, "car", "motor vehicle", "Vehicles");
    seed_labelled(&store, "bus", "large vehicle", "Vehicles");
    seed_labelled(&store, "apple", "red fruit", "Food");
    seed(&store, &[("train", "rail vehicle")]);
    store
}

#[test]
fn test_list_categories_largest_first() {
    let store = labelled_store();
    let categories = CategoryQueries::new(&store, 2).list_categories();

    let listed: Vec<(&str, usize)> = categories
        .iter()
        .map(|c| (c.category.as_str(), c.word_count))
        .collect();
    assert_eq!(listed, vec![("Pets", 3), ("Vehicles", 2), ("Food", 1)]);
}

#[test]
fn test_words_in_category_pages() {
    let store = labelled_store();
    let queries = CategoryQueries::new(&store, 2);

    let first = queries.words_in_category("Pets", 2, 0);
    assert_eq!(first.count, 2);
    assert!(first.has_more);

    let rest = queries.words_in_category("Pets", 2, 2);
    assert_eq!(rest.count, 1);
    assert!(!rest.has_more);
    assert_eq!(rest.offset, 2);

    let mut seen: Vec<String> = first
        .words
        .iter()
        .chain(rest.words.iter())
        .map(|h| h.word.clone())
        .collect();
    seen.sort();
    assert_eq!(seen, vec!["cat", "dog", "kitten"]);
    assert!(first.words.iter().all(|h| h.score.is_none()));
}

#[test]
fn test_unknown_category_is_empty() {
    let store = labelled_store();
    let page = CategoryQueries::new(&store, 2).words_in_category("Planets", 10, 0);
    assert_eq!(page.count, 0);
    assert!(!page.has_more);
    assert_eq!(page.category, "Planets");
}

#[test]
fn test_search_in_category_stays_inside() {
    let store = labelled_store();
    let hits = CategoryQueries::new(&store, 2).search_in_category(
        &keyword_vector("car"),
        "Pets",
        10,
    );
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.category.as_deref() == Some("Pets")));
    assert!(hits.iter().all(|h| h.score.is_some()));
}

#[test]
fn test_advanced_search_without_filters_is_rejected() {
    let store = labelled_store();
    let queries = CategoryQueries::new(&store, 2);

    assert!(matches!(
        queries.try_advanced_search(&AdvancedSearch::new(5)),
        Err(QueryError::Validation(ValidationError::MissingSearchFilter))
    ));
    assert_eq!(
        queries.advanced_search(&AdvancedSearch::new(5).category("")),
        Err(ValidationError::MissingSearchFilter)
    );
}

#[test]
fn test_advanced_search_category_only_is_unranked() {
    let store = labelled_store();
    let hits = CategoryQueries::new(&store, 2)
        .advanced_search(&AdvancedSearch::new(10).category("Vehicles"))
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.score.is_none()));
    assert!(hits.iter().all(|h| h.category.as_deref() == Some("Vehicles")));
}

#[test]
fn test_advanced_search_combines_filters() {
    let store = labelled_store();
    let queries = CategoryQueries::new(&store, 2);

    let hits = queries
        .advanced_search(&AdvancedSearch::new(10).category("Pets").meaning_keyword("feline"))
        .unwrap();
    let mut words: Vec<&str> = hits.iter().map(|h| h.word.as_str()).collect();
    words.sort();
    assert_eq!(words, vec!["cat", "kitten"]);

    let ranked = queries
        .advanced_search(
            &AdvancedSearch::new(1)
                .vector(keyword_vector("truck"))
                .meaning_keyword("vehicle"),
        )
        .unwrap();
    assert_eq!(ranked.len(), 1);
    assert!(ranked[0].score.is_some());
    assert!(ranked[0].meaning.contains("vehicle"));
}

#[test]
fn test_stats() {
    let store = labelled_store();
    let stats = CategoryQueries::new(&store, 2).category_stats();

    assert_eq!(stats.total_categories, 3);
    assert_eq!(stats.total_words, 6);
    assert_eq!(stats.average_words_per_category, 2.0);
    assert_eq!(stats.largest_category.unwrap().category, "Pets");
    assert_eq!(stats.smallest_category.unwrap().category, "Food");
}

#[test]
fn test_stats_without_categories() {
    let store = memory_store();
    seed(&store, &[("cat", "feline")]);
    let stats = CategoryQueries::new(&store, 2).category_stats();

    assert_eq!(stats.total_categories, 0);
    assert_eq!(stats.total_words, 0);
    assert_eq!(stats.average_words_per_category, 0.0);
    assert!(stats.largest_category.is_none());
    assert!(stats.smallest_category.is_none());
}

#[test]
fn test_backend_failures_read_as_empty() {
    let queries = CategoryQueries::new(&FailingStore, 2);

    assert!(queries.list_categories().is_empty());
    assert_eq!(queries.words_in_category("Pets", 5, 0).count, 0);
    assert!(queries.search_in_category(&keyword_vector("cat"), "Pets", 5).is_empty());
    assert_eq!(queries.category_stats().total_categories, 0);
    assert_eq!(
        queries.advanced_search(&AdvancedSearch::new(5).category("Pets")),
        Ok(vec![])
    );
    assert!(queries.try_list_categories().is_err());
}
