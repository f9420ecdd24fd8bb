//! Word insertion and lookup through the service object.

use std::sync::Arc;

use wordsense::error::{ValidationError, WordError};
use wordsense::storage::{MemoryVectorStore, VectorStore};
use wordsense::types::SearchQuery;
use wordsense::vector::VectorDimension;
use wordsense::{AdvancedSearchQuery, WordService};

use crate::common::{FailingStore, KeywordEmbedder, item, memory_store, word_service};

#[test]
fn test_import_then_search() {
    let service = word_service(memory_store());
    let summary = service.add_words(vec![
        item("cat", "small feline pet"),
        item("dog", "loyal canine pet"),
        item("truck", "heavy motor vehicle"),
        item("apple", "red fruit"),
    ]);
    assert_eq!(summary.inserted, 4);
    assert_eq!(summary.failed, 0);

    let hits = service.search_word(&SearchQuery {
        word: "vehicle".to_string(),
        limit: 1,
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].word, "truck");
    assert_eq!(hits[0].meaning, "heavy motor vehicle");
}

#[test]
fn test_search_respects_limit() {
    let service = word_service(memory_store());
    for word in ["cat", "dog", "kitten", "puppy"] {
        service.add_word(item(word, "pet")).unwrap();
    }
    let hits = service.search_word(&SearchQuery {
        word: "pet".to_string(),
        limit: 3,
    });
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_new_words_start_uncategorized() {
    let service = word_service(memory_store());
    service.add_word(item("cat", "feline")).unwrap();
    assert!(service.queries().list_categories().is_empty());

    let hits = service.search_word(&SearchQuery {
        word: "cat".to_string(),
        limit: 3,
    });
    assert_eq!(hits[0].category, None);
}

#[test]
fn test_advanced_search_by_text() {
    let service = word_service(memory_store());
    service.add_word(item("cat", "small feline")).unwrap();
    service.add_word(item("car", "motor vehicle")).unwrap();

    let hits = service
        .advanced_search(&AdvancedSearchQuery {
            query: Some("kitten".to_string()),
            limit: 1,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(hits[0].word, "cat");

    assert_eq!(
        service.advanced_search(&AdvancedSearchQuery {
            query: Some("   ".to_string()),
            limit: 5,
            ..Default::default()
        }),
        Err(ValidationError::MissingSearchFilter)
    );
}

#[test]
fn test_store_outage() {
    let service = WordService::new(Arc::new(FailingStore), Arc::new(KeywordEmbedder), 10);

    assert!(matches!(
        service.add_word(item("cat", "feline")),
        Err(WordError::Store(_))
    ));
    assert!(
        service
            .search_word(&SearchQuery {
                word: "cat".to_string(),
                limit: 3,
            })
            .is_empty()
    );
    assert!(service.search_in_category("cat", "Pets", 3).is_empty());
    assert_eq!(service.add_words(vec![item("cat", "feline")]).failed, 1);
}

#[test]
fn test_recreate_collection_clears_words() {
    let service = WordService::new(
        Arc::new(MemoryVectorStore::with_collection(
            VectorDimension::dimension_384(),
        )),
        Arc::new(KeywordEmbedder),
        10,
    );
    service.add_word(item("cat", "feline")).unwrap();
    assert_eq!(service.store().count(None).unwrap(), 1);

    service.recreate_collection().unwrap();
    assert_eq!(service.store().count(None).unwrap(), 0);
}
