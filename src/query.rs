//! Category-aware read paths over a labelled store.
//!
//! Every operation has a `try_` form that reports `StoreError`, and a plain
//! form that logs the error and returns an empty result. Serving code uses
//! the plain forms so a backend hiccup looks the same as "nothing found".
//! The one caller-visible rejection is [`CategoryQueries::advanced_search`]
//! without any filter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{OrEmpty, QueryResult, StoreResult, ValidationError};
use crate::storage::{PayloadFilter, ScanPages, ScanRequest, VectorStore};
use crate::types::WordHit;

/// Number of words labelled with a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub word_count: usize,
}

/// One page of a category's members.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryPage {
    pub category: String,
    pub words: Vec<WordHit>,
    pub count: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

/// Aggregates derived from the category list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub total_categories: usize,
    pub total_words: usize,
    /// Rounded to two decimals.
    pub average_words_per_category: f64,
    pub largest_category: Option<CategoryCount>,
    pub smallest_category: Option<CategoryCount>,
}

/// Combined-filter search request. At least one field besides `limit`
/// must be set.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedSearch {
    pub query_vector: Option<Vec<f32>>,
    pub category: Option<String>,
    pub meaning_keyword: Option<String>,
    pub limit: usize,
}

impl AdvancedSearch {
    pub fn new(limit: usize) -> Self {
        Self {
            query_vector: None,
            category: None,
            meaning_keyword: None,
            limit,
        }
    }

    pub fn vector(mut self, vector: Vec<f32>) -> Self {
        self.query_vector = Some(vector);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn meaning_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.meaning_keyword = Some(keyword.into());
        self
    }

    /// Payload filter for the category and keyword parts; `None` if
    /// neither is set. Blank strings count as absent.
    fn payload_filter(&self) -> Option<PayloadFilter> {
        let mut filter = PayloadFilter::new();
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            filter = filter.equals("category", category);
        }
        if let Some(keyword) = self
            .meaning_keyword
            .as_deref()
            .filter(|k| !k.trim().is_empty())
        {
            filter = filter.contains("meaning", keyword);
        }
        (!filter.is_empty()).then_some(filter)
    }
}

/// Read-only category queries. Safe to use while a categorization run is
/// in progress; results reflect whatever labels are committed.
pub struct CategoryQueries<'a> {
    store: &'a dyn VectorStore,
    scan_batch: usize,
}

impl<'a> CategoryQueries<'a> {
    pub fn new(store: &'a dyn VectorStore, scan_batch: usize) -> Self {
        Self {
            store,
            scan_batch: scan_batch.max(1),
        }
    }

    /// Distinct categories with counts, largest first.
    pub fn try_list_categories(&self) -> StoreResult<Vec<CategoryCount>> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for page in ScanPages::new(self.store, ScanRequest::new(self.scan_batch)) {
            for record in page? {
                if let Some(category) = record.payload.category {
                    *counts.entry(category).or_default() += 1;
                }
            }
        }

        let mut categories: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, word_count)| CategoryCount {
                category,
                word_count,
            })
            .collect();
        categories.sort_by(|a, b| {
            b.word_count
                .cmp(&a.word_count)
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(categories)
    }

    pub fn list_categories(&self) -> Vec<CategoryCount> {
        self.try_list_categories().or_empty("list_categories")
    }

    /// Members of `name`, skipping `offset` and returning at most `limit`.
    pub fn try_words_in_category(
        &self,
        name: &str,
        limit: usize,
        offset: usize,
    ) -> StoreResult<CategoryPage> {
        let request =
            ScanRequest::new(self.scan_batch).with_filter(PayloadFilter::category(name));

        let mut words = Vec::with_capacity(limit.min(self.scan_batch));
        let mut has_more = false;
        let mut seen = 0usize;

        'pages: for page in ScanPages::new(self.store, request) {
            for record in page? {
                seen += 1;
                if seen <= offset {
                    continue;
                }
                if words.len() == limit {
                    has_more = true;
                    break 'pages;
                }
                words.push(WordHit::from(record));
            }
        }

        Ok(CategoryPage {
            category: name.to_string(),
            count: words.len(),
            words,
            offset,
            limit,
            has_more,
        })
    }

    pub fn words_in_category(&self, name: &str, limit: usize, offset: usize) -> CategoryPage {
        self.try_words_in_category(name, limit, offset)
            .unwrap_or_else(|e| {
                tracing::warn!("words_in_category failed, returning empty result: {e}");
                CategoryPage {
                    category: name.to_string(),
                    offset,
                    limit,
                    ..CategoryPage::default()
                }
            })
    }

    /// Similarity search restricted to one category.
    pub fn try_search_in_category(
        &self,
        query_vector: &[f32],
        name: &str,
        limit: usize,
    ) -> StoreResult<Vec<WordHit>> {
        let filter = PayloadFilter::category(name);
        Ok(self
            .store
            .search(query_vector, limit, Some(&filter))?
            .into_iter()
            .map(WordHit::from)
            .collect())
    }

    pub fn search_in_category(&self, query_vector: &[f32], name: &str, limit: usize) -> Vec<WordHit> {
        self.try_search_in_category(query_vector, name, limit)
            .or_empty("search_in_category")
    }

    /// Combined category / meaning-keyword / similarity search.
    ///
    /// With a vector, results are ranked by similarity within the filter.
    /// Without one, a filtered scan returns unranked results. Rejects the
    /// request when no filter at all is given.
    pub fn try_advanced_search(&self, request: &AdvancedSearch) -> QueryResult<Vec<WordHit>> {
        let filter = request.payload_filter();
        if request.query_vector.is_none() && filter.is_none() {
            return Err(ValidationError::MissingSearchFilter.into());
        }

        let hits = match &request.query_vector {
            Some(vector) => self
                .store
                .search(vector, request.limit, filter.as_ref())?
                .into_iter()
                .map(WordHit::from)
                .collect(),
            None => {
                let mut scan = ScanRequest::new(request.limit);
                scan.filter = filter;
                self.store
                    .scan(&scan)?
                    .records
                    .into_iter()
                    .map(WordHit::from)
                    .collect()
            }
        };
        Ok(hits)
    }

    /// Like [`Self::try_advanced_search`], but backend failures become an
    /// empty list. Validation failures are still returned.
    pub fn advanced_search(
        &self,
        request: &AdvancedSearch,
    ) -> Result<Vec<WordHit>, ValidationError> {
        match self.try_advanced_search(request) {
            Ok(hits) => Ok(hits),
            Err(crate::error::QueryError::Validation(e)) => Err(e),
            Err(crate::error::QueryError::Store(e)) => {
                tracing::warn!("advanced_search failed, returning empty result: {e}");
                Ok(Vec::new())
            }
        }
    }

    pub fn try_category_stats(&self) -> StoreResult<CategoryStats> {
        Ok(stats_from_counts(&self.try_list_categories()?))
    }

    pub fn category_stats(&self) -> CategoryStats {
        self.try_category_stats().or_empty("category_stats")
    }
}

/// Stats over an already-sorted (largest first) category list.
pub fn stats_from_counts(categories: &[CategoryCount]) -> CategoryStats {
    if categories.is_empty() {
        return CategoryStats::default();
    }

    let total_words: usize = categories.iter().map(|c| c.word_count).sum();
    let average = total_words as f64 / categories.len() as f64;

    CategoryStats {
        total_categories: categories.len(),
        total_words,
        average_words_per_category: (average * 100.0).round() / 100.0,
        largest_category: categories.iter().max_by_key(|c| c.word_count).cloned(),
        smallest_category: categories.iter().min_by_key(|c| c.word_count).cloned(),
    }
}
