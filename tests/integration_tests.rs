// Gateway file to expose integration tests from the integration/ subdirectory
// Each test file in integration/ needs to be included here

mod common;

#[path = "integration/test_categorize_pipeline.rs"]
mod test_categorize_pipeline;

#[path = "integration/test_category_queries.rs"]
mod test_category_queries;

#[path = "integration/test_titling_retry.rs"]
mod test_titling_retry;

#[path = "integration/test_word_service.rs"]
mod test_word_service;

#[path = "integration/test_settings.rs"]
mod test_settings;
