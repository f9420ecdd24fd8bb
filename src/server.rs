//! HTTP surface over [`WordService`].
//!
//! Handlers are thin: they move the blocking store, embedder and titling
//! work onto tokio's blocking pool and shape the JSON responses.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::{ValidationError, WordError};
use crate::query::{CategoryCount, CategoryPage, CategoryStats};
use crate::types::{SearchQuery, WordHit, WordItem};
use crate::words::{AdvancedSearchQuery, WordService};

/// Errors rendered as `{"error": .., "code": ..}`.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Word(WordError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            ApiError::Word(WordError::Validation(e)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            ApiError::Word(WordError::Embed(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "EMBEDDING_ERROR",
                e.to_string(),
            ),
            ApiError::Word(WordError::Store(e)) => {
                let code = e.status_code();
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"error": e.to_string(), "code": code})),
                )
                    .into_response();
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
            }
        };
        (status, Json(json!({"error": message, "code": code}))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn blocking<T, F>(operation: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))
}

fn default_page_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

/// Build the router. CORS is permissive.
pub fn router(service: Arc<WordService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/add_words", post(add_word))
        .route("/api/search_word", post(search_word))
        .route("/api/categories", get(list_categories))
        .route("/api/categories/stats", get(category_stats))
        .route("/api/categories/{name}/words", get(words_in_category))
        .route("/api/categories/{name}/search", post(search_in_category))
        .route("/api/search/advanced", post(advanced_search))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serve until ctrl-c.
pub async fn serve(service: Arc<WordService>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on http://{bind}");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn add_word(
    State(service): State<Arc<WordService>>,
    Json(item): Json<WordItem>,
) -> ApiResult<serde_json::Value> {
    let word = item.word.clone();
    blocking(move || service.add_word(item))
        .await?
        .map_err(ApiError::Word)?;
    Ok(Json(
        json!({"message": format!("Word '{word}' added successfully.")}),
    ))
}

async fn search_word(
    State(service): State<Arc<WordService>>,
    Json(query): Json<SearchQuery>,
) -> ApiResult<Vec<WordHit>> {
    Ok(Json(blocking(move || service.search_word(&query)).await?))
}

async fn list_categories(State(service): State<Arc<WordService>>) -> ApiResult<Vec<CategoryCount>> {
    Ok(Json(
        blocking(move || service.queries().list_categories()).await?,
    ))
}

async fn category_stats(State(service): State<Arc<WordService>>) -> ApiResult<CategoryStats> {
    Ok(Json(
        blocking(move || service.queries().category_stats()).await?,
    ))
}

async fn words_in_category(
    State(service): State<Arc<WordService>>,
    Path(name): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<CategoryPage> {
    Ok(Json(
        blocking(move || {
            service
                .queries()
                .words_in_category(&name, params.limit, params.offset)
        })
        .await?,
    ))
}

async fn search_in_category(
    State(service): State<Arc<WordService>>,
    Path(name): Path<String>,
    Json(query): Json<SearchQuery>,
) -> ApiResult<Vec<WordHit>> {
    Ok(Json(
        blocking(move || service.search_in_category(&query.word, &name, query.limit)).await?,
    ))
}

async fn advanced_search(
    State(service): State<Arc<WordService>>,
    Json(request): Json<AdvancedSearchQuery>,
) -> ApiResult<Vec<WordHit>> {
    let hits = blocking(move || service.advanced_search(&request))
        .await?
        .map_err(ApiError::Validation)?;
    Ok(Json(hits))
}
