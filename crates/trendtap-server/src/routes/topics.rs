//! Topic analysis and curation routes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use trendtap_core::{normalize_topic, Error};

use super::error_response;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/topics/analyze", post(analyze))
        .route("/topics", get(list_topics))
        .route("/topics/{topic}", get(get_topic).delete(delete_topic))
        .route("/patterns", get(list_patterns))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    topic: String,
}

/// POST /api/topics/analyze: resolve a topic through the cascade.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    match state.resolver.resolve(&req.topic).await {
        Ok(analysis) => (StatusCode::OK, Json(serde_json::json!(analysis))),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    page: Option<usize>,
    page_size: Option<usize>,
}

/// GET /api/topics: stored analyses, most recently accessed first.
async fn list_topics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    match state.store.list_topics(page, page_size) {
        Ok((topics, total)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "topics": topics,
                "total": total,
                "page": page,
                "pageSize": page_size,
            })),
        ),
        Err(e) => error_response(e),
    }
}

/// GET /api/topics/{topic}: stored record without counting a hit.
async fn get_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> impl IntoResponse {
    let lookup = normalize_topic(&topic, state.resolver.max_topic_length())
        .and_then(|key| {
            state
                .store
                .get_topic(&key)?
                .ok_or_else(|| Error::NotFound(format!("topic '{}'", key)))
        });
    match lookup {
        Ok(analysis) => (StatusCode::OK, Json(serde_json::json!(analysis))),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/topics/{topic}: manual curation.
async fn delete_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> impl IntoResponse {
    let deleted = normalize_topic(&topic, state.resolver.max_topic_length())
        .and_then(|key| state.store.delete_topic(&key));
    match deleted {
        Ok(deleted) => (StatusCode::OK, Json(serde_json::json!({ "deleted": deleted }))),
        Err(e) => error_response(e),
    }
}

/// GET /api/patterns: the active pattern category table.
async fn list_patterns(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "categories": state.resolver.matcher().categories(),
    }))
}
