//! Search log reporting routes.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::error_response;
use crate::state::AppState;

const TOP_TOPICS: usize = 10;
const DEFAULT_RECENT: usize = 20;
const MAX_RECENT: usize = 200;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/searches/stats", get(search_stats))
        .route("/searches/recent", get(recent_searches))
}

async fn search_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.search_stats(TOP_TOPICS) {
        Ok(stats) => (StatusCode::OK, Json(serde_json::json!(stats))),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
}

async fn recent_searches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT);
    match state.store.recent_search_logs(limit) {
        Ok(searches) => (StatusCode::OK, Json(serde_json::json!({ "searches": searches }))),
        Err(e) => error_response(e),
    }
}
