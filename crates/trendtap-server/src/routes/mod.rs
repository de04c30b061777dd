//! HTTP route handlers, all nested under `/api`.

pub mod llm;
pub mod searches;
pub mod stats;
pub mod topics;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use trendtap_core::Error;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(topics::routes())
        .merge(searches::routes())
        .merge(stats::routes())
        .merge(llm::routes())
}

/// Map a core error to a status code and `{error}` body.
pub(crate) fn error_response(e: Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match e {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if !e.is_client_error() {
        error!("Request failed: {}", e);
    }
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}
