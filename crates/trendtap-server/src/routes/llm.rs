//! LLM provider configuration routes. API keys are accepted but never returned.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use trendtap_llm::{providers, LLMConfigUpdate, TestKeyRequest};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/llm/config", get(get_config).put(update_config))
        .route("/llm/config/test", post(test_key))
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.llm_config.read();
    Json(serde_json::json!(config.to_response()))
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LLMConfigUpdate>,
) -> impl IntoResponse {
    let mut config = state.llm_config.write();
    config.apply_update(&update);

    if let Err(e) = config.save() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("Failed to save config: {}", e) })),
        );
    }

    let response = config.to_response();
    info!(
        "LLM config updated: preferred={}, active={:?}",
        response.preferred_provider, response.active_provider
    );
    (StatusCode::OK, Json(serde_json::json!(response)))
}

async fn test_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TestKeyRequest>,
) -> impl IntoResponse {
    match providers::test_api_key(&state.http, &req.provider, &req.api_key).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "success": true }))),
        Err(e) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": false, "error": e })),
        ),
    }
}
