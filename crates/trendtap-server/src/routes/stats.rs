//! Stats and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use trendtap_store::StoreStats;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/health", get(health))
}

/// GET /api/stats: storage statistics.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store_stats = state.store.get_stats().unwrap_or_else(|e| {
        tracing::warn!("Failed to read store stats: {}", e);
        StoreStats {
            total_topics: 0,
            total_search_logs: 0,
            db_path: String::new(),
            db_size_mb: 0.0,
        }
    });
    let llm_configured = state.llm_config.read().resolve_provider().is_some();

    Json(serde_json::json!({
        "topics": store_stats.total_topics,
        "searches": store_stats.total_search_logs,
        "dbPath": store_stats.db_path,
        "dbSizeMb": store_stats.db_size_mb,
        "patternCategories": state.resolver.matcher().categories().len(),
        "llmConfigured": llm_configured,
        "patternTtlHours": state.config.pattern_ttl.map(|d| d.as_secs() / 3600),
    }))
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
