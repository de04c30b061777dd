//! Data types for search logs and store statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trendtap_core::ResolutionSource;

/// One row per accepted resolution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogEntry {
    pub topic: String,
    pub resolved_source: ResolutionSource,
    pub latency_ms: i64,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

/// Request count for a single topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: i64,
}

/// Aggregate reporting over the search log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub total_requests: i64,
    pub by_source: BTreeMap<String, i64>,
    pub avg_latency_ms: f64,
    pub top_topics: Vec<TopicCount>,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_topics: i64,
    pub total_search_logs: i64,
    pub db_path: String,
    pub db_size_mb: f64,
}
