//! TrendTap Resolve: the topic analysis cascade.
//!
//! Store hit, then pattern match, then LLM, then a generic fallback.
//! Every accepted request leaves exactly one search log row.

pub mod orchestrator;
pub mod search_log;
pub mod types;

pub use orchestrator::TopicResolver;
pub use search_log::{SearchLogSink, SearchLogger};
pub use types::ResolverConfig;
