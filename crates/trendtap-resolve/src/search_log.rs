//! Search logging: one append per accepted resolution request.

use std::sync::Arc;

use tracing::{debug, warn};
use trendtap_core::{now_millis, ResolutionSource, Result};
use trendtap_store::{SearchLogEntry, SqliteStore};

/// Append-only destination for search log entries.
pub trait SearchLogSink: Send + Sync {
    fn append(&self, entry: &SearchLogEntry) -> Result<()>;
}

impl SearchLogSink for SqliteStore {
    fn append(&self, entry: &SearchLogEntry) -> Result<()> {
        self.append_search_log(entry)
    }
}

/// Fire-and-forget logger. A failed append never reaches the caller.
#[derive(Clone)]
pub struct SearchLogger {
    sink: Arc<dyn SearchLogSink>,
}

impl SearchLogger {
    pub fn new(sink: Arc<dyn SearchLogSink>) -> Self {
        Self { sink }
    }

    pub fn record(&self, topic: &str, source: ResolutionSource, latency_ms: i64) {
        let entry = SearchLogEntry {
            topic: topic.to_string(),
            resolved_source: source,
            latency_ms,
            timestamp: now_millis(),
        };
        match self.sink.append(&entry) {
            Ok(()) => debug!("Logged search '{}' -> {} in {}ms", topic, source, latency_ms),
            Err(e) => warn!("Dropping search log entry for '{}': {}", topic, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trendtap_core::Error;

    struct BrokenSink;

    impl SearchLogSink for BrokenSink {
        fn append(&self, _entry: &SearchLogEntry) -> Result<()> {
            Err(Error::Database("disk full".into()))
        }
    }

    #[test]
    fn test_record_appends_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path()).unwrap());
        let logger = SearchLogger::new(store.clone());

        logger.record("coffee", ResolutionSource::Pattern, 12);

        let recent = store.recent_search_logs(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].topic, "coffee");
        assert_eq!(recent[0].resolved_source, ResolutionSource::Pattern);
        assert_eq!(recent[0].latency_ms, 12);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let logger = SearchLogger::new(Arc::new(BrokenSink));
        logger.record("coffee", ResolutionSource::Fallback, 3);
    }
}
