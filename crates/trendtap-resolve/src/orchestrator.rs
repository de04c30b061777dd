//! Topic resolver: the store, pattern, LLM, fallback cascade.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use trendtap_core::{normalize_topic, now_millis, ResolutionSource, Result, TopicAnalysis};
use trendtap_llm::TopicAnalyzer;
use trendtap_patterns::PatternMatcher;
use trendtap_store::SqliteStore;

use crate::search_log::SearchLogger;
use crate::types::ResolverConfig;

/// Resolves a raw topic to an analysis. Only invalid input is an error;
/// every other failure degrades to the next strategy.
pub struct TopicResolver {
    store: Arc<SqliteStore>,
    config: ResolverConfig,
    analyzer: Option<Arc<dyn TopicAnalyzer>>,
    logger: SearchLogger,
}

impl TopicResolver {
    pub fn new(
        store: Arc<SqliteStore>,
        config: ResolverConfig,
        analyzer: Option<Arc<dyn TopicAnalyzer>>,
        logger: SearchLogger,
    ) -> Self {
        info!(
            "Topic resolver initialized: {} pattern categories, llm={}, pattern_ttl={:?}",
            config.matcher.categories().len(),
            analyzer.is_some(),
            config.pattern_ttl
        );
        Self {
            store,
            config,
            analyzer,
            logger,
        }
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.config.matcher
    }

    pub fn max_topic_length(&self) -> usize {
        self.config.max_topic_length
    }

    /// Resolve `raw_topic` and log the outcome.
    ///
    /// Fails only with `InvalidInput`, in which case nothing is logged.
    pub async fn resolve(&self, raw_topic: &str) -> Result<TopicAnalysis> {
        let topic = normalize_topic(raw_topic, self.config.max_topic_length)?;
        let started = Instant::now();

        let analysis = self.resolve_normalized(&topic).await;

        let latency_ms = started.elapsed().as_millis() as i64;
        self.logger.record(&topic, analysis.source, latency_ms);
        Ok(analysis)
    }

    async fn resolve_normalized(&self, topic: &str) -> TopicAnalysis {
        if let Some(hit) = self.from_store(topic).await {
            return hit;
        }
        if let Some(analysis) = self.from_pattern(topic) {
            return analysis;
        }
        if let Some(analysis) = self.from_llm(topic).await {
            return analysis;
        }
        debug!("No strategy resolved '{}', serving fallback", topic);
        TopicAnalysis::fallback(topic)
    }

    /// Step 2: a stored record, re-resolved first if it has gone stale.
    async fn from_store(&self, topic: &str) -> Option<TopicAnalysis> {
        let stored = match self.store.get_topic(topic) {
            Ok(stored) => stored?,
            Err(e) => {
                warn!("Store lookup for '{}' failed, treating as miss: {}", topic, e);
                return None;
            }
        };

        if self.is_stale(&stored) {
            if let Some(superseded) = self.supersede(&stored).await {
                return Some(superseded);
            }
        }
        self.count_hit(topic)
    }

    fn count_hit(&self, topic: &str) -> Option<TopicAnalysis> {
        match self.store.record_hit(topic) {
            Ok(Some(mut hit)) => {
                debug!("Store hit for '{}' (hit_count={})", topic, hit.hit_count);
                hit.source = ResolutionSource::Database;
                Some(hit)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Recording hit for '{}' failed, treating as miss: {}", topic, e);
                None
            }
        }
    }

    fn is_stale(&self, stored: &TopicAnalysis) -> bool {
        let Some(ttl) = self.config.pattern_ttl else {
            return false;
        };
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        stored.source == ResolutionSource::Pattern
            && self.configured_analyzer().is_some()
            && now_millis().saturating_sub(stored.created_at) > ttl_ms
    }

    /// Replace a stale pattern record with a fresh LLM analysis.
    ///
    /// Returns `None` when the LLM or the write fails, so the caller serves
    /// the stored record instead.
    async fn supersede(&self, stored: &TopicAnalysis) -> Option<TopicAnalysis> {
        let analyzer = self.configured_analyzer()?;
        let fresh = match analyzer.analyze(&stored.topic).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(
                    "Re-resolving stale pattern record '{}' failed, serving stored: {}",
                    stored.topic, e
                );
                return None;
            }
        };

        let replacement = TopicAnalysis {
            topic: stored.topic.clone(),
            source: ResolutionSource::Llm,
            related_areas: fresh.related_areas,
            affiliate_programs: fresh.affiliate_programs,
            created_at: stored.created_at,
            last_accessed_at: now_millis(),
            hit_count: stored.hit_count,
        };
        match self.store.replace_topic(&replacement) {
            Ok(Some(updated)) => {
                info!("Superseded stale pattern record '{}' with llm analysis", stored.topic);
                Some(updated)
            }
            Ok(None) => None,
            Err(e) => {
                error!("Failed to supersede '{}': {}", stored.topic, e);
                None
            }
        }
    }

    /// Step 3: synthesize from the best-matching pattern category.
    fn from_pattern(&self, topic: &str) -> Option<TopicAnalysis> {
        let category = self.config.matcher.match_topic(topic)?;
        debug!("Topic '{}' matched pattern category '{}'", topic, category.name);
        let analysis = category.synthesize(topic);
        self.persist(analysis)
    }

    /// Step 4: ask the LLM, if one is configured.
    async fn from_llm(&self, topic: &str) -> Option<TopicAnalysis> {
        let analyzer = self.configured_analyzer()?;
        match analyzer.analyze(topic).await {
            Ok(mut analysis) => {
                analysis.topic = topic.to_string();
                analysis.source = ResolutionSource::Llm;
                self.persist(analysis)
            }
            Err(e) => {
                warn!("LLM analysis for '{}' failed: {}", topic, e);
                None
            }
        }
    }

    /// Insert a new record. A concurrent resolution that stored the topic
    /// first wins, and its record is served as a store hit.
    fn persist(&self, analysis: TopicAnalysis) -> Option<TopicAnalysis> {
        match self.store.insert_if_absent(&analysis) {
            Ok(true) => {
                debug!("Stored '{}' from {}", analysis.topic, analysis.source);
                Some(analysis)
            }
            Ok(false) => {
                debug!("'{}' was stored concurrently, serving winner", analysis.topic);
                self.count_hit(&analysis.topic)
            }
            Err(e) => {
                error!(
                    "Failed to store '{}' from {}: {}",
                    analysis.topic, analysis.source, e
                );
                None
            }
        }
    }

    fn configured_analyzer(&self) -> Option<&Arc<dyn TopicAnalyzer>> {
        self.analyzer.as_ref().filter(|a| a.is_configured())
    }
}
