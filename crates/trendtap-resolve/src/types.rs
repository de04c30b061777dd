//! Resolver configuration.

use std::time::Duration;

use trendtap_core::{config::DEFAULT_MAX_TOPIC_LENGTH, TrendTapConfig};
use trendtap_patterns::PatternMatcher;

/// Everything the resolver needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum normalized topic length in characters.
    pub max_topic_length: usize,
    /// Pattern-origin records older than this are re-resolved through the LLM.
    /// `None` means they never go stale.
    pub pattern_ttl: Option<Duration>,
    pub matcher: PatternMatcher,
}

impl ResolverConfig {
    pub fn new(config: &TrendTapConfig, matcher: PatternMatcher) -> Self {
        Self {
            max_topic_length: config.max_topic_length,
            pattern_ttl: config.pattern_ttl,
            matcher,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_topic_length: DEFAULT_MAX_TOPIC_LENGTH,
            pattern_ttl: None,
            matcher: PatternMatcher::with_defaults(),
        }
    }
}
