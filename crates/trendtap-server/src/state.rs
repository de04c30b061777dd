//! Shared application state.

use std::sync::Arc;

use parking_lot::RwLock;
use trendtap_core::TrendTapConfig;
use trendtap_llm::{LLMConfig, LlmAnalysisClient, ResilientAnalyzer, TopicAnalyzer};
use trendtap_patterns::{load_categories, PatternMatcher};
use trendtap_resolve::{ResolverConfig, SearchLogger, TopicResolver};
use trendtap_store::SqliteStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: TrendTapConfig,
    pub store: Arc<SqliteStore>,
    /// Shared with the analyzer, which reads it on every call.
    pub llm_config: Arc<RwLock<LLMConfig>>,
    pub resolver: TopicResolver,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: TrendTapConfig, store: SqliteStore) -> Self {
        let llm_config = Arc::new(RwLock::new(LLMConfig::load(
            &config.data_paths.llm_config_file,
        )));

        let client = LlmAnalysisClient::new(llm_config.clone(), config.llm.timeout);
        let analyzer: Arc<dyn TopicAnalyzer> =
            Arc::new(ResilientAnalyzer::from_config(Arc::new(client), &config.llm));

        let matcher = PatternMatcher::new(load_categories(&config.data_paths.patterns_file));

        Self::with_analyzer(config, store, llm_config, matcher, Some(analyzer))
    }

    /// Assemble state around an explicit analyzer and pattern table.
    pub fn with_analyzer(
        config: TrendTapConfig,
        store: SqliteStore,
        llm_config: Arc<RwLock<LLMConfig>>,
        matcher: PatternMatcher,
        analyzer: Option<Arc<dyn TopicAnalyzer>>,
    ) -> Self {
        let store = Arc::new(store);
        let resolver = TopicResolver::new(
            store.clone(),
            ResolverConfig::new(&config, matcher),
            analyzer,
            SearchLogger::new(store.clone()),
        );

        Self {
            config,
            store,
            llm_config,
            resolver,
            http: reqwest::Client::new(),
        }
    }
}
