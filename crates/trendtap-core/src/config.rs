//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3003;
pub const DEFAULT_MAX_TOPIC_LENGTH: usize = 200;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LLM_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_LLM_BACKOFF_MS: u64 = 250;

/// Paths to all TrendTap data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
    /// Optional pattern category override (`data/patterns.json`).
    pub patterns_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            llm_config_file: root.join("llm-config.json"),
            patterns_file: root.join("patterns.json"),
            root,
        };
        std::fs::create_dir_all(&paths.db)?;
        Ok(paths)
    }
}

/// LLM call resilience settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallConfig {
    /// HTTP timeout for a single provider call.
    pub timeout: Duration,
    /// Total attempts per resolution, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles on each retry.
    pub initial_backoff: Duration,
    /// Failures within `breaker_window` that open the circuit breaker.
    pub breaker_threshold: u32,
    /// Window in which failures are counted.
    pub breaker_window: Duration,
    /// How long the breaker stays open before letting a call through.
    pub breaker_cooldown: Duration,
}

impl Default for LlmCallConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            max_attempts: DEFAULT_LLM_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_LLM_BACKOFF_MS),
            breaker_threshold: 5,
            breaker_window: Duration::from_secs(60),
            breaker_cooldown: Duration::from_secs(30),
        }
    }
}

/// Top-level TrendTap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendTapConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Maximum normalized topic length in characters.
    pub max_topic_length: usize,
    /// Age after which a pattern-sourced record may be superseded by the LLM.
    pub pattern_ttl: Option<Duration>,
    pub llm: LlmCallConfig,
}

impl TrendTapConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = env_parse("PORT").unwrap_or(DEFAULT_PORT);
        let max_topic_length =
            env_parse("TRENDTAP_MAX_TOPIC_LENGTH").unwrap_or(DEFAULT_MAX_TOPIC_LENGTH);
        let pattern_ttl = env_parse("TRENDTAP_PATTERN_TTL_HOURS").map(ttl_from_hours);

        let defaults = LlmCallConfig::default();
        let llm = LlmCallConfig {
            timeout: env_parse("TRENDTAP_LLM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_attempts: env_parse::<u32>("TRENDTAP_LLM_MAX_ATTEMPTS")
                .unwrap_or(defaults.max_attempts)
                .max(1),
            initial_backoff: env_parse("TRENDTAP_LLM_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            ..defaults
        };

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            max_topic_length,
            pattern_ttl,
            llm,
        })
    }
}

fn ttl_from_hours(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
