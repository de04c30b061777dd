//! TrendTap Core: analysis types, topic normalization, configuration, errors.

pub mod analysis;
pub mod config;
pub mod error;
pub mod topic;

pub use analysis::{now_millis, AffiliateProgram, ResolutionSource, TopicAnalysis};
pub use config::{DataPaths, LlmCallConfig, TrendTapConfig};
pub use error::{Error, Result};
pub use topic::normalize_topic;
