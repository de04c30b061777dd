//! LLM topic analysis against external providers (OpenAI/Anthropic/Groq).
//!
//! One structured-output completion per call; retries and the circuit
//! breaker live in [`resilience`].

pub mod analysis;
pub mod config;
pub mod error;
pub mod providers;
pub mod resilience;
pub mod types;

pub use analysis::{LlmAnalysisClient, TopicAnalyzer};
pub use config::{LLMConfig, ResolvedProvider};
pub use error::AnalysisError;
pub use resilience::{CircuitBreaker, ResilientAnalyzer, RetryPolicy};
pub use types::*;
