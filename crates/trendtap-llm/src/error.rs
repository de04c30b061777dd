//! LLM analysis failure kinds. None of these escape the resolver.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Response text was not JSON or lacked `relatedAreas`/`affiliatePrograms`.
    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    /// Network error, timeout, non-2xx status or no provider configured.
    #[error("LLM provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Too many recent provider failures; calls are short-circuited.
    #[error("LLM circuit breaker open")]
    CircuitOpen,
}

impl AnalysisError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AnalysisError::ProviderUnavailable(_))
    }
}
