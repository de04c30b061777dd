//! Provider identifiers and the LLM config API surface.

use serde::{Deserialize, Serialize};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Anthropic,
    Groq,
}

impl LLMProvider {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "openai" => Some(Self::OpenAI),
            "anthropic" => Some(Self::Anthropic),
            "groq" => Some(Self::Groq),
            _ => None,
        }
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// LLM config response (keys masked).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LLMConfigResponse {
    pub preferred_provider: String,
    pub openai_configured: bool,
    pub anthropic_configured: bool,
    pub groq_configured: bool,
    pub openai_model: String,
    pub anthropic_model: String,
    pub groq_model: String,
    pub active_provider: Option<String>,
    pub active_model: Option<String>,
}

/// LLM config update request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LLMConfigUpdate {
    pub preferred_provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub anthropic_model: Option<String>,
    pub groq_model: Option<String>,
}

/// API key test request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestKeyRequest {
    pub provider: String,
    pub api_key: String,
}
