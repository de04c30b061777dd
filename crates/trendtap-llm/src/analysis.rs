//! LLM Analysis Client: prompt construction and structured-output parsing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use trendtap_core::{AffiliateProgram, ResolutionSource, TopicAnalysis};

use crate::config::LLMConfig;
use crate::error::AnalysisError;
use crate::providers::{self, CompletionRequest};

const SYSTEM_PROMPT: &str = "You are an affiliate marketing research assistant. \
You answer only with a single JSON object and never include commentary.";

const ANALYSIS_TEMPERATURE: f64 = 0.3;
const ANALYSIS_MAX_TOKENS: usize = 1024;

/// Produces a topic analysis from an external model.
#[async_trait]
pub trait TopicAnalyzer: Send + Sync {
    /// Whether a provider is currently configured. Unconfigured analyzers are skipped.
    fn is_configured(&self) -> bool;

    /// Analyze `topic`; the returned analysis is keyed by `topic` with source `llm`.
    async fn analyze(&self, topic: &str) -> Result<TopicAnalysis, AnalysisError>;
}

/// Calls whichever provider the shared [`LLMConfig`] resolves to.
pub struct LlmAnalysisClient {
    client: Client,
    config: Arc<RwLock<LLMConfig>>,
}

impl LlmAnalysisClient {
    /// `timeout` bounds each provider HTTP call.
    pub fn new(config: Arc<RwLock<LLMConfig>>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build LLM HTTP client with timeout: {}", e);
                Client::new()
            });
        Self { client, config }
    }
}

#[async_trait]
impl TopicAnalyzer for LlmAnalysisClient {
    fn is_configured(&self) -> bool {
        self.config.read().resolve_provider().is_some()
    }

    async fn analyze(&self, topic: &str) -> Result<TopicAnalysis, AnalysisError> {
        let resolved = self
            .config
            .read()
            .resolve_provider()
            .ok_or_else(|| AnalysisError::ProviderUnavailable("no LLM provider configured".into()))?;

        let prompt = build_prompt(topic);
        let request = CompletionRequest {
            system: SYSTEM_PROMPT,
            prompt: &prompt,
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
        };

        let text = providers::complete(&self.client, &resolved, &request).await?;
        debug!(
            "{} returned {} chars for topic '{}'",
            resolved.provider,
            text.len(),
            topic
        );
        parse_analysis(topic, &text)
    }
}

/// Fixed instructional prompt embedding the raw topic.
pub fn build_prompt(topic: &str) -> String {
    format!(
        r#"Analyze the topic below for a content creator who earns through affiliate marketing.

TOPIC: {topic}

Return a JSON object with exactly these fields:
- "relatedAreas": 3-8 closely related sub-topics or niches a creator could cover, most promising first
- "affiliatePrograms": 2-6 affiliate programs relevant to the topic, each an object with
  "name" (program or brand), "commissionDescription" (typical commission, e.g. "8% per sale"),
  and "networkGuess" (the affiliate network most likely hosting it, or "Direct")

Respond ONLY with valid JSON, no markdown:
{{"relatedAreas": ["..."], "affiliatePrograms": [{{"name": "...", "commissionDescription": "...", "networkGuess": "..."}}]}}"#
    )
}

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").unwrap());

#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(rename = "relatedAreas", alias = "related_areas")]
    related_areas: Vec<String>,
    #[serde(rename = "affiliatePrograms", alias = "affiliate_programs")]
    affiliate_programs: Vec<RawProgram>,
}

#[derive(Deserialize)]
struct RawProgram {
    name: String,
    #[serde(
        default,
        rename = "commissionDescription",
        alias = "commission_description",
        alias = "commission"
    )]
    commission_description: String,
    #[serde(
        default,
        rename = "networkGuess",
        alias = "network_guess",
        alias = "network"
    )]
    network_guess: String,
}

/// Extract the JSON object from model output, tolerating code fences and
/// leading or trailing prose.
fn extract_json(text: &str) -> Option<&str> {
    let text = text.trim();
    if let Some(caps) = FENCED_JSON.captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model output into a [`TopicAnalysis`] keyed by `topic`.
pub fn parse_analysis(topic: &str, text: &str) -> Result<TopicAnalysis, AnalysisError> {
    let json = extract_json(text)
        .ok_or_else(|| AnalysisError::MalformedResponse("no JSON object in response".into()))?;

    let raw: RawAnalysis = serde_json::from_str(json)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let related_areas: Vec<String> = raw
        .related_areas
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    let affiliate_programs: Vec<AffiliateProgram> = raw
        .affiliate_programs
        .into_iter()
        .filter(|p| !p.name.trim().is_empty())
        .map(|p| AffiliateProgram {
            name: p.name.trim().to_string(),
            commission_description: p.commission_description.trim().to_string(),
            network_guess: p.network_guess.trim().to_string(),
        })
        .collect();

    Ok(TopicAnalysis::new(
        topic,
        ResolutionSource::Llm,
        related_areas,
        affiliate_programs,
    ))
}
