//! External LLM provider calls.
//!
//! OpenAI and Groq share the chat-completions format. Anthropic uses the
//! Messages API. Every call is a single non-streaming completion.

use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::config::ResolvedProvider;
use crate::error::AnalysisError;
use crate::types::LLMProvider;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub temperature: f64,
    pub max_tokens: usize,
}

/// Send the request to the resolved provider and return the raw response text.
pub async fn complete(
    client: &Client,
    resolved: &ResolvedProvider,
    request: &CompletionRequest<'_>,
) -> Result<String, AnalysisError> {
    match resolved.provider {
        LLMProvider::OpenAI => complete_openai_compat(client, OPENAI_URL, resolved, request).await,
        LLMProvider::Groq => complete_openai_compat(client, GROQ_URL, resolved, request).await,
        LLMProvider::Anthropic => complete_anthropic(client, resolved, request).await,
    }
}

async fn complete_openai_compat(
    client: &Client,
    url: &str,
    resolved: &ResolvedProvider,
    request: &CompletionRequest<'_>,
) -> Result<String, AnalysisError> {
    let body = json!({
        "model": resolved.model,
        "messages": [
            {"role": "system", "content": request.system},
            {"role": "user", "content": request.prompt},
        ],
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "response_format": {"type": "json_object"},
    });

    debug!("Requesting completion from {} with model {}", url, resolved.model);

    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {}", resolved.api_key))
        .json(&body)
        .send()
        .await
        .map_err(request_failed)?;

    let parsed = read_json(response).await?;
    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AnalysisError::MalformedResponse("missing choices[0].message.content".into()))
}

async fn complete_anthropic(
    client: &Client,
    resolved: &ResolvedProvider,
    request: &CompletionRequest<'_>,
) -> Result<String, AnalysisError> {
    let body = json!({
        "model": resolved.model,
        "system": request.system,
        "messages": [{"role": "user", "content": request.prompt}],
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });

    debug!("Requesting completion from Anthropic with model {}", resolved.model);

    let response = client
        .post(ANTHROPIC_URL)
        .header("x-api-key", &resolved.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body)
        .send()
        .await
        .map_err(request_failed)?;

    let parsed = read_json(response).await?;
    let text: String = parsed["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b["type"] == "text")
                .filter_map(|b| b["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AnalysisError::MalformedResponse(
            "response contained no text blocks".into(),
        ));
    }
    Ok(text)
}

fn request_failed(e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::ProviderUnavailable(format!("request timed out: {}", e))
    } else {
        AnalysisError::ProviderUnavailable(format!("request failed: {}", e))
    }
}

async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, AnalysisError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AnalysisError::ProviderUnavailable(format!(
            "API error {}: {}",
            status,
            truncate(&body, 300)
        )));
    }
    response
        .json()
        .await
        .map_err(|e| AnalysisError::MalformedResponse(format!("invalid provider envelope: {}", e)))
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Test an API key by making a minimal request.
pub async fn test_api_key(client: &Client, provider: &str, api_key: &str) -> Result<(), String> {
    let resp = match LLMProvider::parse(provider) {
        Some(LLMProvider::OpenAI) => client
            .get("https://api.openai.com/v1/models")
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(|e| e.to_string())?,
        Some(LLMProvider::Groq) => client
            .get("https://api.groq.com/openai/v1/models")
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(|e| e.to_string())?,
        Some(LLMProvider::Anthropic) => client
            .get("https://api.anthropic.com/v1/models")
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .map_err(|e| e.to_string())?,
        None => return Err(format!("Unknown provider: {}", provider)),
    };

    if resp.status().is_success() {
        Ok(())
    } else {
        Err(format!("API returned status {}", resp.status()))
    }
}
