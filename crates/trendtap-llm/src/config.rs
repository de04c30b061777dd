//! LLM configuration persistence and provider selection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{LLMConfigResponse, LLMConfigUpdate, LLMProvider};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// The provider a call will actually go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
}

/// Stored LLM configuration (persisted to llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            groq_model: default_groq_model(),
            config_path: PathBuf::new(),
        }
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: LLMConfig = match std::fs::read_to_string(config_path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", config_path.display(), e);
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };

        config.config_path = config_path.to_path_buf();

        if config.openai_api_key.is_none() {
            config.openai_api_key = non_empty_env("OPENAI_API_KEY");
        }
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = non_empty_env("ANTHROPIC_API_KEY");
        }
        if config.groq_api_key.is_none() {
            config.groq_api_key = non_empty_env("GROQ_API_KEY");
        }

        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved LLM config to {}", self.config_path.display());
        Ok(())
    }

    /// Apply an update, merging with existing config. An empty key clears it.
    pub fn apply_update(&mut self, update: &LLMConfigUpdate) {
        if let Some(p) = &update.preferred_provider {
            self.preferred_provider = p.clone();
        }
        merge_key(&mut self.openai_api_key, &update.openai_api_key);
        merge_key(&mut self.anthropic_api_key, &update.anthropic_api_key);
        merge_key(&mut self.groq_api_key, &update.groq_api_key);
        if let Some(m) = &update.openai_model {
            self.openai_model = m.clone();
        }
        if let Some(m) = &update.anthropic_model {
            self.anthropic_model = m.clone();
        }
        if let Some(m) = &update.groq_model {
            self.groq_model = m.clone();
        }
    }

    fn credentials(&self, provider: LLMProvider) -> Option<ResolvedProvider> {
        let (key, model) = match provider {
            LLMProvider::OpenAI => (&self.openai_api_key, &self.openai_model),
            LLMProvider::Anthropic => (&self.anthropic_api_key, &self.anthropic_model),
            LLMProvider::Groq => (&self.groq_api_key, &self.groq_model),
        };
        key.as_ref().map(|k| ResolvedProvider {
            provider,
            model: model.clone(),
            api_key: k.clone(),
        })
    }

    /// Resolve the default provider: an explicit preference, or in auto
    /// mode the first configured of Anthropic, Groq, OpenAI.
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        if self.preferred_provider != "auto" {
            return LLMProvider::parse(&self.preferred_provider)
                .and_then(|p| self.credentials(p));
        }

        [LLMProvider::Anthropic, LLMProvider::Groq, LLMProvider::OpenAI]
            .into_iter()
            .find_map(|p| self.credentials(p))
    }

    /// Build the public config response (no API keys exposed).
    pub fn to_response(&self) -> LLMConfigResponse {
        let resolved = self.resolve_provider();
        LLMConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            groq_configured: self.groq_api_key.is_some(),
            openai_model: self.openai_model.clone(),
            anthropic_model: self.anthropic_model.clone(),
            groq_model: self.groq_model.clone(),
            active_provider: resolved.as_ref().map(|r| r.provider.to_string()),
            active_model: resolved.map(|r| r.model),
        }
    }
}

fn merge_key(slot: &mut Option<String>, update: &Option<String>) {
    if let Some(k) = update {
        *slot = if k.trim().is_empty() { None } else { Some(k.trim().to_string()) };
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
