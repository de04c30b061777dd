//! Topic analysis types shared by the store, matcher, LLM client and resolver.

use serde::{Deserialize, Serialize};

/// Which resolution strategy produced an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    /// Served from the persisted topic store.
    Database,
    /// Synthesized from a pattern category template.
    Pattern,
    /// Generated by the configured LLM provider.
    Llm,
    /// Generic placeholder; never persisted.
    Fallback,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Pattern => "pattern",
            Self::Llm => "llm",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResolutionSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "database" => Ok(Self::Database),
            "pattern" => Ok(Self::Pattern),
            "llm" => Ok(Self::Llm),
            "fallback" => Ok(Self::Fallback),
            other => Err(crate::Error::Internal(format!(
                "unknown resolution source: {}",
                other
            ))),
        }
    }
}

/// An affiliate program mentioned alongside a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateProgram {
    pub name: String,
    #[serde(default)]
    pub commission_description: String,
    #[serde(default)]
    pub network_guess: String,
}

/// One resolved analysis for a normalized topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAnalysis {
    pub topic: String,
    pub source: ResolutionSource,
    pub related_areas: Vec<String>,
    pub affiliate_programs: Vec<AffiliateProgram>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub last_accessed_at: i64,
    pub hit_count: i64,
}

impl TopicAnalysis {
    /// A freshly produced analysis, stamped now with a hit count of 1.
    pub fn new(
        topic: impl Into<String>,
        source: ResolutionSource,
        related_areas: Vec<String>,
        affiliate_programs: Vec<AffiliateProgram>,
    ) -> Self {
        let now = now_millis();
        Self {
            topic: topic.into(),
            source,
            related_areas,
            affiliate_programs,
            created_at: now,
            last_accessed_at: now,
            hit_count: 1,
        }
    }

    /// Minimal generic analysis used when every other strategy fails.
    pub fn fallback(topic: impl Into<String>) -> Self {
        Self::new(
            topic,
            ResolutionSource::Fallback,
            Vec::new(),
            vec![AffiliateProgram {
                name: "No specific programs found".into(),
                commission_description:
                    "Analysis is temporarily unavailable for this topic; try again later or search the major affiliate networks directly."
                        .into(),
                network_guess: "Amazon Associates, ShareASale, CJ Affiliate".into(),
            }],
        )
    }
}

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
