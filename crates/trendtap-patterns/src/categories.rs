//! Pattern category table: built-in defaults plus an optional `patterns.json` override.

use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trendtap_core::{AffiliateProgram, ResolutionSource, TopicAnalysis};

/// Analysis template copied into every topic the category matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTemplate {
    pub related_areas: Vec<String>,
    pub affiliate_programs: Vec<AffiliateProgram>,
}

/// A curated keyword set and the analysis it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCategory {
    pub name: String,
    /// Lowercased, deduplicated, in declaration order.
    pub keywords: Vec<String>,
    pub template: CategoryTemplate,
}

impl PatternCategory {
    pub fn new(name: impl Into<String>, keywords: &[&str], template: CategoryTemplate) -> Self {
        let mut category = Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            template,
        };
        category.normalize_keywords();
        category
    }

    fn normalize_keywords(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.keywords = self
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();
    }

    /// Number of keywords occurring as substrings of the normalized topic.
    pub fn score(&self, normalized_topic: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| normalized_topic.contains(k.as_str()))
            .count()
    }

    /// Build an analysis for `topic` from this category's template.
    ///
    /// The analysis is keyed by the literal topic, not the category name.
    pub fn synthesize(&self, topic: &str) -> TopicAnalysis {
        TopicAnalysis::new(
            topic,
            ResolutionSource::Pattern,
            self.template.related_areas.clone(),
            self.template.affiliate_programs.clone(),
        )
    }
}

fn program(name: &str, commission: &str, network: &str) -> AffiliateProgram {
    AffiliateProgram {
        name: name.into(),
        commission_description: commission.into(),
        network_guess: network.into(),
    }
}

fn areas(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

static DEFAULT_CATEGORIES: Lazy<Vec<PatternCategory>> = Lazy::new(|| {
    vec![
        PatternCategory::new(
            "coffee",
            &["coffee", "espresso", "latte", "cappuccino", "barista", "grinder", "french press"],
            CategoryTemplate {
                related_areas: areas(&[
                    "espresso machines",
                    "coffee grinders",
                    "specialty coffee beans",
                    "cold brew equipment",
                    "latte art accessories",
                ]),
                affiliate_programs: vec![
                    program("Amazon Associates", "1-4.5% on kitchen and grocery", "Amazon"),
                    program("Breville", "Around 5% per sale", "Impact"),
                    program("Trade Coffee", "Per-subscription bounty", "Impact"),
                ],
            },
        ),
        PatternCategory::new(
            "fitness",
            &["fitness", "workout", "gym", "exercise", "protein", "yoga", "dumbbell", "kettlebell", "running"],
            CategoryTemplate {
                related_areas: areas(&[
                    "home gym equipment",
                    "supplements",
                    "activewear",
                    "fitness trackers",
                    "online training programs",
                ]),
                affiliate_programs: vec![
                    program("Bodybuilding.com", "Up to 5% per sale", "Impact"),
                    program("Rogue Fitness", "Tiered commission on equipment", "AvantLink"),
                    program("Gymshark", "Around 10% on apparel", "Rakuten"),
                ],
            },
        ),
        PatternCategory::new(
            "tech",
            &["laptop", "smartphone", "headphones", "camera", "gadget", "monitor", "keyboard", "tablet", "smartwatch"],
            CategoryTemplate {
                related_areas: areas(&[
                    "consumer electronics reviews",
                    "accessories",
                    "smart home devices",
                    "productivity setups",
                ]),
                affiliate_programs: vec![
                    program("Amazon Associates", "1-4% on electronics", "Amazon"),
                    program("Best Buy", "0.5-1% per sale", "Impact"),
                    program("B&H Photo", "Up to 2% per sale", "Impact"),
                ],
            },
        ),
        PatternCategory::new(
            "personal finance",
            &["credit card", "investing", "budget", "savings", "crypto", "stock market", "retirement", "loan", "insurance"],
            CategoryTemplate {
                related_areas: areas(&[
                    "budgeting apps",
                    "brokerage accounts",
                    "credit card rewards",
                    "high-yield savings",
                ]),
                affiliate_programs: vec![
                    program("Robinhood", "Flat bounty per funded account", "Impact"),
                    program("Credit Karma", "Per-signup bounty", "CJ Affiliate"),
                    program("YNAB", "Per-subscription bounty", "Direct"),
                ],
            },
        ),
        PatternCategory::new(
            "travel",
            &["travel", "hotel", "flight", "vacation", "backpack", "luggage", "cruise", "resort"],
            CategoryTemplate {
                related_areas: areas(&[
                    "travel gear",
                    "booking platforms",
                    "travel insurance",
                    "destination guides",
                ]),
                affiliate_programs: vec![
                    program("Booking.com", "25-40% of Booking's commission", "Direct"),
                    program("Expedia", "Up to 4% on hotels", "CJ Affiliate"),
                    program("World Nomads", "10% per policy", "CJ Affiliate"),
                ],
            },
        ),
        PatternCategory::new(
            "beauty",
            &["skincare", "makeup", "beauty", "serum", "moisturizer", "haircare", "cosmetic"],
            CategoryTemplate {
                related_areas: areas(&[
                    "skincare routines",
                    "clean beauty",
                    "hair tools",
                    "fragrance",
                ]),
                affiliate_programs: vec![
                    program("Sephora", "5-10% per sale", "Rakuten"),
                    program("Ulta Beauty", "2-5% per sale", "Impact"),
                    program("Amazon Associates", "Up to 3% on beauty", "Amazon"),
                ],
            },
        ),
        PatternCategory::new(
            "pets",
            &["dog", "puppy", "kitten", "cat food", "cat litter", "pets", "pet food", "aquarium"],
            CategoryTemplate {
                related_areas: areas(&[
                    "pet food",
                    "pet insurance",
                    "training supplies",
                    "pet tech",
                ]),
                affiliate_programs: vec![
                    program("Chewy", "Per new-customer bounty", "CJ Affiliate"),
                    program("Petco", "Up to 5% per sale", "CJ Affiliate"),
                    program("Lemonade Pet", "Per-policy bounty", "Impact"),
                ],
            },
        ),
        PatternCategory::new(
            "gaming",
            &["gaming", "console", "playstation", "xbox", "nintendo", "esports", "gpu"],
            CategoryTemplate {
                related_areas: areas(&[
                    "gaming peripherals",
                    "pc builds",
                    "game subscriptions",
                    "streaming gear",
                ]),
                affiliate_programs: vec![
                    program("Amazon Associates", "1-3% on video games", "Amazon"),
                    program("Newegg", "Up to 1% per sale", "Rakuten"),
                    program("Humble Bundle", "Around 5% per sale", "Impact"),
                ],
            },
        ),
    ]
});

/// Built-in category table, in registration order.
pub fn default_categories() -> Vec<PatternCategory> {
    DEFAULT_CATEGORIES.clone()
}

/// Load the deploy-time category table.
///
/// A readable, well-formed `patterns.json` replaces the built-in table
/// entirely; otherwise the defaults are used.
pub fn load_categories(path: &Path) -> Vec<PatternCategory> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(_) => return default_categories(),
    };

    match serde_json::from_str::<Vec<PatternCategory>>(&data) {
        Ok(mut categories) => {
            for category in &mut categories {
                category.normalize_keywords();
            }
            info!(
                "Loaded {} pattern categories from {}",
                categories.len(),
                path.display()
            );
            categories
        }
        Err(e) => {
            warn!(
                "Ignoring malformed pattern table {}: {}; using defaults",
                path.display(),
                e
            );
            default_categories()
        }
    }
}
