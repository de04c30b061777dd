//! Keyword pattern matcher.

use crate::categories::{default_categories, PatternCategory};

/// Maps a normalized topic to the best-scoring pattern category.
///
/// Pure and deterministic for a given table: the category with the most
/// keyword substring hits wins, and ties go to the first-registered category.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    categories: Vec<PatternCategory>,
}

impl PatternMatcher {
    pub fn new(categories: Vec<PatternCategory>) -> Self {
        Self { categories }
    }

    /// Matcher over the built-in category table.
    pub fn with_defaults() -> Self {
        Self::new(default_categories())
    }

    /// Registered categories, in registration order.
    pub fn categories(&self) -> &[PatternCategory] {
        &self.categories
    }

    /// Best-scoring category, or `None` if every category scores zero.
    pub fn match_topic(&self, normalized_topic: &str) -> Option<&PatternCategory> {
        let mut best: Option<(&PatternCategory, usize)> = None;
        for category in &self.categories {
            let score = category.score(normalized_topic);
            // Strictly greater keeps the earliest category on ties.
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((category, score));
            }
        }
        best.map(|(category, _)| category)
    }
}
