//! Pattern categories: a curated keyword-to-template table consulted
//! before any LLM call.

pub mod categories;
pub mod matcher;

pub use categories::{default_categories, load_categories, CategoryTemplate, PatternCategory};
pub use matcher::PatternMatcher;
