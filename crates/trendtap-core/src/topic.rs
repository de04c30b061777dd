//! Topic normalization: the cache key for every stored analysis.

use crate::error::{Error, Result};

/// Trim, lowercase and collapse internal whitespace.
///
/// Fails with [`Error::InvalidInput`] when the normalized topic is empty or
/// longer than `max_len` characters.
pub fn normalize_topic(raw: &str, max_len: usize) -> Result<String> {
    let normalized = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    if normalized.is_empty() {
        return Err(Error::InvalidInput("topic must not be empty".into()));
    }

    let len = normalized.chars().count();
    if len > max_len {
        return Err(Error::InvalidInput(format!(
            "topic is {} characters, maximum is {}",
            len, max_len
        )));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let topic = normalize_topic("  Best Coffee Machines ", 200).unwrap();
        assert_eq!(topic, "best coffee machines");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        let topic = normalize_topic("home\t\tgym   \n equipment", 200).unwrap();
        assert_eq!(topic, "home gym equipment");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_topic("  Keto   DIET Recipes", 200).unwrap();
        let twice = normalize_topic(&once, 200).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_topic_rejected() {
        assert!(matches!(normalize_topic("", 200), Err(Error::InvalidInput(_))));
        assert!(matches!(normalize_topic("   \t ", 200), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_oversized_topic_rejected() {
        let long = "a".repeat(500);
        assert!(matches!(normalize_topic(&long, 200), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let topic = "é".repeat(10);
        assert!(normalize_topic(&topic, 10).is_ok());
    }
}
