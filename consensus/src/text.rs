//! Token-set similarity shared by early stopping and deduplication.

use std::collections::HashSet;

/// Lower-cased alphanumeric tokens of `text`.
pub fn token_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Jaccard similarity of two token sets.
///
/// Two empty sets are identical (1.0): an unchanged empty argument is as
/// stable as an unchanged non-empty one.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Jaccard similarity of the token sets of two strings.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text() {
        assert_eq!(text_similarity("Null deref in parse()", "null DEREF in parse"), 1.0);
    }

    #[test]
    fn test_partial_overlap() {
        let sim = text_similarity("SQL Injection", "SQL Injection Risk");
        assert!((sim - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint() {
        assert_eq!(text_similarity("memory leak", "style nit"), 0.0);
    }

    #[test]
    fn test_empty_sets() {
        assert_eq!(text_similarity("", "  "), 1.0);
        assert_eq!(text_similarity("", "something"), 0.0);
    }
}
