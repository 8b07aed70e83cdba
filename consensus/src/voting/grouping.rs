//! Exact `(file, line, title)` grouping of opinions.
//!
//! Grouping is deliberately strict: two reviewers reporting different
//! problems on the same line stay in separate groups until after
//! resolution, where `dedup` applies the fuzzy merge.
//!
//! Each reviewer holds at most one vote per key. When a reviewer reports
//! the same key more than once, the first opinion is kept and later ones
//! are dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::opinion::{LocationKey, Opinion, SeverityTally};

/// Opinions sharing one exact location key, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationGroup {
    pub key: LocationKey,
    pub opinions: Vec<Opinion>,
}

impl LocationGroup {
    /// Create an empty group for `key`.
    pub fn new(key: LocationKey) -> Self {
        Self {
            key,
            opinions: Vec::new(),
        }
    }

    /// Build a group from opinions that are expected to share a key.
    ///
    /// Returns `None` for an empty list or when any opinion's key differs
    /// from the first one's. Repeat opinions from one reviewer are dropped.
    pub fn from_opinions(opinions: Vec<Opinion>) -> Option<Self> {
        let key = opinions.first()?.key();
        if opinions.iter().any(|o| o.key() != key) {
            return None;
        }
        let mut group = Self::new(key);
        for opinion in opinions {
            group.push(opinion);
        }
        Some(group)
    }

    /// Append an opinion. Returns `false` and leaves the group unchanged if
    /// the key differs or the reviewer already has an opinion here.
    pub fn push(&mut self, opinion: Opinion) -> bool {
        if opinion.key() != self.key || self.has_reviewer(&opinion.reviewer_id) {
            return false;
        }
        self.opinions.push(opinion);
        true
    }

    pub fn has_reviewer(&self, reviewer_id: &str) -> bool {
        self.opinions.iter().any(|o| o.reviewer_id == reviewer_id)
    }

    pub fn len(&self) -> usize {
        self.opinions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opinions.is_empty()
    }

    pub fn tally(&self) -> SeverityTally {
        SeverityTally::from_opinions(&self.opinions)
    }

    pub fn reviewer_ids(&self) -> Vec<String> {
        self.opinions.iter().map(|o| o.reviewer_id.clone()).collect()
    }
}

/// Group opinions by exact location key, preserving first-seen order.
pub fn group_by_location<I>(opinions: I) -> Vec<LocationGroup>
where
    I: IntoIterator<Item = Opinion>,
{
    let mut index: HashMap<LocationKey, usize> = HashMap::new();
    let mut groups: Vec<LocationGroup> = Vec::new();

    for opinion in opinions {
        let key = opinion.key();
        match index.get(&key) {
            Some(&i) => {
                let reviewer = opinion.reviewer_id.clone();
                if !groups[i].push(opinion) {
                    debug!(
                        location = %key,
                        reviewer = %reviewer,
                        "Reviewer reported the same location twice, keeping the first opinion"
                    );
                }
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(LocationGroup {
                    key,
                    opinions: vec![opinion],
                });
            }
        }
    }

    debug!(groups = groups.len(), "Grouped opinions by location");
    groups
}

/// Group `(reviewer_id, opinion)` pairs, stamping each opinion with its reviewer.
pub fn group_reviewer_opinions<I>(pairs: I) -> Vec<LocationGroup>
where
    I: IntoIterator<Item = (String, Opinion)>,
{
    group_by_location(pairs.into_iter().map(|(reviewer_id, mut opinion)| {
        opinion.reviewer_id = reviewer_id;
        opinion
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opinion::Severity;

    #[test]
    fn test_empty_input() {
        assert!(group_by_location(Vec::new()).is_empty());
    }

    #[test]
    fn test_groups_by_exact_key() {
        let groups = group_by_location(vec![
            Opinion::new("a", Severity::Major, "db.rs", 10, "SQL injection"),
            Opinion::new("b", Severity::Critical, "db.rs", 10, "SQL injection"),
            Opinion::new("c", Severity::Minor, "db.rs", 10, "Unused import"),
            Opinion::new("d", Severity::Major, "db.rs", 11, "SQL injection"),
        ]);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0].reviewer_ids(), vec!["a", "b"]);
        assert_eq!(groups[1].key.title, "Unused import");
        assert_eq!(groups[2].key.line, 11);
    }

    #[test]
    fn test_every_opinion_lands_in_exactly_one_group() {
        let opinions: Vec<Opinion> = (0..10)
            .map(|i| {
                Opinion::new(
                    &format!("r{}", i % 3),
                    Severity::Minor,
                    "x.rs",
                    i % 4,
                    "title",
                )
            })
            .collect();
        let groups = group_by_location(opinions);
        let total: usize = groups.iter().map(|g| g.len()).sum();
        assert_eq!(total, 10);
        for group in &groups {
            assert!(group.opinions.iter().all(|o| o.key() == group.key));
        }
    }

    #[test]
    fn test_reviewer_pairs_are_stamped() {
        let groups = group_reviewer_opinions(vec![(
            "security-bot".to_string(),
            Opinion::new("", Severity::Critical, "auth.rs", 3, "Hardcoded secret"),
        )]);
        assert_eq!(groups[0].opinions[0].reviewer_id, "security-bot");
    }

    #[test]
    fn test_push_rejects_foreign_key() {
        let op = Opinion::new("a", Severity::Minor, "a.rs", 1, "t");
        let mut group = LocationGroup::new(op.key());
        assert!(group.push(op));
        assert!(!group.push(Opinion::new("b", Severity::Minor, "a.rs", 2, "t")));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_repeat_reviewer_keeps_first_opinion() {
        let groups = group_by_location(vec![
            Opinion::new("a", Severity::Major, "x.rs", 5, "Leak"),
            Opinion::new("a", Severity::Major, "x.rs", 5, "Leak"),
            Opinion::new("a", Severity::Critical, "x.rs", 5, "Leak"),
            Opinion::new("b", Severity::Minor, "x.rs", 5, "Leak"),
        ]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0].reviewer_ids(), vec!["a", "b"]);
        assert_eq!(groups[0].opinions[0].severity, Severity::Major);

        // One vote each: a 1/1 split is not a 75% majority.
        let decision = crate::voting::decide_consensus(&groups[0], 0.75);
        assert!(decision.needs_debate());
    }

    #[test]
    fn test_push_rejects_repeat_reviewer() {
        let op = Opinion::new("a", Severity::Minor, "a.rs", 1, "t");
        let mut group = LocationGroup::new(op.key());
        assert!(group.push(op));
        assert!(!group.push(Opinion::new("a", Severity::Critical, "a.rs", 1, "t")));
        assert_eq!(group.len(), 1);
        assert_eq!(group.opinions[0].severity, Severity::Minor);

        let rebuilt = LocationGroup::from_opinions(vec![
            Opinion::new("a", Severity::Minor, "a.rs", 1, "t"),
            Opinion::new("a", Severity::Critical, "a.rs", 1, "t"),
        ])
        .unwrap();
        assert_eq!(rebuilt.len(), 1);
    }

    #[test]
    fn test_from_opinions_requires_shared_key() {
        assert!(LocationGroup::from_opinions(vec![]).is_none());
        assert!(LocationGroup::from_opinions(vec![
            Opinion::new("a", Severity::Minor, "a.rs", 1, "t"),
            Opinion::new("b", Severity::Minor, "b.rs", 1, "t"),
        ])
        .is_none());
    }
}
