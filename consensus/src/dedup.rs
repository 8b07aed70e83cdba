//! Post-resolution duplicate discussion merging.
//!
//! A fuzzier second grouping pass over all resolved discussions: two
//! discussions are duplicates when they share a file, their line ranges
//! overlap and their titles are similar by token Jaccard.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DedupConfig;
use crate::resolution::Discussion;
use crate::text::{jaccard, token_set};

/// Result of a deduplication pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupOutcome {
    pub deduplicated: Vec<Discussion>,
    /// Number of discussions absorbed into a primary.
    pub merged_count: usize,
}

/// Inclusive range overlap.
pub fn ranges_overlap(a: (u32, u32), b: (u32, u32)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Merges near-duplicate discussions.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Merge duplicates, keeping the first-seen discussion of each cluster
    /// as primary. Order of primaries is preserved.
    pub fn deduplicate(&self, discussions: Vec<Discussion>) -> DedupOutcome {
        let titles: Vec<HashSet<String>> =
            discussions.iter().map(|d| token_set(&d.title)).collect();
        let mut absorbed = vec![false; discussions.len()];
        let mut clusters: Vec<(usize, Vec<usize>)> = Vec::new();

        for i in 0..discussions.len() {
            if absorbed[i] {
                continue;
            }
            let mut members = Vec::new();
            for j in (i + 1)..discussions.len() {
                if absorbed[j] {
                    continue;
                }
                if self.is_duplicate(&discussions[i], &discussions[j], &titles[i], &titles[j]) {
                    absorbed[j] = true;
                    members.push(j);
                }
            }
            clusters.push((i, members));
        }

        let mut slots: Vec<Option<Discussion>> = discussions.into_iter().map(Some).collect();
        let mut deduplicated = Vec::with_capacity(clusters.len());
        let mut merged_count = 0;

        for (primary_index, members) in clusters {
            let Some(mut primary) = slots[primary_index].take() else {
                continue;
            };
            let duplicates: Vec<Discussion> =
                members.iter().filter_map(|&j| slots[j].take()).collect();
            if !duplicates.is_empty() {
                merged_count += duplicates.len();
                merge_into(&mut primary, duplicates);
            }
            deduplicated.push(primary);
        }

        if merged_count > 0 {
            info!(
                merged = merged_count,
                remaining = deduplicated.len(),
                "Merged duplicate discussions"
            );
        }

        DedupOutcome {
            deduplicated,
            merged_count,
        }
    }

    fn is_duplicate(
        &self,
        a: &Discussion,
        b: &Discussion,
        a_title: &HashSet<String>,
        b_title: &HashSet<String>,
    ) -> bool {
        a.file == b.file
            && ranges_overlap(a.line_range(), b.line_range())
            && jaccard(a_title, b_title) > self.config.title_similarity
    }
}

fn merge_into(primary: &mut Discussion, duplicates: Vec<Discussion>) {
    let count = duplicates.len();
    for duplicate in duplicates {
        debug!(
            primary = %primary.id,
            duplicate = %duplicate.id,
            "Merging duplicate discussion"
        );
        primary.line_start = primary.line_start.min(duplicate.line_start);
        primary.line_end = primary.line_end.max(duplicate.line_end);
        if duplicate.severity.rank() > primary.severity.rank() {
            primary.severity = duplicate.severity;
        }
        for evidence in duplicate.evidence {
            if !primary.evidence.contains(&evidence) {
                primary.evidence.push(evidence);
            }
        }
        primary.merged_from.push(duplicate.id);
        primary.merged_from.extend(duplicate.merged_from);
    }
    primary.title = format!("{} (merged with {} duplicate(s))", primary.title, count);
}

/// Deduplicate with default settings.
pub fn deduplicate(discussions: Vec<Discussion>) -> DedupOutcome {
    Deduplicator::default().deduplicate(discussions)
}
