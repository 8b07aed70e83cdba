//! Debate trigger classifier. Decides which escalated locations debate.
//!
//! Runs once over every group that failed the majority gate. Checks run in
//! a fixed order per location and the first match wins; a location that
//! matches nothing is accepted as a weak consensus instead of being
//! deferred.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::gate::ConsensusDecision;
use super::grouping::LocationGroup;
use crate::config::VotingConfig;
use crate::opinion::{LocationKey, Opinion, Severity};

/// Minimum opinions at one location for the "many eyes" trigger.
const MANY_REVIEWERS: usize = 3;

/// Why a location was sent to debate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// At least one reviewer called it critical.
    CriticalWithoutMajority,
    /// Reviewers disagree on severity.
    ConflictingSeverity,
    /// A major finding from an unsure reviewer.
    LowConfidenceMajor,
    /// Enough reviewers flagged the spot that it deserves a second look.
    ManyReviewers { count: usize },
}

impl TriggerReason {
    /// Human-readable reason for `key`.
    pub fn describe(&self, key: &LocationKey) -> String {
        match self {
            Self::CriticalWithoutMajority => {
                "critical issue(s) without strong majority".to_string()
            }
            Self::ConflictingSeverity => {
                format!("conflicting severity opinions on {}:{}", key.file, key.line)
            }
            Self::LowConfidenceMajor => "major issue(s) with low confidence".to_string(),
            Self::ManyReviewers { count } => {
                format!("{} reviewers identified issues at this location", count)
            }
        }
    }
}

/// A location the classifier sent to debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTrigger {
    pub key: LocationKey,
    pub reason: TriggerReason,
    pub description: String,
    pub opinions: Vec<Opinion>,
}

/// Global classifier output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateTrigger {
    /// True iff at least one location triggered.
    pub required: bool,
    /// Combined reason across triggered locations.
    pub reason: String,
    /// Union of opinions from triggered locations.
    pub triggering_opinions: Vec<Opinion>,
    /// Per-location triggers, in input order.
    pub triggers: Vec<LocationTrigger>,
    /// Locations that matched no check and were accepted as weak consensus.
    pub fallback: Vec<(LocationKey, ConsensusDecision)>,
}

/// Classifies escalated location groups.
#[derive(Debug, Clone, Default)]
pub struct DebateTriggerClassifier {
    config: VotingConfig,
}

impl DebateTriggerClassifier {
    pub fn new(config: VotingConfig) -> Self {
        Self { config }
    }

    /// First matching trigger for one group, if any.
    ///
    /// Groups with fewer than two opinions never trigger.
    pub fn classify_location(&self, group: &LocationGroup) -> Option<TriggerReason> {
        if group.len() < 2 {
            return None;
        }

        if group.opinions.iter().any(|o| o.severity == Severity::Critical) {
            return Some(TriggerReason::CriticalWithoutMajority);
        }

        if group.tally().distinct() > 1 {
            return Some(TriggerReason::ConflictingSeverity);
        }

        if group
            .opinions
            .iter()
            .any(|o| o.severity == Severity::Major && o.confidence < self.config.low_confidence)
        {
            return Some(TriggerReason::LowConfidenceMajor);
        }

        if group.len() >= MANY_REVIEWERS {
            return Some(TriggerReason::ManyReviewers { count: group.len() });
        }

        None
    }

    /// Classify every escalated group.
    pub fn classify(&self, groups: &[LocationGroup]) -> DebateTrigger {
        let mut triggers = Vec::new();
        let mut fallback = Vec::new();

        for group in groups {
            match self.classify_location(group) {
                Some(reason) => {
                    let description = reason.describe(&group.key);
                    debug!(location = %group.key, reason = %description, "Debate triggered");
                    triggers.push(LocationTrigger {
                        key: group.key.clone(),
                        reason,
                        description,
                        opinions: group.opinions.clone(),
                    });
                }
                None => {
                    debug!(location = %group.key, "No trigger matched, accepting weak consensus");
                    fallback.push((group.key.clone(), ConsensusDecision::weak(group)));
                }
            }
        }

        let mut seen: HashSet<(String, LocationKey)> = HashSet::new();
        let triggering_opinions: Vec<Opinion> = triggers
            .iter()
            .flat_map(|t| t.opinions.iter())
            .filter(|o| seen.insert((o.reviewer_id.clone(), o.key())))
            .cloned()
            .collect();

        let required = !triggers.is_empty();
        let reason = if required {
            triggers
                .iter()
                .map(|t| t.description.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        } else {
            "no debate required".to_string()
        };

        info!(
            escalated = groups.len(),
            triggered = triggers.len(),
            fallback = fallback.len(),
            "Debate trigger classification complete"
        );

        DebateTrigger {
            required,
            reason,
            triggering_opinions,
            triggers,
            fallback,
        }
    }
}

/// Classify escalated groups with default settings.
pub fn classify_debate_need(groups: &[LocationGroup]) -> DebateTrigger {
    DebateTriggerClassifier::default().classify(groups)
}
