//! Majority voting gate: accept a location's verdict or escalate it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::grouping::LocationGroup;
use crate::config::VotingConfig;
use crate::opinion::{Opinion, Severity};

/// Outcome of voting on one location group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ConsensusDecision {
    /// The group agrees well enough; no debate.
    Consensus {
        severity: Severity,
        /// Fraction of voters holding the majority severity.
        confidence: f64,
        voter_ids: Vec<String>,
        /// Accepted without real majority arithmetic (single voter or
        /// classifier fallback).
        #[serde(default)]
        weak: bool,
    },
    /// The group must go through the trigger classifier.
    NeedsDebate {
        reason: String,
        triggering_opinions: Vec<Opinion>,
    },
}

impl ConsensusDecision {
    /// Weak consensus for `group`: plurality severity, no threshold applied.
    pub fn weak(group: &LocationGroup) -> Self {
        let tally = group.tally();
        let severity = tally
            .plurality()
            .map(|(severity, _)| severity)
            .unwrap_or(Severity::Nitpick);
        Self::Consensus {
            severity,
            confidence: tally.agreement(),
            voter_ids: group.reviewer_ids(),
            weak: true,
        }
    }

    pub fn is_consensus(&self) -> bool {
        matches!(self, Self::Consensus { .. })
    }

    pub fn needs_debate(&self) -> bool {
        matches!(self, Self::NeedsDebate { .. })
    }

    /// Accepted severity, if this is a consensus.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Consensus { severity, .. } => Some(*severity),
            Self::NeedsDebate { .. } => None,
        }
    }
}

/// Majority voting gate.
#[derive(Debug, Clone, Default)]
pub struct MajorityGate {
    config: VotingConfig,
}

impl MajorityGate {
    pub fn new(config: VotingConfig) -> Self {
        Self { config }
    }

    /// Gate with default settings and a custom threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self::new(VotingConfig {
            threshold,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    /// Decide whether `group` has consensus or must be escalated.
    pub fn decide(&self, group: &LocationGroup) -> ConsensusDecision {
        let tally = group.tally();
        let Some((majority, count)) = tally.plurality() else {
            // Empty groups are filtered upstream; treat as a weak nitpick.
            return ConsensusDecision::weak(group);
        };
        let total = tally.total();
        let confidence = count as f64 / total as f64;

        if total == 1 {
            debug!(location = %group.key, %majority, "Single opinion accepted as weak consensus");
            return ConsensusDecision::Consensus {
                severity: majority,
                confidence,
                voter_ids: group.reviewer_ids(),
                weak: true,
            };
        }

        if self.low_confidence_override(group, majority, confidence) {
            debug!(
                location = %group.key,
                confidence,
                "Near-unanimous major verdict with unsure voters, escalating"
            );
            return ConsensusDecision::NeedsDebate {
                reason: format!(
                    "Near-unanimous {} verdict on {} but at least one reviewer is below {:.0}% confidence",
                    majority,
                    group.key,
                    self.config.low_confidence * 100.0
                ),
                triggering_opinions: group.opinions.clone(),
            };
        }

        if confidence >= self.config.threshold {
            debug!(location = %group.key, %majority, confidence, "Consensus reached");
            return ConsensusDecision::Consensus {
                severity: majority,
                confidence,
                voter_ids: group.reviewer_ids(),
                weak: false,
            };
        }

        debug!(
            location = %group.key,
            confidence,
            threshold = self.config.threshold,
            "Agreement below threshold, escalating"
        );
        ConsensusDecision::NeedsDebate {
            reason: format!(
                "Conflicting severity opinions on {}: {:.0}% agreement is below the {:.0}% threshold",
                group.key,
                confidence * 100.0,
                self.config.threshold * 100.0
            ),
            triggering_opinions: group.opinions.clone(),
        }
    }

    fn low_confidence_override(
        &self,
        group: &LocationGroup,
        majority: Severity,
        confidence: f64,
    ) -> bool {
        majority == Severity::Major
            && confidence >= self.config.near_unanimous
            && group
                .opinions
                .iter()
                .any(|o| o.severity == Severity::Major && o.confidence < self.config.low_confidence)
    }
}

/// Decide consensus for one group with default settings and `threshold`.
pub fn decide_consensus(group: &LocationGroup, threshold: f64) -> ConsensusDecision {
    MajorityGate::with_threshold(threshold).decide(group)
}
