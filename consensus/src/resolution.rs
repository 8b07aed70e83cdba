//! Consensus resolver: turns accepted votes and finished debates into
//! reporting-level [`Discussion`] records.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::debate::{ConsensusType, DebateResult};
use crate::opinion::Severity;
use crate::voting::{ConsensusDecision, LocationGroup};

/// Reporting severity, ranked `harshly_critical > critical > warning > suggestion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionSeverity {
    Suggestion,
    Warning,
    Critical,
    HarshlyCritical,
}

impl DiscussionSeverity {
    /// Fixed rank, higher is harsher.
    pub fn rank(self) -> u8 {
        match self {
            Self::Suggestion => 1,
            Self::Warning => 2,
            Self::Critical => 3,
            Self::HarshlyCritical => 4,
        }
    }

    /// Map a verdict severity to a reporting severity.
    ///
    /// Only a critical verdict with unanimous, strong backing is escalated
    /// to `harshly_critical`.
    pub fn from_verdict(severity: Severity, strong_backing: bool) -> Self {
        match severity {
            Severity::Critical if strong_backing => Self::HarshlyCritical,
            Severity::Critical => Self::Critical,
            Severity::Major => Self::Warning,
            Severity::Minor | Severity::Nitpick => Self::Suggestion,
        }
    }
}

impl std::fmt::Display for DiscussionSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Suggestion => write!(f, "suggestion"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::HarshlyCritical => write!(f, "harshly_critical"),
        }
    }
}

/// Discussion lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionStatus {
    /// Settled by vote or by a debate that reached consensus.
    Resolved,
    /// Debate ended without consensus; severity is a best effort.
    Disputed,
}

/// How a discussion's severity was settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum ResolutionBasis {
    Vote {
        confidence: f64,
        weak: bool,
    },
    Debate {
        debate_id: String,
        consensus_type: ConsensusType,
        agreement: f64,
        rounds: u32,
    },
}

/// One piece of supporting evidence: a reviewer's opinion or final
/// debate argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub reviewer_id: String,
    pub line_start: u32,
    pub line_end: u32,
    /// Debate round the excerpt came from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    pub excerpt: String,
}

/// Reporting-level issue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: String,
    pub severity: DiscussionSeverity,
    pub title: String,
    pub file: String,
    pub line_start: u32,
    pub line_end: u32,
    #[serde(default)]
    pub category: String,
    pub evidence: Vec<EvidenceRef>,
    pub status: DiscussionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis: Option<ResolutionBasis>,
    /// Ids of discussions absorbed by deduplication.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<String>,
}

impl Discussion {
    pub fn line_range(&self) -> (u32, u32) {
        (self.line_start, self.line_end)
    }

    /// Recompute the line range as the union of all evidence ranges.
    pub(crate) fn fit_range_to_evidence(&mut self) {
        if let Some(start) = self.evidence.iter().map(|e| e.line_start).min() {
            self.line_start = start;
        }
        if let Some(end) = self.evidence.iter().map(|e| e.line_end).max() {
            self.line_end = end;
        }
    }
}

/// Source of discussion ids.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Sequential ids: `{prefix}-001`, `{prefix}-002`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: 1,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("disc")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{:03}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Build a discussion from an accepted vote.
///
/// Returns `None` for a `NeedsDebate` decision or an empty group.
pub fn resolve_consensus(
    group: &LocationGroup,
    decision: &ConsensusDecision,
    ids: &mut dyn IdGenerator,
) -> Option<Discussion> {
    let ConsensusDecision::Consensus {
        severity,
        confidence,
        voter_ids,
        weak,
    } = decision
    else {
        return None;
    };
    let first = group.opinions.first()?;

    let strong_backing = !weak && voter_ids.len() >= 2 && *confidence >= 1.0;
    let evidence: Vec<EvidenceRef> = group
        .opinions
        .iter()
        .map(|opinion| {
            let (line_start, line_end) = opinion.line_range();
            EvidenceRef {
                reviewer_id: opinion.reviewer_id.clone(),
                line_start,
                line_end,
                round: None,
                excerpt: opinion
                    .description
                    .clone()
                    .unwrap_or_else(|| opinion.title.clone()),
            }
        })
        .collect();

    let mut discussion = Discussion {
        id: ids.next_id(),
        severity: DiscussionSeverity::from_verdict(*severity, strong_backing),
        title: group.key.title.clone(),
        file: group.key.file.clone(),
        line_start: first.line,
        line_end: first.line,
        category: first.category.clone(),
        evidence,
        status: DiscussionStatus::Resolved,
        basis: Some(ResolutionBasis::Vote {
            confidence: *confidence,
            weak: *weak,
        }),
        merged_from: Vec::new(),
    };
    discussion.fit_range_to_evidence();

    debug!(
        id = %discussion.id,
        location = %group.key,
        severity = %discussion.severity,
        "Resolved from vote"
    );
    Some(discussion)
}

/// Build a discussion from a finished debate.
pub fn resolve_debate(result: &DebateResult, ids: &mut dyn IdGenerator) -> Discussion {
    let strong_backing = result.consensus_type == ConsensusType::Strong;
    let evidence: Vec<EvidenceRef> = result
        .participants
        .iter()
        .map(|participant| {
            let opinion = &participant.original_opinion;
            let (line_start, line_end) = opinion.line_range();
            let last_argued = participant.rounds().iter().rev().find(|r| !r.failed);
            let (round, excerpt) = match last_argued {
                Some(r) => (Some(r.round_number), r.argument.clone()),
                None => (
                    None,
                    opinion
                        .description
                        .clone()
                        .unwrap_or_else(|| opinion.title.clone()),
                ),
            };
            EvidenceRef {
                reviewer_id: participant.reviewer_id.clone(),
                line_start,
                line_end,
                round,
                excerpt,
            }
        })
        .collect();

    let category = result
        .participants
        .first()
        .map(|p| p.original_opinion.category.clone())
        .unwrap_or_default();

    let status = if result.consensus_type.is_reached() {
        DiscussionStatus::Resolved
    } else {
        DiscussionStatus::Disputed
    };

    let mut discussion = Discussion {
        id: ids.next_id(),
        severity: DiscussionSeverity::from_verdict(result.final_severity, strong_backing),
        title: result.location.title.clone(),
        file: result.location.file.clone(),
        line_start: result.location.line,
        line_end: result.location.line,
        category,
        evidence,
        status,
        basis: Some(ResolutionBasis::Debate {
            debate_id: result.debate_id.clone(),
            consensus_type: result.consensus_type,
            agreement: result.agreement,
            rounds: result.rounds_run,
        }),
        merged_from: Vec::new(),
    };
    discussion.fit_range_to_evidence();

    debug!(
        id = %discussion.id,
        location = %result.location,
        severity = %discussion.severity,
        status = ?discussion.status,
        "Resolved from debate"
    );
    discussion
}
