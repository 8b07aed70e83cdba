//! Debate state machine: phases, transitions, participants and rounds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::opinion::{LocationKey, Opinion, Severity};

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Session created but no round started.
    Idle,
    /// A round is in progress.
    Arguing,
    /// Agreement reached a consensus threshold.
    Resolved,
    /// Arguments stopped changing; no new insight.
    Stalled,
    /// Round budget used up without consensus.
    Exhausted,
}

impl DebatePhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Stalled | Self::Exhausted)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Idle => &[Self::Arguing],
            Self::Arguing => &[Self::Arguing, Self::Resolved, Self::Stalled, Self::Exhausted],
            Self::Resolved | Self::Stalled | Self::Exhausted => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Arguing => write!(f, "arguing"),
            Self::Resolved => write!(f, "resolved"),
            Self::Stalled => write!(f, "stalled"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// One participant's contribution to one round. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRound {
    /// Round number (1-indexed).
    pub round_number: u32,
    pub argument: String,
    pub confidence: f64,
    pub severity: Severity,
    /// Whether the participant moved away from its previous severity.
    pub changed_position: bool,
    /// Informational argument quality (0.0–1.0).
    pub quality_score: f64,
    /// The backend or parser failed and the prior stance was carried forward.
    #[serde(default)]
    pub failed: bool,
}

/// A reviewer taking part in one debate.
///
/// Rounds are append-only: the list can only grow through the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateParticipant {
    pub reviewer_id: String,
    pub original_opinion: Opinion,
    rounds: Vec<DebateRound>,
}

impl DebateParticipant {
    pub fn new(original_opinion: Opinion) -> Self {
        Self {
            reviewer_id: original_opinion.reviewer_id.clone(),
            original_opinion,
            rounds: Vec::new(),
        }
    }

    pub fn rounds(&self) -> &[DebateRound] {
        &self.rounds
    }

    pub fn last_round(&self) -> Option<&DebateRound> {
        self.rounds.last()
    }

    /// Severity held after the latest round (or the original one).
    pub fn current_severity(&self) -> Severity {
        self.last_round()
            .map(|r| r.severity)
            .unwrap_or(self.original_opinion.severity)
    }

    /// Confidence held after the latest round (or the original one).
    pub fn current_confidence(&self) -> f64 {
        self.last_round()
            .map(|r| r.confidence)
            .unwrap_or(self.original_opinion.confidence)
    }

    /// Mean quality score across rounds (0.0 with no rounds).
    pub fn mean_quality(&self) -> f64 {
        if self.rounds.is_empty() {
            return 0.0;
        }
        self.rounds.iter().map(|r| r.quality_score).sum::<f64>() / self.rounds.len() as f64
    }

    pub(crate) fn record(&mut self, round: DebateRound) {
        self.rounds.push(round);
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// Phase and round bookkeeping for one debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub id: String,
    pub location: LocationKey,
    pub phase: DebatePhase,
    /// Rounds started so far.
    pub current_round: u32,
    pub max_rounds: u32,
    pub transitions: Vec<DebateTransition>,
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    pub fn new(id: &str, location: LocationKey, max_rounds: u32) -> Self {
        Self {
            id: id.to_string(),
            location,
            phase: DebatePhase::Idle,
            current_round: 0,
            max_rounds,
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        if to == DebatePhase::Arguing && !self.has_rounds_remaining() {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!("round budget of {} exhausted", self.max_rounds),
            });
        }

        self.transitions.push(DebateTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;

        if to == DebatePhase::Arguing {
            self.current_round += 1;
        }

        Ok(())
    }

    /// Start the next round.
    pub fn begin_round(&mut self) -> Result<u32, TransitionError> {
        let reason = format!("round {} started", self.current_round + 1);
        self.transition(DebatePhase::Arguing, &reason)?;
        Ok(self.current_round)
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn has_rounds_remaining(&self) -> bool {
        self.current_round < self.max_rounds
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | {}",
            self.phase, self.current_round, self.max_rounds, self.location
        )
    }
}
