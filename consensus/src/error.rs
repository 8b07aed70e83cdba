//! Engine error types.
//!
//! Disagreement between reviewers is never an error: it surfaces as a
//! `failed` consensus classification. Errors here are contract violations
//! and configuration problems.

use thiserror::Error;

/// Result type alias for engine operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;

/// Errors raised by the consensus engine
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Debate needs at least 2 participants, got {got}")]
    InsufficientParticipants { got: usize },

    #[error("Reviewer {reviewer} joined the debate more than once")]
    DuplicateParticipant { reviewer: String },

    #[error("Debate participants span multiple locations: expected {expected}, found {found}")]
    MixedLocations { expected: String, found: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Debate state error: {0}")]
    State(#[from] crate::debate::state::TransitionError),
}
