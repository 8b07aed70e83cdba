//! Debate backend abstraction.
//!
//! The engine never talks to a model provider directly. Callers inject a
//! [`DebateBackend`]; transport, prompt rendering and retries live behind it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::opinion::{LocationKey, Opinion, Severity};

/// Errors from a debate backend call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Everything a backend needs to produce one participant's turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateContext {
    pub debate_id: String,
    pub location: LocationKey,
    pub reviewer_id: String,
    /// Round number (1-indexed).
    pub round: u32,
    pub max_rounds: u32,
    /// Round-class instruction.
    pub instruction: String,
    /// The participant's original opinion.
    pub own_opinion: Opinion,
    /// Severity the participant currently holds.
    pub current_severity: Severity,
    /// The participant's own previous argument, if any.
    pub own_previous_argument: Option<String>,
    /// Anonymized summary of the other participants.
    pub others_summary: String,
}

/// Trait for the model backend that plays each participant
#[async_trait]
pub trait DebateBackend: Send + Sync {
    /// Produce the raw response text for one participant turn.
    async fn execute(&self, context: &DebateContext, timeout: Duration)
        -> Result<String, BackendError>;
}

/// Backend that replays canned responses per reviewer and round.
///
/// Round `n` uses the `n`-th scripted response; rounds past the end of a
/// script repeat its last entry. Reviewers without a script fail with
/// [`BackendError::Unavailable`]; an empty script fails with
/// [`BackendError::RequestFailed`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptedBackend {
    scripts: HashMap<String, Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script for one reviewer.
    pub fn with_script<I, S>(mut self, reviewer_id: &str, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts.insert(
            reviewer_id.to_string(),
            responses.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn reviewers(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }
}

#[async_trait]
impl DebateBackend for ScriptedBackend {
    async fn execute(
        &self,
        context: &DebateContext,
        _timeout: Duration,
    ) -> Result<String, BackendError> {
        let script = self.scripts.get(&context.reviewer_id).ok_or_else(|| {
            BackendError::Unavailable(format!("no script for reviewer {}", context.reviewer_id))
        })?;
        let index = (context.round.max(1) as usize - 1).min(script.len().saturating_sub(1));
        script.get(index).cloned().ok_or_else(|| {
            BackendError::RequestFailed(format!(
                "empty script for reviewer {}",
                context.reviewer_id
            ))
        })
    }
}
