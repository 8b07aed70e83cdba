//! Engine configuration.
//!
//! Every section deserializes with defaults, so a partial TOML or JSON
//! document only needs to name the values it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConsensusError, ConsensusResult};

/// Majority voting gate and trigger classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Minimum agreement fraction to accept without debate.
    pub threshold: f64,
    /// Individual confidence below which a major opinion counts as unsure.
    pub low_confidence: f64,
    /// Agreement at or above which a group counts as near-unanimous.
    pub near_unanimous: f64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            low_confidence: 0.7,
            near_unanimous: 0.99,
        }
    }
}

/// Debate orchestration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Hard cap on rounds per debate.
    pub max_rounds: u32,
    /// Agreement at or above which a round ends in strong consensus.
    pub strong_consensus_threshold: f64,
    /// Agreement at or above which a round ends in majority consensus.
    pub majority_threshold: f64,
    /// Argument similarity at or above which a participant counts as stable.
    pub stability_threshold: f64,
    /// Per-request backend timeout in seconds.
    pub request_timeout_secs: u64,
}

impl DebateConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            strong_consensus_threshold: 0.8,
            majority_threshold: 0.6,
            stability_threshold: 0.9,
            request_timeout_secs: 120,
        }
    }
}

/// Discussion deduplication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Title similarity must exceed this value for a merge.
    pub title_similarity: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_similarity: 0.6,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub voting: VotingConfig,
    pub debate: DebateConfig,
    pub dedup: DedupConfig,
}

impl EngineConfig {
    /// Reject out-of-range values.
    pub fn validate(&self) -> ConsensusResult<()> {
        let fractions = [
            ("voting.threshold", self.voting.threshold),
            ("voting.low_confidence", self.voting.low_confidence),
            ("voting.near_unanimous", self.voting.near_unanimous),
            (
                "debate.strong_consensus_threshold",
                self.debate.strong_consensus_threshold,
            ),
            ("debate.majority_threshold", self.debate.majority_threshold),
            ("debate.stability_threshold", self.debate.stability_threshold),
            ("dedup.title_similarity", self.dedup.title_similarity),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConsensusError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.debate.max_rounds == 0 {
            return Err(ConsensusError::InvalidConfig(
                "debate.max_rounds must be at least 1".to_string(),
            ));
        }

        if self.debate.request_timeout_secs == 0 {
            return Err(ConsensusError::InvalidConfig(
                "debate.request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.debate.majority_threshold > self.debate.strong_consensus_threshold {
            return Err(ConsensusError::InvalidConfig(format!(
                "debate.majority_threshold ({}) exceeds debate.strong_consensus_threshold ({})",
                self.debate.majority_threshold, self.debate.strong_consensus_threshold
            )));
        }

        Ok(())
    }
}
