//! Round consensus classification.

use serde::{Deserialize, Serialize};

use crate::config::DebateConfig;
use crate::opinion::{Severity, SeverityTally};

/// How firmly a debate settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusType {
    /// Agreement at or above the strong threshold.
    Strong,
    /// Agreement at or above the majority threshold.
    Majority,
    /// Neither threshold met; the severity is a best effort.
    Failed,
}

impl ConsensusType {
    pub fn is_reached(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for ConsensusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Majority => write!(f, "majority"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Agreement snapshot over participants' current severities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConsensus {
    pub consensus_type: ConsensusType,
    /// Fraction of participants holding the plurality severity.
    pub agreement: f64,
    /// Plurality severity, escalating on ties.
    pub severity: Severity,
}

/// Classify agreement over a set of severities.
pub fn classify_round<I>(severities: I, config: &DebateConfig) -> RoundConsensus
where
    I: IntoIterator<Item = Severity>,
{
    let tally = SeverityTally::from_severities(severities);
    let agreement = tally.agreement();
    let severity = tally
        .plurality()
        .map(|(severity, _)| severity)
        .unwrap_or(Severity::Nitpick);

    let consensus_type = if agreement >= config.strong_consensus_threshold {
        ConsensusType::Strong
    } else if agreement >= config.majority_threshold {
        ConsensusType::Majority
    } else {
        ConsensusType::Failed
    };

    RoundConsensus {
        consensus_type,
        agreement,
        severity,
    }
}
