//! Early stop and round budget guardrails.

use serde::{Deserialize, Serialize};

use super::state::{DebateParticipant, DebateSession};
use crate::config::DebateConfig;
use crate::text::text_similarity;

/// Outcome of evaluating guardrails after a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopDecision {
    /// Run another round.
    Continue,
    /// Every participant repeated itself; stop early.
    Stalled { similarity: f64 },
    /// The round budget is used up.
    MaxRounds { rounds: u32 },
}

impl StopDecision {
    pub fn should_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

impl std::fmt::Display for StopDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Stalled { similarity } => {
                write!(f, "stalled (argument similarity {:.2})", similarity)
            }
            Self::MaxRounds { rounds } => write!(f, "max_rounds_reached ({})", rounds),
        }
    }
}

/// Stability of participants' last two rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    /// Lowest argument similarity across participants.
    pub min_similarity: f64,
    /// Whether any participant's severity moved between the two rounds.
    pub severity_changed: bool,
}

/// Measure how much participants' last two rounds differ.
///
/// Returns `None` until every participant has at least two rounds.
pub fn stability(participants: &[DebateParticipant]) -> Option<StabilityReport> {
    if participants.is_empty() {
        return None;
    }

    let mut min_similarity = 1.0_f64;
    let mut severity_changed = false;
    for participant in participants {
        let rounds = participant.rounds();
        if rounds.len() < 2 {
            return None;
        }
        let previous = &rounds[rounds.len() - 2];
        let latest = &rounds[rounds.len() - 1];
        let similarity = text_similarity(&previous.argument, &latest.argument);
        min_similarity = min_similarity.min(similarity);
        severity_changed |= previous.severity != latest.severity;
    }

    Some(StabilityReport {
        min_similarity,
        severity_changed,
    })
}

/// Evaluates stop conditions against debate state.
#[derive(Debug, Clone)]
pub struct GuardrailEngine {
    stability_threshold: f64,
    max_rounds: u32,
}

impl GuardrailEngine {
    pub fn new(config: &DebateConfig) -> Self {
        Self {
            stability_threshold: config.stability_threshold,
            max_rounds: config.max_rounds,
        }
    }

    /// Decide whether to stop after the current round.
    ///
    /// Call only when the round did not reach consensus. Early stop is
    /// evaluated from round 2 onwards.
    pub fn evaluate(
        &self,
        session: &DebateSession,
        participants: &[DebateParticipant],
    ) -> StopDecision {
        if session.current_round >= 2 {
            if let Some(report) = stability(participants) {
                if report.min_similarity >= self.stability_threshold && !report.severity_changed {
                    return StopDecision::Stalled {
                        similarity: report.min_similarity,
                    };
                }
            }
        }

        if session.current_round >= self.max_rounds {
            return StopDecision::MaxRounds {
                rounds: session.current_round,
            };
        }

        StopDecision::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::state::DebateRound;
    use crate::opinion::{Opinion, Severity};

    fn participant(arguments: &[(&str, Severity)]) -> DebateParticipant {
        let mut p = DebateParticipant::new(Opinion::new(
            "r1",
            Severity::Major,
            "io.rs",
            3,
            "Blocking read",
        ));
        for (i, (argument, severity)) in arguments.iter().enumerate() {
            p.record(DebateRound {
                round_number: i as u32 + 1,
                argument: argument.to_string(),
                confidence: 0.8,
                severity: *severity,
                changed_position: false,
                quality_score: 0.5,
                failed: false,
            });
        }
        p
    }

    fn session_at(round: u32, max_rounds: u32) -> DebateSession {
        let mut session = DebateSession::new(
            "d-1",
            Opinion::new("r1", Severity::Major, "io.rs", 3, "Blocking read").key(),
            max_rounds,
        );
        for _ in 0..round {
            session.begin_round().unwrap();
        }
        session
    }

    #[test]
    fn test_single_participant_identical_text_is_stable() {
        let same = "The read blocks the executor thread because it is synchronous.";
        let p = participant(&[(same, Severity::Major), (same, Severity::Major)]);
        let report = stability(&[p]).unwrap();
        assert_eq!(report.min_similarity, 1.0);
        assert!(!report.severity_changed);
    }

    #[test]
    fn test_not_enough_rounds() {
        let p = participant(&[("only one", Severity::Major)]);
        assert!(stability(&[p]).is_none());
        assert!(stability(&[]).is_none());
    }

    #[test]
    fn test_stalls_when_all_stable() {
        let engine = GuardrailEngine::new(&DebateConfig::default());
        let a = participant(&[
            ("same words here", Severity::Major),
            ("same words here", Severity::Major),
        ]);
        let b = participant(&[("other view", Severity::Minor), ("other view", Severity::Minor)]);
        let decision = engine.evaluate(&session_at(2, 3), &[a, b]);
        assert_eq!(decision, StopDecision::Stalled { similarity: 1.0 });
        assert!(decision.should_stop());
    }

    #[test]
    fn test_severity_change_blocks_early_stop() {
        let engine = GuardrailEngine::new(&DebateConfig::default());
        let a = participant(&[("same words", Severity::Major), ("same words", Severity::Critical)]);
        assert_eq!(
            engine.evaluate(&session_at(2, 3), &[a]),
            StopDecision::Continue
        );
    }

    #[test]
    fn test_new_arguments_continue() {
        let engine = GuardrailEngine::new(&DebateConfig::default());
        let a = participant(&[
            ("the lock is held too long", Severity::Major),
            ("profiling shows contention under load specifically in flush", Severity::Major),
        ]);
        assert_eq!(
            engine.evaluate(&session_at(2, 3), &[a]),
            StopDecision::Continue
        );
    }

    #[test]
    fn test_max_rounds() {
        let engine = GuardrailEngine::new(&DebateConfig::default());
        let a = participant(&[
            ("one", Severity::Major),
            ("two", Severity::Major),
            ("three", Severity::Major),
        ]);
        assert_eq!(
            engine.evaluate(&session_at(3, 3), &[a]),
            StopDecision::MaxRounds { rounds: 3 }
        );
    }

    #[test]
    fn test_no_early_stop_in_round_one() {
        let engine = GuardrailEngine::new(&DebateConfig::default());
        let a = participant(&[("x", Severity::Major), ("x", Severity::Major)]);
        assert_eq!(
            engine.evaluate(&session_at(1, 3), &[a]),
            StopDecision::Continue
        );
    }
}
