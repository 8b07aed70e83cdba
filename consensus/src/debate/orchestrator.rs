//! Debate orchestrator. Drives the bounded multi-round negotiation for
//! one contested location.
//!
//! Each round fans out one backend request per participant and joins on
//! all of them before anything is recorded. A participant whose request
//! or parse fails keeps its previous stance for that round; the failure
//! never aborts the round or the debate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::anonymizer::summarize_others;
use super::backend::{BackendError, DebateBackend, DebateContext};
use super::consensus::{classify_round, ConsensusType, RoundConsensus};
use super::guardrails::{GuardrailEngine, StopDecision};
use super::instructions::instruction_for_round;
use super::parser::{ParsedResponse, ResponseParser};
use super::quality::score_argument;
use super::state::{DebateParticipant, DebatePhase, DebateRound, DebateSession};
use crate::config::DebateConfig;
use crate::error::{ConsensusError, ConsensusResult};
use crate::opinion::{LocationKey, Opinion, Severity};

/// Why a debate stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// A round reached strong or majority consensus.
    Consensus,
    /// Arguments stopped changing.
    EarlyStop { similarity: f64 },
    /// The round budget ran out.
    MaxRounds,
}

/// Outcome of a completed debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateResult {
    pub debate_id: String,
    pub location: LocationKey,
    pub participants: Vec<DebateParticipant>,
    pub rounds_run: u32,
    pub consensus_type: ConsensusType,
    /// Plurality severity at termination, escalating on ties.
    pub final_severity: Severity,
    /// Agreement fraction at termination.
    pub agreement: f64,
    pub termination: Termination,
    pub duration_ms: u64,
    /// Phase and transition history.
    pub session: DebateSession,
}

impl DebateResult {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {} | {} after {} round(s) ({:.0}% agreement)",
            self.consensus_type,
            self.location,
            self.final_severity,
            self.rounds_run,
            self.agreement * 100.0
        )
    }
}

enum Turn {
    Parsed(ParsedResponse),
    Failed(String),
}

/// Map a stated confidence into `[0, 1]`.
///
/// Values in `(1, 100]` are read as percentages. Returns `None` for NaN.
pub fn normalize_confidence(raw: f64) -> Option<f64> {
    if raw.is_nan() {
        return None;
    }
    let value = if raw > 1.0 && raw <= 100.0 {
        raw / 100.0
    } else {
        raw
    };
    Some(value.clamp(0.0, 1.0))
}

/// Runs debates against an injected backend and response parser.
///
/// Holds no per-debate state; one orchestrator can run debates for
/// different locations concurrently.
#[derive(Clone)]
pub struct DebateOrchestrator {
    backend: Arc<dyn DebateBackend>,
    parser: Arc<dyn ResponseParser>,
    config: DebateConfig,
}

impl DebateOrchestrator {
    pub fn new(
        backend: Arc<dyn DebateBackend>,
        parser: Arc<dyn ResponseParser>,
        config: DebateConfig,
    ) -> Self {
        Self {
            backend,
            parser,
            config,
        }
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Start a debate from the opinions at one location.
    ///
    /// A reviewer with several opinions joins with the first one.
    pub async fn debate_opinions(
        &self,
        location: &LocationKey,
        opinions: &[Opinion],
    ) -> ConsensusResult<DebateResult> {
        let mut participants: Vec<DebateParticipant> = Vec::with_capacity(opinions.len());
        for opinion in opinions {
            if participants.iter().any(|p| p.reviewer_id == opinion.reviewer_id) {
                continue;
            }
            participants.push(DebateParticipant::new(opinion.clone()));
        }
        self.run_debate(location, participants).await
    }

    /// Run a full debate for `location`.
    ///
    /// Fails fast with fewer than two participants, when a reviewer appears
    /// twice, or when a participant's opinion belongs to a different location.
    pub async fn run_debate(
        &self,
        location: &LocationKey,
        mut participants: Vec<DebateParticipant>,
    ) -> ConsensusResult<DebateResult> {
        if participants.len() < 2 {
            return Err(ConsensusError::InsufficientParticipants {
                got: participants.len(),
            });
        }
        for (i, participant) in participants.iter().enumerate() {
            if participants[..i]
                .iter()
                .any(|p| p.reviewer_id == participant.reviewer_id)
            {
                return Err(ConsensusError::DuplicateParticipant {
                    reviewer: participant.reviewer_id.clone(),
                });
            }
        }
        if let Some(stray) = participants
            .iter()
            .find(|p| p.original_opinion.key() != *location)
        {
            return Err(ConsensusError::MixedLocations {
                expected: location.to_string(),
                found: stray.original_opinion.key().to_string(),
            });
        }
        if self.config.max_rounds == 0 {
            return Err(ConsensusError::InvalidConfig(
                "debate.max_rounds must be at least 1".to_string(),
            ));
        }

        let started = Instant::now();
        let debate_id = uuid::Uuid::new_v4().to_string();
        let mut session = DebateSession::new(&debate_id, location.clone(), self.config.max_rounds);
        let guardrails = GuardrailEngine::new(&self.config);

        info!(
            debate_id = %debate_id,
            location = %location,
            participants = participants.len(),
            max_rounds = self.config.max_rounds,
            "Debate started"
        );

        let termination = loop {
            let round = session.begin_round()?;
            self.run_round(&debate_id, location, round, &mut participants)
                .await;

            let check = self.current_consensus(&participants);
            debug!(
                debate_id = %debate_id,
                status = %session.status_line(),
                agreement = check.agreement,
                consensus = %check.consensus_type,
                "Round complete"
            );

            if check.consensus_type.is_reached() {
                session.transition(
                    DebatePhase::Resolved,
                    &format!("{} consensus on {}", check.consensus_type, check.severity),
                )?;
                break Termination::Consensus;
            }

            let decision = guardrails.evaluate(&session, &participants);
            if !decision.should_stop() {
                continue;
            }
            let (phase, termination) = match decision {
                StopDecision::Stalled { similarity } => {
                    info!(debate_id = %debate_id, round, similarity, "Debate stopped early");
                    (DebatePhase::Stalled, Termination::EarlyStop { similarity })
                }
                _ => (DebatePhase::Exhausted, Termination::MaxRounds),
            };
            session.transition(phase, &decision.to_string())?;
            break termination;
        };
        debug_assert!(session.is_complete());

        // Recompute from final stances so the classification is never stale.
        let final_check = self.current_consensus(&participants);
        let mean_quality = participants.iter().map(|p| p.mean_quality()).sum::<f64>()
            / participants.len() as f64;
        let result = DebateResult {
            debate_id: debate_id.clone(),
            location: location.clone(),
            rounds_run: session.current_round,
            consensus_type: final_check.consensus_type,
            final_severity: final_check.severity,
            agreement: final_check.agreement,
            termination,
            duration_ms: started.elapsed().as_millis() as u64,
            participants,
            session,
        };

        info!(
            debate_id = %debate_id,
            location = %location,
            rounds = result.rounds_run,
            consensus = %result.consensus_type,
            severity = %result.final_severity,
            mean_quality,
            "Debate finished"
        );

        Ok(result)
    }

    fn current_consensus(&self, participants: &[DebateParticipant]) -> RoundConsensus {
        classify_round(
            participants.iter().map(|p| p.current_severity()),
            &self.config,
        )
    }

    /// Fan out one request per participant, join, then record every turn.
    async fn run_round(
        &self,
        debate_id: &str,
        location: &LocationKey,
        round: u32,
        participants: &mut [DebateParticipant],
    ) {
        let timeout = self.config.request_timeout();
        let contexts: Vec<DebateContext> = (0..participants.len())
            .map(|i| self.build_context(debate_id, location, round, participants, i))
            .collect();

        let backend = self.backend.as_ref();
        let requests = contexts.iter().map(|context| async move {
            match tokio::time::timeout(timeout, backend.execute(context, timeout)).await {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(timeout)),
            }
        });
        let responses = join_all(requests).await;

        for (participant, response) in participants.iter_mut().zip(responses) {
            let prior_severity = participant.current_severity();
            let turn = match response {
                Ok(text) => match self.parser.parse(&text, prior_severity) {
                    Ok(parsed) => Turn::Parsed(parsed),
                    Err(e) => Turn::Failed(format!("response could not be parsed: {}", e)),
                },
                Err(e) => Turn::Failed(e.to_string()),
            };

            let record = match turn {
                Turn::Parsed(parsed) => {
                    let severity = parsed.severity.unwrap_or(prior_severity);
                    let confidence = parsed
                        .confidence
                        .and_then(normalize_confidence)
                        .unwrap_or_else(|| participant.current_confidence());
                    DebateRound {
                        round_number: round,
                        quality_score: score_argument(&parsed.argument),
                        argument: parsed.argument,
                        confidence,
                        severity,
                        changed_position: parsed.changed_position || severity != prior_severity,
                        failed: false,
                    }
                }
                Turn::Failed(reason) => {
                    warn!(
                        debate_id,
                        round,
                        reviewer = %participant.reviewer_id,
                        error = %reason,
                        "Participant turn failed, carrying stance forward"
                    );
                    DebateRound {
                        round_number: round,
                        argument: format!("[no response: {}]", reason),
                        confidence: participant.current_confidence(),
                        severity: prior_severity,
                        changed_position: false,
                        quality_score: 0.0,
                        failed: true,
                    }
                }
            };

            participant.record(record);
        }
    }

    fn build_context(
        &self,
        debate_id: &str,
        location: &LocationKey,
        round: u32,
        participants: &[DebateParticipant],
        index: usize,
    ) -> DebateContext {
        let participant = &participants[index];
        DebateContext {
            debate_id: debate_id.to_string(),
            location: location.clone(),
            reviewer_id: participant.reviewer_id.clone(),
            round,
            max_rounds: self.config.max_rounds,
            instruction: instruction_for_round(round).to_string(),
            own_opinion: participant.original_opinion.clone(),
            current_severity: participant.current_severity(),
            own_previous_argument: participant.last_round().map(|r| r.argument.clone()),
            others_summary: summarize_others(participants, index, round),
        }
    }
}

/// Run one debate with the given collaborators and settings.
pub async fn run_debate(
    backend: Arc<dyn DebateBackend>,
    parser: Arc<dyn ResponseParser>,
    location: &LocationKey,
    participants: Vec<DebateParticipant>,
    config: DebateConfig,
) -> ConsensusResult<DebateResult> {
    DebateOrchestrator::new(backend, parser, config)
        .run_debate(location, participants)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::backend::ScriptedBackend;
    use crate::debate::parser::MarkerResponseParser;
    use crate::opinion::Severity;

    fn opinion(reviewer: &str, severity: Severity) -> Opinion {
        Opinion::new(reviewer, severity, "queue.rs", 31, "Unbounded channel")
    }

    fn orchestrator(backend: ScriptedBackend) -> DebateOrchestrator {
        DebateOrchestrator::new(
            Arc::new(backend),
            Arc::new(MarkerResponseParser),
            DebateConfig::default(),
        )
    }

    #[test]
    fn test_normalize_confidence() {
        assert_eq!(normalize_confidence(0.42), Some(0.42));
        assert_eq!(normalize_confidence(85.0), Some(0.85));
        assert_eq!(normalize_confidence(100.0), Some(1.0));
        assert_eq!(normalize_confidence(250.0), Some(1.0));
        assert_eq!(normalize_confidence(-3.0), Some(0.0));
        assert_eq!(normalize_confidence(1.0), Some(1.0));
        assert_eq!(normalize_confidence(f64::NAN), None);
    }

    #[tokio::test]
    async fn test_rejects_single_participant() {
        let orch = orchestrator(ScriptedBackend::new());
        let op = opinion("a", Severity::Major);
        let err = orch.debate_opinions(&op.key(), &[op]).await.unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::InsufficientParticipants { got: 1 }
        ));
    }

    #[tokio::test]
    async fn test_rejects_mixed_locations() {
        let orch = orchestrator(ScriptedBackend::new());
        let a = opinion("a", Severity::Major);
        let b = Opinion::new("b", Severity::Minor, "other.rs", 1, "Unbounded channel");
        let err = orch.debate_opinions(&a.key(), &[a.clone(), b]).await.unwrap_err();
        assert!(matches!(err, ConsensusError::MixedLocations { .. }));
    }

    #[tokio::test]
    async fn test_rejects_repeat_reviewer() {
        let orch = orchestrator(ScriptedBackend::new());
        let first = opinion("a", Severity::Major);
        let participants = vec![
            DebateParticipant::new(first.clone()),
            DebateParticipant::new(opinion("a", Severity::Minor)),
        ];
        let err = orch.run_debate(&first.key(), participants).await.unwrap_err();
        assert!(matches!(
            err,
            ConsensusError::DuplicateParticipant { ref reviewer } if reviewer == "a"
        ));
    }

    #[tokio::test]
    async fn test_opinions_join_once_per_reviewer() {
        let backend = ScriptedBackend::new()
            .with_script("a", ["SEVERITY: major\nThe queue has no bound."])
            .with_script("b", ["SEVERITY: major\nAgreed."]);
        let a = opinion("a", Severity::Major);
        let opinions = [
            a.clone(),
            opinion("a", Severity::Critical),
            opinion("b", Severity::Minor),
        ];

        let result = orchestrator(backend)
            .debate_opinions(&a.key(), &opinions)
            .await
            .unwrap();

        assert_eq!(result.participants.len(), 2);
        assert_eq!(result.participants[0].original_opinion.severity, Severity::Major);
        assert_eq!(result.consensus_type, ConsensusType::Strong);
    }

    #[tokio::test]
    async fn test_converges_in_first_round() {
        let backend = ScriptedBackend::new()
            .with_script("a", ["SEVERITY: major\nCONFIDENCE: 90\nMemory grows without bound."])
            .with_script("b", ["SEVERITY: major\nAgreed, producers outpace the consumer."]);
        let a = opinion("a", Severity::Major);
        let b = opinion("b", Severity::Minor);

        let result = orchestrator(backend)
            .debate_opinions(&a.key(), &[a.clone(), b])
            .await
            .unwrap();

        assert_eq!(result.rounds_run, 1);
        assert_eq!(result.consensus_type, ConsensusType::Strong);
        assert_eq!(result.final_severity, Severity::Major);
        assert_eq!(result.termination, Termination::Consensus);
        assert_eq!(result.session.phase, DebatePhase::Resolved);

        let b_round = &result.participants[1].rounds()[0];
        assert!(b_round.changed_position);
        assert_eq!(result.participants[0].rounds()[0].confidence, 0.9);
    }

    #[tokio::test]
    async fn test_backend_failure_carries_stance_forward() {
        let backend = ScriptedBackend::new()
            .with_script("a", ["SEVERITY: critical\nThe secret is committed."]);
        let a = opinion("a", Severity::Critical);
        let b = opinion("b", Severity::Minor).with_confidence(0.6);

        let result = orchestrator(backend)
            .debate_opinions(&a.key(), &[a.clone(), b])
            .await
            .unwrap();

        let b_rounds = result.participants[1].rounds();
        assert!(!b_rounds.is_empty());
        assert!(b_rounds.iter().all(|r| r.failed));
        assert!(b_rounds[0].argument.contains("no script for reviewer b"));
        assert_eq!(b_rounds[0].severity, Severity::Minor);
        assert_eq!(b_rounds[0].confidence, 0.6);
        assert_eq!(result.participants[0].rounds().len(), b_rounds.len());
    }

    #[tokio::test]
    async fn test_failed_debate_still_has_severity() {
        let backend = ScriptedBackend::new()
            .with_script(
                "a",
                [
                    "SEVERITY: critical\nround one a",
                    "SEVERITY: critical\nnew point two",
                    "SEVERITY: critical\nfinal three",
                ],
            )
            .with_script(
                "b",
                [
                    "SEVERITY: minor\nround one b",
                    "SEVERITY: minor\nanother angle",
                    "SEVERITY: minor\nclosing view",
                ],
            );
        let a = opinion("a", Severity::Critical);
        let b = opinion("b", Severity::Minor);

        let result = orchestrator(backend)
            .debate_opinions(&a.key(), &[a.clone(), b])
            .await
            .unwrap();

        assert_eq!(result.rounds_run, 3);
        assert_eq!(result.consensus_type, ConsensusType::Failed);
        assert_eq!(result.final_severity, Severity::Critical);
        assert_eq!(result.termination, Termination::MaxRounds);
        assert_eq!(result.session.phase, DebatePhase::Exhausted);
        assert!(result.session.is_complete());
        assert_eq!(result.duration().as_millis() as u64, result.duration_ms);
        assert!(result.participants.iter().all(|p| p.mean_quality() > 0.0));
    }
}
