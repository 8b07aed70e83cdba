//! End-to-end review pipeline.
//!
//! ```text
//! opinions ─► group ─► gate ─┬─ consensus ─────────────────────────┐
//!                            └─ classifier ─┬─ fallback (weak) ────┤
//!                                           └─ debates (parallel) ─┴─► resolve ─► dedup
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::debate::{DebateBackend, DebateOrchestrator, DebateResult, ResponseParser};
use crate::dedup::Deduplicator;
use crate::error::ConsensusResult;
use crate::opinion::{LocationKey, Opinion};
use crate::resolution::{resolve_consensus, resolve_debate, Discussion, IdGenerator};
use crate::voting::{
    group_by_location, ConsensusDecision, DebateTrigger, DebateTriggerClassifier, LocationGroup,
    MajorityGate,
};

/// Gate decision for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDecision {
    pub location: LocationKey,
    pub decision: ConsensusDecision,
}

/// Voting stage output: gate decisions plus classifier verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteReport {
    pub decisions: Vec<LocationDecision>,
    pub trigger: DebateTrigger,
}

/// Full pipeline output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub decisions: Vec<LocationDecision>,
    pub debates: Vec<DebateResult>,
    pub discussions: Vec<Discussion>,
    pub merged_count: usize,
}

/// Wires grouping, voting, debate, resolution and deduplication.
pub struct ReviewPipeline {
    config: EngineConfig,
    gate: MajorityGate,
    classifier: DebateTriggerClassifier,
    orchestrator: DebateOrchestrator,
    deduplicator: Deduplicator,
}

impl ReviewPipeline {
    /// Build a pipeline; fails on invalid configuration.
    pub fn new(
        config: EngineConfig,
        backend: Arc<dyn DebateBackend>,
        parser: Arc<dyn ResponseParser>,
    ) -> ConsensusResult<Self> {
        config.validate()?;
        Ok(Self {
            gate: MajorityGate::new(config.voting.clone()),
            classifier: DebateTriggerClassifier::new(config.voting.clone()),
            orchestrator: DebateOrchestrator::new(backend, parser, config.debate.clone()),
            deduplicator: Deduplicator::new(config.dedup.clone()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Group opinions and run the gate and classifier without debating.
    pub fn vote(&self, opinions: Vec<Opinion>) -> VoteReport {
        let groups = group_by_location(opinions);
        self.vote_groups(&groups)
    }

    fn vote_groups(&self, groups: &[LocationGroup]) -> VoteReport {
        let decisions: Vec<LocationDecision> = groups
            .iter()
            .map(|group| LocationDecision {
                location: group.key.clone(),
                decision: self.gate.decide(group),
            })
            .collect();

        let escalated: Vec<LocationGroup> = groups
            .iter()
            .zip(&decisions)
            .filter(|(_, d)| d.decision.needs_debate())
            .map(|(group, _)| group.clone())
            .collect();
        let trigger = self.classifier.classify(&escalated);

        VoteReport { decisions, trigger }
    }

    /// Run the whole flow and return resolved, deduplicated discussions.
    ///
    /// Debates for different locations run concurrently.
    pub async fn run(
        &self,
        opinions: Vec<Opinion>,
        ids: &mut dyn IdGenerator,
    ) -> ConsensusResult<PipelineReport> {
        let groups = group_by_location(opinions);
        let VoteReport { decisions, trigger } = self.vote_groups(&groups);

        let debates: Vec<DebateResult> = join_all(
            trigger
                .triggers
                .iter()
                .map(|t| self.orchestrator.debate_opinions(&t.key, &t.opinions)),
        )
        .await
        .into_iter()
        .collect::<ConsensusResult<_>>()?;

        let fallback: HashMap<&LocationKey, &ConsensusDecision> =
            trigger.fallback.iter().map(|(k, d)| (k, d)).collect();
        let debated: HashMap<&LocationKey, &DebateResult> =
            debates.iter().map(|r| (&r.location, r)).collect();

        let mut discussions = Vec::with_capacity(groups.len());
        for (group, entry) in groups.iter().zip(&decisions) {
            let resolved = if entry.decision.is_consensus() {
                resolve_consensus(group, &entry.decision, ids)
            } else if let Some(result) = debated.get(&group.key) {
                Some(resolve_debate(result, ids))
            } else if let Some(decision) = fallback.get(&group.key) {
                resolve_consensus(group, decision, ids)
            } else {
                None
            };
            discussions.extend(resolved);
        }

        let outcome = self.deduplicator.deduplicate(discussions);

        info!(
            locations = groups.len(),
            debates = debates.len(),
            discussions = outcome.deduplicated.len(),
            merged = outcome.merged_count,
            "Review pipeline complete"
        );

        Ok(PipelineReport {
            decisions,
            debates,
            discussions: outcome.deduplicated,
            merged_count: outcome.merged_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::{MarkerResponseParser, ScriptedBackend};
    use crate::opinion::Severity;
    use crate::resolution::SequentialIds;

    fn pipeline(backend: ScriptedBackend) -> ReviewPipeline {
        ReviewPipeline::new(
            EngineConfig::default(),
            Arc::new(backend),
            Arc::new(MarkerResponseParser),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.debate.max_rounds = 0;
        let result = ReviewPipeline::new(
            config,
            Arc::new(ScriptedBackend::new()),
            Arc::new(MarkerResponseParser),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_vote_escalates_split_location() {
        let report = pipeline(ScriptedBackend::new()).vote(vec![
            Opinion::new("a", Severity::Major, "a.rs", 1, "Leak"),
            Opinion::new("b", Severity::Major, "a.rs", 1, "Leak"),
            Opinion::new("a", Severity::Critical, "b.rs", 9, "Overflow"),
            Opinion::new("b", Severity::Minor, "b.rs", 9, "Overflow"),
        ]);
        assert_eq!(report.decisions.len(), 2);
        assert!(report.decisions[0].decision.is_consensus());
        assert!(report.decisions[1].decision.needs_debate());
        assert!(report.trigger.required);
        assert_eq!(report.trigger.triggers.len(), 1);
    }

    #[tokio::test]
    async fn test_run_without_debates() {
        let report = pipeline(ScriptedBackend::new())
            .run(
                vec![
                    Opinion::new("a", Severity::Minor, "a.rs", 1, "Naming"),
                    Opinion::new("b", Severity::Minor, "a.rs", 1, "Naming"),
                ],
                &mut SequentialIds::default(),
            )
            .await
            .unwrap();
        assert!(report.debates.is_empty());
        assert_eq!(report.discussions.len(), 1);
        assert_eq!(report.discussions[0].id, "disc-001");
    }

    #[tokio::test]
    async fn test_run_empty_input() {
        let report = pipeline(ScriptedBackend::new())
            .run(Vec::new(), &mut SequentialIds::default())
            .await
            .unwrap();
        assert!(report.decisions.is_empty());
        assert!(report.discussions.is_empty());
        assert_eq!(report.merged_count, 0);
    }
}
