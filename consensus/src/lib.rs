//! Multi-reviewer severity consensus engine
//!
//! Several independent reviewers report issues against the same change.
//! This library decides, per code location, which severity the group
//! agrees on, and runs a bounded debate where they do not.
//!
//! # Flow
//!
//! ```text
//! opinions ─► voting::group_by_location ─► voting::MajorityGate
//!               ├─ Consensus ───────────────────────────────┐
//!               └─ NeedsDebate ─► voting::DebateTriggerClassifier
//!                                   ├─ weak Consensus ──────┤
//!                                   └─ debate::DebateOrchestrator
//!                                                           ▼
//!                               resolution ─► dedup ─► discussions
//! ```
//!
//! Model access is injected through [`debate::DebateBackend`] and response
//! parsing through [`debate::ResponseParser`]; the library performs no I/O
//! of its own.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use consensus::{EngineConfig, ReviewPipeline, SequentialIds};
//! use consensus::debate::{MarkerResponseParser, ScriptedBackend};
//!
//! # async fn demo(opinions: Vec<consensus::Opinion>) -> consensus::ConsensusResult<()> {
//! let pipeline = ReviewPipeline::new(
//!     EngineConfig::default(),
//!     Arc::new(ScriptedBackend::new()),
//!     Arc::new(MarkerResponseParser),
//! )?;
//! let report = pipeline.run(opinions, &mut SequentialIds::default()).await?;
//! println!("{} discussions", report.discussions.len());
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod debate;
pub mod dedup;
pub mod error;
pub mod opinion;
pub mod pipeline;
pub mod resolution;
pub mod text;
pub mod voting;

pub use config::{DebateConfig, DedupConfig, EngineConfig, VotingConfig};
pub use debate::{run_debate, DebateResult};
pub use dedup::{deduplicate, DedupOutcome, Deduplicator};
pub use error::{ConsensusError, ConsensusResult};
pub use opinion::{LocationKey, Opinion, Severity, SeverityTally};
pub use pipeline::{LocationDecision, PipelineReport, ReviewPipeline, VoteReport};
pub use resolution::{
    resolve_consensus, resolve_debate, Discussion, DiscussionSeverity, DiscussionStatus,
    EvidenceRef, IdGenerator, ResolutionBasis, SequentialIds,
};
pub use voting::{classify_debate_need, decide_consensus, ConsensusDecision, LocationGroup};
