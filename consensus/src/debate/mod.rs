//! Debate Orchestration — bounded multi-round negotiation over one
//! contested location.
//!
//! Each participant restates or revises its severity after seeing an
//! anonymized summary of everyone else. Rounds run in parallel per
//! participant; the debate stops on consensus, on stalled arguments, or
//! when the round budget runs out.
//!
//! # Debate Flow
//!
//! ```text
//! Idle → Arguing (round n) → [consensus?]
//!          ▲                     │
//!          │                     ├─ Yes → Resolved
//!          │                     ├─ No, arguments unchanged → Stalled
//!          │                     ├─ No, max rounds → Exhausted
//!          └─────────────────────┘  No, rounds left
//! ```

pub mod anonymizer;
pub mod backend;
pub mod consensus;
pub mod guardrails;
pub mod instructions;
pub mod orchestrator;
pub mod parser;
pub mod quality;
pub mod state;

pub use anonymizer::summarize_others;
pub use backend::{BackendError, DebateBackend, DebateContext, ScriptedBackend};
pub use consensus::{classify_round, ConsensusType, RoundConsensus};
pub use guardrails::{stability, GuardrailEngine, StabilityReport, StopDecision};
pub use instructions::{instruction_for_round, ROUND_INSTRUCTIONS};
pub use orchestrator::{
    normalize_confidence, run_debate, DebateOrchestrator, DebateResult, Termination,
};
pub use parser::{MarkerResponseParser, ParseError, ParsedResponse, ResponseParser};
pub use quality::{assess_argument, score_argument, ArgumentQuality, QualitySignal};
pub use state::{
    DebateParticipant, DebatePhase, DebateRound, DebateSession, DebateTransition, TransitionError,
};
