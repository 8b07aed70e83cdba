//! Severity voting: location grouping, the majority gate and the debate
//! trigger classifier.
//!
//! ```text
//! opinions ──► group_by_location ──► MajorityGate ──┬─► Consensus
//!                                                   └─► DebateTriggerClassifier ──┬─► debate
//!                                                                                 └─► weak Consensus
//! ```

pub mod gate;
pub mod grouping;
pub mod trigger;

pub use gate::{decide_consensus, ConsensusDecision, MajorityGate};
pub use grouping::{group_by_location, group_reviewer_opinions, LocationGroup};
pub use trigger::{
    classify_debate_need, DebateTrigger, DebateTriggerClassifier, LocationTrigger, TriggerReason,
};
