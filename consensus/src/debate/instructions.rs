//! Per-round debate instructions.
//!
//! Indexed by round class: round 1, round 2, and every later round share
//! the last entry.

pub const ROUND_INSTRUCTIONS: [&str; 3] = [
    "Argue your position independently. Judge the issue on its technical merits \
     and ignore how many other reviewers agree or disagree with you.",
    "You are not required to switch your position to match the majority. \
     Change your severity only if you can give a specific technical justification \
     for the change, and state that justification explicitly. The quality of the \
     review matters more than reaching consensus.",
    "Final assessment: summarize your position, the evidence that supports it, \
     and any uncertainty that remains.",
];

/// Instruction text for a 1-indexed round.
pub fn instruction_for_round(round: u32) -> &'static str {
    let index = (round.max(1) as usize - 1).min(ROUND_INSTRUCTIONS.len() - 1);
    ROUND_INSTRUCTIONS[index]
}
