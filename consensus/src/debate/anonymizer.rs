//! Anonymized view of the other participants' stances.
//!
//! Stances are grouped and counted by severity only. Reviewer identities
//! never appear in the summary.

use std::collections::BTreeMap;

use super::state::DebateParticipant;
use crate::opinion::Severity;

/// Summarize every participant except `self_index` for the given round.
///
/// From round 2 onwards each opponent's previous argument is included.
pub fn summarize_others(
    participants: &[DebateParticipant],
    self_index: usize,
    round: u32,
) -> String {
    let mut by_severity: BTreeMap<Severity, Vec<&DebateParticipant>> = BTreeMap::new();
    for (i, participant) in participants.iter().enumerate() {
        if i == self_index {
            continue;
        }
        by_severity
            .entry(participant.current_severity())
            .or_default()
            .push(participant);
    }

    let mut out = String::new();
    for (severity, group) in by_severity.iter().rev() {
        out.push_str(&format!(
            "{} reviewer(s) identified as {}:\n",
            group.len(),
            severity.label()
        ));
        for participant in group {
            let opinion = &participant.original_opinion;
            match &opinion.description {
                Some(description) => {
                    out.push_str(&format!("- {}: {}\n", opinion.title, description))
                }
                None => out.push_str(&format!("- {}\n", opinion.title)),
            }
            if round >= 2 {
                if let Some(previous) = participant.last_round() {
                    out.push_str(&format!("  Previous argument: {}\n", previous.argument));
                }
            }
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}
