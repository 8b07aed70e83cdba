//! Argument quality scoring.
//!
//! The score is informational: it is reported alongside each round but
//! never feeds the consensus arithmetic.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const BASE_SCORE: f64 = 0.5;
const SIGNAL_BONUS: f64 = 0.1;

static CODE_LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bline\s*\d+|\bL\d+\b|\bfunctions?\b|\bmethods?\b|\bvariables?\b|\w+\(\))")
        .expect("CODE_LOCATION_RE regex should compile")
});

static TECHNICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(memory|performance|security|thread|race[\s-]condition|deadlock|leak)")
        .expect("TECHNICAL_RE regex should compile")
});

static CAUSAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(because|since|given that|due to|as a result)\b")
        .expect("CAUSAL_RE regex should compile")
});

static EXAMPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(specifically|for example|such as|this will cause)\b")
        .expect("EXAMPLE_RE regex should compile")
});

static CODE_QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]+`").expect("CODE_QUOTE_RE regex should compile"));

/// Independent textual signal of a well-supported argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitySignal {
    CodeLocation,
    TechnicalDepth,
    CausalReasoning,
    ConcreteExample,
    CodeQuote,
}

/// Score breakdown for one argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentQuality {
    pub score: f64,
    pub signals: Vec<QualitySignal>,
}

/// Detect signals and compute the capped score.
pub fn assess_argument(argument: &str) -> ArgumentQuality {
    let checks: [(QualitySignal, &Regex); 5] = [
        (QualitySignal::CodeLocation, &*CODE_LOCATION_RE),
        (QualitySignal::TechnicalDepth, &*TECHNICAL_RE),
        (QualitySignal::CausalReasoning, &*CAUSAL_RE),
        (QualitySignal::ConcreteExample, &*EXAMPLE_RE),
        (QualitySignal::CodeQuote, &*CODE_QUOTE_RE),
    ];

    let signals: Vec<QualitySignal> = checks
        .iter()
        .filter(|(_, re)| re.is_match(argument))
        .map(|(signal, _)| *signal)
        .collect();

    let score = (BASE_SCORE + SIGNAL_BONUS * signals.len() as f64).min(1.0);
    ArgumentQuality { score, signals }
}

/// Quality score for one argument (0.5–1.0).
pub fn score_argument(argument: &str) -> f64 {
    assess_argument(argument).score
}
