//! Response parsing strategy.
//!
//! Turning free model text into a structured turn is pluggable; the
//! orchestrator only depends on [`ResponseParser`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::opinion::Severity;

/// Errors from parsing a backend response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty response")]
    Empty,

    #[error("Response has no argument text")]
    MissingArgument,

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Structured participant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub argument: String,
    /// Raw confidence as stated; the orchestrator normalizes it.
    pub confidence: Option<f64>,
    /// New severity, if the participant stated one.
    pub severity: Option<Severity>,
    pub changed_position: bool,
}

/// Strategy for turning response text into a [`ParsedResponse`].
pub trait ResponseParser: Send + Sync {
    fn parse(&self, text: &str, prior_severity: Severity) -> Result<ParsedResponse, ParseError>;
}

#[derive(Debug, Deserialize)]
struct JsonResponse {
    argument: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    changed_position: Option<bool>,
}

/// Default parser: a JSON object, or free text with marker lines.
///
/// Marker form:
///
/// ```text
/// SEVERITY: major
/// CONFIDENCE: 85%
/// The remaining lines are the argument.
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerResponseParser;

impl MarkerResponseParser {
    fn parse_json(&self, text: &str, prior: Severity) -> Result<ParsedResponse, ParseError> {
        let raw: JsonResponse =
            serde_json::from_str(text).map_err(|e| ParseError::Malformed(e.to_string()))?;
        let argument = raw.argument.trim().to_string();
        if argument.is_empty() {
            return Err(ParseError::MissingArgument);
        }
        let severity = raw.severity.as_deref().and_then(|s| s.parse().ok());
        let changed_position =
            raw.changed_position.unwrap_or(false) || severity.is_some_and(|s| s != prior);
        Ok(ParsedResponse {
            argument,
            confidence: raw.confidence,
            severity,
            changed_position,
        })
    }

    fn parse_markers(&self, text: &str, prior: Severity) -> Result<ParsedResponse, ParseError> {
        let mut severity = None;
        let mut confidence = None;
        let mut argument_lines = Vec::new();

        for line in text.lines() {
            let cleaned = line.trim().trim_matches(|c| c == '*' || c == '#').trim();
            if let Some(value) = strip_marker(cleaned, "severity") {
                severity = value
                    .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
                    .parse()
                    .ok();
            } else if let Some(value) = strip_marker(cleaned, "confidence") {
                confidence = value.trim().trim_end_matches('%').trim().parse::<f64>().ok();
            } else {
                argument_lines.push(line);
            }
        }

        let argument = argument_lines.join("\n").trim().to_string();
        if argument.is_empty() {
            return Err(ParseError::MissingArgument);
        }

        Ok(ParsedResponse {
            argument,
            confidence,
            severity,
            changed_position: severity.is_some_and(|s| s != prior),
        })
    }
}

fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let (head, rest) = line.split_once(':')?;
    let head = head.trim().trim_matches('*').trim();
    if head.eq_ignore_ascii_case(marker) {
        Some(rest)
    } else {
        None
    }
}

impl ResponseParser for MarkerResponseParser {
    fn parse(&self, text: &str, prior_severity: Severity) -> Result<ParsedResponse, ParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }
        if trimmed.starts_with('{') {
            return self.parse_json(trimmed, prior_severity);
        }
        self.parse_markers(trimmed, prior_severity)
    }
}
