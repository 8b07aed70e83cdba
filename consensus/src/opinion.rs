//! Shared reviewer opinion types and severity tallying.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity a reviewer assigns to an issue.
///
/// Declaration order is rank order, so `Ord` compares by harshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Style nit, never blocking.
    Nitpick,
    /// Minor issue or suggestion.
    #[serde(alias = "suggestion")]
    Minor,
    /// Significant problem that should be fixed.
    #[serde(alias = "warning")]
    Major,
    /// Must be fixed before merge.
    Critical,
}

impl Severity {
    /// All severities, harshest first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Nitpick,
    ];

    /// Upper-case label used in anonymized debate summaries.
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Major => "MAJOR",
            Self::Minor => "MINOR",
            Self::Nitpick => "NITPICK",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Nitpick => write!(f, "nitpick"),
        }
    }
}

/// Error returned when a severity string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity: {0}")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" | "harshly_critical" | "harshly-critical" => Ok(Self::Critical),
            "major" | "warning" => Ok(Self::Major),
            "minor" | "suggestion" => Ok(Self::Minor),
            "nitpick" | "nit" => Ok(Self::Nitpick),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// One reviewer's assessment of a code location. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    /// Reviewer that produced this opinion.
    pub reviewer_id: String,
    pub severity: Severity,
    #[serde(default)]
    pub category: String,
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Reviewer's confidence in the assessment (0.0–1.0).
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Opinion {
    /// Create an opinion with full confidence and no optional fields.
    pub fn new(reviewer_id: &str, severity: Severity, file: &str, line: u32, title: &str) -> Self {
        Self {
            reviewer_id: reviewer_id.to_string(),
            severity,
            category: String::new(),
            file: file.to_string(),
            line,
            line_end: None,
            title: title.to_string(),
            description: None,
            suggestion: None,
            confidence: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    pub fn with_line_end(mut self, line_end: u32) -> Self {
        self.line_end = Some(line_end);
        self
    }

    /// Exact grouping key for this opinion.
    pub fn key(&self) -> LocationKey {
        LocationKey {
            file: self.file.clone(),
            line: self.line,
            title: self.title.clone(),
        }
    }

    /// Inclusive line range covered by this opinion.
    pub fn line_range(&self) -> (u32, u32) {
        let end = self.line_end.unwrap_or(self.line).max(self.line);
        (self.line, end)
    }
}

/// Exact location key: `(file, line, title)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub file: String,
    pub line: u32,
    pub title: String,
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Per-severity vote counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityTally {
    counts: BTreeMap<Severity, usize>,
    total: usize,
}

impl SeverityTally {
    /// Tally a sequence of severities.
    pub fn from_severities<I: IntoIterator<Item = Severity>>(severities: I) -> Self {
        let mut tally = Self::default();
        for severity in severities {
            *tally.counts.entry(severity).or_insert(0) += 1;
            tally.total += 1;
        }
        tally
    }

    /// Tally the severities of a slice of opinions.
    pub fn from_opinions(opinions: &[Opinion]) -> Self {
        Self::from_severities(opinions.iter().map(|o| o.severity))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct severities present.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Severity with the highest count. Ties escalate to the harsher severity.
    pub fn plurality(&self) -> Option<(Severity, usize)> {
        self.counts
            .iter()
            .map(|(severity, count)| (*severity, *count))
            .max_by_key(|(severity, count)| (*count, *severity))
    }

    /// Fraction of votes held by the plurality severity (0.0 when empty).
    pub fn agreement(&self) -> f64 {
        match self.plurality() {
            Some((_, count)) if self.total > 0 => count as f64 / self.total as f64,
            _ => 0.0,
        }
    }

    /// Severities present with their counts, harshest first.
    pub fn buckets(&self) -> impl Iterator<Item = (Severity, usize)> + '_ {
        self.counts.iter().rev().map(|(s, c)| (*s, *c))
    }
}
