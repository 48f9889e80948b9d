use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CheckError;

/// Candidate answer text under verification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claim(String);

impl Claim {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Claim {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Claim {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Alternative completions generated for the same prompt
pub type SampleSet = Vec<String>;

/// Fact-checking outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactLabel {
    Supported,
    Unsupported,
    Inconclusive,
}

/// Self-consistency outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLabel {
    Consistent,
    Inconsistent,
    Inconclusive,
}

/// Labels that can gate an answer.
///
/// Only the definite positive label passes; `Inconclusive` gates the same way
/// as a negative verdict.
pub trait GateLabel {
    fn passes(&self) -> bool;
    fn is_inconclusive(&self) -> bool;
}

impl GateLabel for FactLabel {
    fn passes(&self) -> bool {
        matches!(self, FactLabel::Supported)
    }

    fn is_inconclusive(&self) -> bool {
        matches!(self, FactLabel::Inconclusive)
    }
}

impl GateLabel for ConsistencyLabel {
    fn passes(&self) -> bool {
        matches!(self, ConsistencyLabel::Consistent)
    }

    fn is_inconclusive(&self) -> bool {
        matches!(self, ConsistencyLabel::Inconclusive)
    }
}

/// Sample accounting for a consistency check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyStats {
    pub requested: usize,
    pub generated: usize,
    pub scored: usize,
    pub inconsistent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict<L> {
    pub label: L,
    pub rationale: Option<String>,
    /// Entailment score for fact checks, inconsistent fraction for consistency checks
    pub score: Option<f32>,
    pub low_confidence: bool,
    pub degraded: Option<CheckError>,
    pub stats: Option<ConsistencyStats>,
    pub checked_at: DateTime<Utc>,
}

pub type FactVerdict = Verdict<FactLabel>;
pub type ConsistencyVerdict = Verdict<ConsistencyLabel>;

impl<L: GateLabel> Verdict<L> {
    pub fn new(label: L) -> Self {
        Self {
            label,
            rationale: None,
            score: None,
            low_confidence: false,
            degraded: None,
            stats: None,
            checked_at: Utc::now(),
        }
    }

    pub fn with_rationale(mut self, rationale: Option<String>) -> Self {
        self.rationale = rationale;
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_low_confidence(mut self, low_confidence: bool) -> Self {
        self.low_confidence = low_confidence;
        self
    }

    pub fn with_stats(mut self, stats: ConsistencyStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Attach the degradation cause; its message doubles as the rationale
    /// unless one is already set.
    pub fn degraded_by(mut self, cause: CheckError) -> Self {
        if self.rationale.is_none() {
            self.rationale = Some(cause.to_string());
        }
        self.degraded = Some(cause);
        self
    }

    pub fn passes(&self) -> bool {
        self.label.passes()
    }
}

impl FactVerdict {
    pub fn inconclusive(cause: CheckError) -> Self {
        Self::new(FactLabel::Inconclusive).degraded_by(cause)
    }
}

impl ConsistencyVerdict {
    pub fn inconclusive(cause: CheckError) -> Self {
        Self::new(ConsistencyLabel::Inconclusive)
            .with_low_confidence(true)
            .degraded_by(cause)
    }
}
