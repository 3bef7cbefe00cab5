//! Advisory findings - bias checks and hallucination flags.
//!
//! These are produced, never mutated. They are advisory records for the
//! caller, not hard entities of the run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of an advisory finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Category of a bias finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BiasCategory {
    /// One source type or publication dominates the set
    SourceDiversity,

    /// Skewed sentiment or uncited vague attribution in the text
    Presentation,

    /// Narrow selection of what was read: date-range clustering,
    /// declared conflicts of interest, over-reliance on one source type
    Selection,

    /// Absolute-certainty language or missing contrasting viewpoints
    Confirmation,
}

/// A bias risk detected in the source set or the generated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasFinding {
    /// Which check produced this finding
    pub category: BiasCategory,

    /// How serious the risk is
    pub severity: Severity,

    /// Human-readable description of the pattern
    pub description: String,

    /// Sources implicated, when the check is source-level
    #[serde(default)]
    pub affected_sources: Vec<Uuid>,

    /// Suggested mitigation
    pub mitigation: String,
}

impl BiasFinding {
    /// Create a new bias finding.
    pub fn new(
        category: BiasCategory,
        severity: Severity,
        description: impl Into<String>,
        mitigation: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            description: description.into(),
            affected_sources: Vec::new(),
            mitigation: mitigation.into(),
        }
    }

    /// Attach the implicated sources.
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Uuid>) -> Self {
        self.affected_sources = sources.into_iter().collect();
        self
    }
}

/// An assertion in the final text that lacks adequate source support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallucinationFinding {
    /// The unsupported or weakly supported assertion
    pub assertion: String,

    /// High = untraceable to any source; Medium = weak single-source support
    pub severity: Severity,

    /// Why this assertion was flagged
    pub description: String,

    /// Sources that partially support the assertion, if any
    #[serde(default)]
    pub affected_sources: Vec<Uuid>,

    /// Suggested mitigation (remove, cite, or soften)
    pub mitigation: String,
}

impl HallucinationFinding {
    /// Flag an assertion with no traceable support.
    pub fn unsupported(assertion: impl Into<String>) -> Self {
        Self {
            assertion: assertion.into(),
            severity: Severity::High,
            description: "assertion is not traceable to any acquired source".into(),
            affected_sources: Vec::new(),
            mitigation: "remove the assertion or add a citable source".into(),
        }
    }

    /// Flag an assertion with weak, single-source support.
    pub fn weakly_supported(assertion: impl Into<String>, source: Uuid) -> Self {
        Self {
            assertion: assertion.into(),
            severity: Severity::Medium,
            description: "assertion rests on a single low-confidence source".into(),
            affected_sources: vec![source],
            mitigation: "corroborate with an independent source or soften the wording".into(),
        }
    }
}
