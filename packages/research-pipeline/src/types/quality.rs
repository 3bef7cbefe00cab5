//! Quality score - the terminal artifact of a run.

use serde::{Deserialize, Serialize};

/// The composite quality assessment for a run.
///
/// Serialization is lossless: a round trip through the transport
/// representation reproduces identical field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Weighted overall score (0-100)
    pub overall: f64,

    /// Per-metric breakdown the overall was derived from
    pub breakdown: QualityBreakdown,

    /// Outstanding issues a reviewer should address
    #[serde(default)]
    pub issues: Vec<String>,

    /// Whether the document clears the publish gate.
    ///
    /// True only when the overall score meets the configured threshold
    /// and there are zero unresolved high-severity hallucination findings.
    pub ready_to_publish: bool,
}

/// The seven sub-metrics behind a quality score (all 0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    /// Mean credibility of the sources actually used
    pub source_credibility: f64,

    /// Share of verified claims carrying a citation
    pub citation_coverage: f64,

    /// Share of extracted claims that passed verification
    pub fact_verification: f64,

    /// How self-contained the chunked concepts are
    pub concept_clarity: f64,

    /// Diversity of source types and viewpoints
    pub perspective_diversity: f64,

    /// Recency of the evidence base
    pub currency: f64,

    /// Density of definitions, examples, and statistics in the output
    pub educational_value: f64,
}

impl QualityBreakdown {
    /// A zeroed breakdown, for runs that produced nothing.
    pub fn zero() -> Self {
        Self {
            source_credibility: 0.0,
            citation_coverage: 0.0,
            fact_verification: 0.0,
            concept_clarity: 0.0,
            perspective_diversity: 0.0,
            currency: 0.0,
            educational_value: 0.0,
        }
    }
}
