//! Research request and result types - the pipeline's outer contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::model::ExtractedItem;
use crate::types::chunk::Chunk;
use crate::types::citation::Citation;
use crate::types::claim::Claim;
use crate::types::finding::{BiasFinding, HallucinationFinding};
use crate::types::quality::QualityScore;
use crate::types::source::Source;

/// A request to research one topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// The topic to research
    pub topic: String,

    /// How deep the retrieval and synthesis should go
    pub depth: Depth,

    /// Who the output is written for
    pub audience: Audience,

    /// Maximum number of sources to acquire
    pub max_sources: usize,
}

impl ResearchRequest {
    /// Create a request with default depth and audience.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            depth: Depth::Standard,
            audience: Audience::Practitioner,
            max_sources: 10,
        }
    }

    /// Set the depth.
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    /// Set the audience.
    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    /// Set the source cap.
    pub fn with_max_sources(mut self, max: usize) -> Self {
        self.max_sources = max;
        self
    }
}

/// How deep a run should go.
///
/// Depth scales the retrieval breadth (top-k) and the number of
/// gap-refinement sub-queries attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Depth {
    /// Quick survey: fewer sources, one retrieval pass
    Overview,

    /// The default
    Standard,

    /// Exhaustive: wider retrieval, full refinement budget
    Deep,
}

impl Depth {
    /// Top-k chunks retrieved per query at this depth.
    pub fn retrieval_k(&self) -> usize {
        match self {
            Depth::Overview => 5,
            Depth::Standard => 10,
            Depth::Deep => 20,
        }
    }
}

/// Who the synthesized document is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Audience {
    /// No assumed background
    General,

    /// Working familiarity with the domain
    Practitioner,

    /// Full technical depth
    Expert,
}

/// Everything a run produced, ready for the rendering layer.
///
/// A run always completes with a result; failure manifests as a low
/// quality score and a populated issue list, not a thrown error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    /// The request that produced this result
    pub request: ResearchRequest,

    /// Every source acquired, including the ones filtered by the
    /// credibility gate (the audit trail)
    pub sources: Vec<Source>,

    /// Chunks produced from the credible sources
    pub chunks: Vec<Chunk>,

    /// Structured items extracted from the retrieved chunks
    #[serde(default)]
    pub extracted_items: Vec<ExtractedItem>,

    /// Claims extracted from the synthesized document
    pub claims: Vec<Claim>,

    /// Citations assigned to sources backing verified claims
    pub citations: Vec<Citation>,

    /// Bias findings over the source set and document
    pub bias_findings: Vec<BiasFinding>,

    /// Hallucination findings from the independent audit pass
    pub hallucination_findings: Vec<HallucinationFinding>,

    /// The composite quality assessment
    pub quality: QualityScore,

    /// The long-form document with inline citation markers and a
    /// trailing bibliography
    pub document: String,

    /// Sub-topics the retrieval loop could not cover sufficiently
    #[serde(default)]
    pub open_gaps: Vec<String>,

    /// Degraded units and dropped calls recorded during the run
    #[serde(default)]
    pub warnings: Vec<String>,

    /// Run metadata
    pub metadata: RunMetadata,
}

/// Timestamps and tallies for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: DateTime<Utc>,

    /// Sources acquired before the credibility gate
    pub sources_acquired: usize,

    /// Sources that passed the credibility gate
    pub sources_credible: usize,

    /// Retrieval iterations performed
    pub retrieval_iterations: usize,
}
