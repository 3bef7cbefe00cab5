//! Quality scorer - the composite publish-readiness decision.
//!
//! A pure aggregation over the artifacts the earlier stages produced: no
//! retrieval, no network, re-runnable offline against cached intermediates.

use crate::pipeline::citations::CitationSet;
use crate::types::chunk::{Chunk, ConceptType};
use crate::types::claim::Claim;
use crate::types::config::PipelineConfig;
use crate::types::finding::{BiasFinding, HallucinationFinding, Severity};
use crate::types::quality::{QualityBreakdown, QualityScore};
use crate::types::source::Source;

/// Weights over the seven sub-metrics. Sum to 1.0.
const W_SOURCE_CREDIBILITY: f64 = 0.20;
const W_CITATION_COVERAGE: f64 = 0.15;
const W_FACT_VERIFICATION: f64 = 0.25;
const W_CONCEPT_CLARITY: f64 = 0.10;
const W_PERSPECTIVE_DIVERSITY: f64 = 0.10;
const W_CURRENCY: f64 = 0.10;
const W_EDUCATIONAL_VALUE: f64 = 0.10;

/// Everything the scorer aggregates.
pub struct QualityInputs<'a> {
    /// The credible sources the run actually used
    pub sources: &'a [Source],
    pub chunks: &'a [Chunk],
    pub claims: &'a [Claim],
    pub citations: &'a CitationSet,
    pub bias_findings: &'a [BiasFinding],
    pub hallucination_findings: &'a [HallucinationFinding],
    /// Sub-topics the retrieval loop left uncovered
    pub open_gaps: &'a [String],
}

/// Aggregate all signals into one quality score and a publish decision.
pub fn compute_quality(inputs: &QualityInputs<'_>, config: &PipelineConfig) -> QualityScore {
    let breakdown = QualityBreakdown {
        source_credibility: mean_credibility(inputs.sources),
        citation_coverage: citation_coverage(inputs.claims, inputs.citations),
        fact_verification: fact_verification(inputs.claims),
        concept_clarity: concept_clarity(inputs.chunks, config),
        perspective_diversity: perspective_diversity(inputs.sources),
        currency: currency(inputs.sources),
        educational_value: educational_value(inputs.chunks),
    };

    let overall = (breakdown.source_credibility * W_SOURCE_CREDIBILITY
        + breakdown.citation_coverage * W_CITATION_COVERAGE
        + breakdown.fact_verification * W_FACT_VERIFICATION
        + breakdown.concept_clarity * W_CONCEPT_CLARITY
        + breakdown.perspective_diversity * W_PERSPECTIVE_DIVERSITY
        + breakdown.currency * W_CURRENCY
        + breakdown.educational_value * W_EDUCATIONAL_VALUE)
        .clamp(0.0, 100.0);

    let issues = collect_issues(inputs, &breakdown);
    let ready_to_publish = publish_gate(
        overall,
        inputs.hallucination_findings,
        config.publish_threshold,
    );

    QualityScore {
        overall,
        breakdown,
        issues,
        ready_to_publish,
    }
}

/// The publish gate: overall score at or above the threshold AND zero
/// unresolved high-severity hallucination findings.
pub fn publish_gate(
    overall: f64,
    hallucination_findings: &[HallucinationFinding],
    threshold: f64,
) -> bool {
    let has_high = hallucination_findings
        .iter()
        .any(|f| f.severity == Severity::High);
    overall >= threshold && !has_high
}

fn mean_credibility(sources: &[Source]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }
    sources.iter().map(|s| s.credibility_score()).sum::<f64>() / sources.len() as f64
}

fn citation_coverage(claims: &[Claim], citations: &CitationSet) -> f64 {
    let verified: Vec<&Claim> = claims.iter().filter(|c| c.verified).collect();
    if verified.is_empty() {
        return 0.0;
    }
    let cited = verified
        .iter()
        .filter(|c| {
            c.supporting_sources
                .iter()
                .any(|id| citations.marker_for(*id).is_some())
        })
        .count();
    cited as f64 / verified.len() as f64 * 100.0
}

fn fact_verification(claims: &[Claim]) -> f64 {
    if claims.is_empty() {
        return 0.0;
    }
    let verified = claims.iter().filter(|c| c.verified).count();
    verified as f64 / claims.len() as f64 * 100.0
}

/// Share of chunks sized to stand alone: big enough to be self-contained,
/// small enough to hold one concept.
fn concept_clarity(chunks: &[Chunk], config: &PipelineConfig) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }
    let well_sized = chunks
        .iter()
        .filter(|c| {
            let words = c.word_count();
            words >= config.min_chunk_words / 2 && words <= config.max_chunk_words
        })
        .count();
    well_sized as f64 / chunks.len() as f64 * 100.0
}

/// Distinct source types in the set; three or more reads as full marks.
fn perspective_diversity(sources: &[Source]) -> f64 {
    let distinct: std::collections::HashSet<_> =
        sources.iter().map(|s| s.source_type).collect();
    (distinct.len() as f64 / 3.0 * 100.0).min(100.0)
}

/// Mean recency sub-score of the sources.
fn currency(sources: &[Source]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }
    sources
        .iter()
        .map(|s| {
            s.credibility()
                .map(|c| c.breakdown.recency)
                .unwrap_or(50.0)
        })
        .sum::<f64>()
        / sources.len() as f64
}

/// Density of definitions, examples, and statistics among the chunks.
fn educational_value(chunks: &[Chunk]) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }
    let instructive = chunks
        .iter()
        .filter(|c| {
            matches!(
                c.concept,
                ConceptType::Definition
                    | ConceptType::Example
                    | ConceptType::Statistic
                    | ConceptType::Procedure
            )
        })
        .count();
    (instructive as f64 / chunks.len() as f64 * 150.0).min(100.0)
}

fn collect_issues(inputs: &QualityInputs<'_>, breakdown: &QualityBreakdown) -> Vec<String> {
    let mut issues = Vec::new();

    for claim in inputs.claims.iter().filter(|c| c.verification.needs_review) {
        issues.push(format!("claim needs review: {}", claim.statement));
    }

    let high_hallucinations = inputs
        .hallucination_findings
        .iter()
        .filter(|f| f.severity == Severity::High)
        .count();
    if high_hallucinations > 0 {
        issues.push(format!(
            "{} unsupported assertions must be removed or cited",
            high_hallucinations
        ));
    }

    for finding in inputs
        .bias_findings
        .iter()
        .filter(|f| f.severity >= Severity::Medium)
    {
        issues.push(format!("bias risk: {}", finding.description));
    }

    if !inputs.open_gaps.is_empty() {
        issues.push(format!(
            "retrieval left {} sub-topics uncovered",
            inputs.open_gaps.len()
        ));
    }

    if breakdown.fact_verification < 50.0 {
        issues.push("fewer than half of the extracted claims verified".to_string());
    }

    issues
}
