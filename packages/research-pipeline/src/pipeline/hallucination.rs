//! Hallucination detector - a second, independent audit pass.
//!
//! Re-extracts factual assertions from the *final* text (post-editing text
//! may differ from the text claims were extracted from) and verifies each
//! is traceable to at least one source. This pass does not assume the
//! claim list from verification is exhaustive or still accurate.

use tracing::debug;

use crate::index::{keyword_match, ChunkIndex};
use crate::pipeline::chunker::split_sentences;
use crate::pipeline::claims::classify_candidate;
use crate::types::claim::Claim;
use crate::types::finding::HallucinationFinding;

/// Overlap below which an assertion counts as untraceable.
const TRACE_OVERLAP: f32 = 0.4;

/// Confidence below which single-source support counts as weak.
const WEAK_CONFIDENCE: f64 = 50.0;

/// Audit the final text against the chunk pool and the verified claims.
pub async fn audit(
    final_text: &str,
    index: &ChunkIndex,
    claims: &[Claim],
) -> Vec<HallucinationFinding> {
    let chunks = index.all().await;
    let mut findings = Vec::new();

    // Audit the body only; bibliography entries are not assertions.
    let body = final_text
        .split("\n## References")
        .next()
        .unwrap_or(final_text);

    for sentence in split_sentences(body) {
        // Inline citation markers would depress lexical overlap; strip them.
        let stripped = strip_markers(&sentence);
        if classify_candidate(&stripped).is_none() {
            continue;
        }

        // Best lexical trace into the source pool
        let best: Option<(f32, uuid::Uuid)> = chunks
            .iter()
            .map(|chunk| (keyword_match(&stripped, &chunk.text), chunk.source_id))
            .filter(|(score, _)| *score > 0.0)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            None => {
                debug!(assertion = %stripped, "untraceable assertion");
                findings.push(HallucinationFinding::unsupported(stripped));
            }
            Some((score, _)) if score < TRACE_OVERLAP => {
                debug!(assertion = %stripped, score, "untraceable assertion");
                findings.push(HallucinationFinding::unsupported(stripped));
            }
            Some((_, source_id)) => {
                // Traceable. Check whether its support is thin: a matching
                // claim that rests on one source with low confidence.
                if let Some(claim) = matching_claim(&stripped, claims) {
                    if claim.supporting_sources.len() == 1 && claim.confidence < WEAK_CONFIDENCE {
                        findings.push(HallucinationFinding::weakly_supported(
                            stripped,
                            claim.supporting_sources[0],
                        ));
                    }
                } else if chunks
                    .iter()
                    .filter(|c| keyword_match(&stripped, &c.text) >= TRACE_OVERLAP)
                    .map(|c| c.source_id)
                    .collect::<std::collections::HashSet<_>>()
                    .len()
                    == 1
                {
                    // Traceable to exactly one source and absent from the
                    // verified claim list: weak support.
                    findings.push(HallucinationFinding::weakly_supported(stripped, source_id));
                }
            }
        }
    }

    findings
}

/// Remove inline `[n]` markers before matching.
fn strip_markers(sentence: &str) -> String {
    let mut out = String::with_capacity(sentence.len());
    let mut in_marker = false;
    for ch in sentence.chars() {
        match ch {
            '[' => in_marker = true,
            ']' => in_marker = false,
            _ if !in_marker => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Find the verified claim whose statement best matches an assertion.
fn matching_claim<'a>(assertion: &str, claims: &'a [Claim]) -> Option<&'a Claim> {
    claims
        .iter()
        .map(|claim| (keyword_match(assertion, &claim.statement), claim))
        .filter(|(score, _)| *score >= 0.7)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, claim)| claim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chunk::{Chunk, ConceptType};
    use crate::types::finding::Severity;
    use uuid::Uuid;

    async fn pool(entries: &[&str]) -> ChunkIndex {
        let index = ChunkIndex::new();
        for (i, text) in entries.iter().enumerate() {
            index
                .insert(Chunk::new(Uuid::new_v4(), *text, ConceptType::Narrative, i))
                .await;
        }
        index
    }

    #[tokio::test]
    async fn untraceable_assertion_is_high_severity() {
        let index = pool(&["Brokers replicate partitions across three nodes."]).await;

        let findings = audit(
            "Quantum routers eliminated 99% of packet loss overnight.",
            &index,
            &[],
        )
        .await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[tokio::test]
    async fn traceable_assertion_passes() {
        let index = pool(&[
            "Brokers replicate partitions across three nodes for durability.",
            "Brokers replicate partitions across nodes for durability reasons.",
        ])
        .await;

        let findings = audit(
            "Brokers replicate partitions across three nodes for durability.",
            &index,
            &[],
        )
        .await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn single_source_assertion_is_medium_severity() {
        let index = pool(&["Compaction reclaimed 30 gigabytes in the trial run."]).await;

        let findings = audit(
            "Compaction reclaimed 30 gigabytes in the trial run.",
            &index,
            &[],
        )
        .await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[tokio::test]
    async fn non_factual_sentences_are_ignored() {
        let index = pool(&[]).await;
        let findings = audit("a gentle introduction follows below.", &index, &[]).await;
        assert!(findings.is_empty());
    }

    #[test]
    fn marker_stripping() {
        assert_eq!(
            strip_markers("Latency fell 40% [1][2]."),
            "Latency fell 40% ."
        );
    }
}
