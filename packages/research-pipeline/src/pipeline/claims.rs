//! Claim extraction and multi-source verification.
//!
//! Segments generated text into candidate atomic statements, keeps the ones
//! carrying factual markers, and cross-checks each against the chunk pool
//! via keyword overlap and semantic similarity. A claim is verified only
//! when at least two independent sources support it without a direct
//! numeric conflict; disagreeing sources are recorded on both sides and
//! flagged for review instead of silently resolved.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::index::{cosine_similarity, keyword_match, ChunkIndex};
use crate::pipeline::chunker::split_sentences;
use crate::traits::embedder::{placeholder_embedding, Embedder};
use crate::types::claim::{Claim, ClaimType, Verification};
use crate::types::config::PipelineConfig;

/// Keyword overlap at or above this counts as direct support.
const SUPPORT_OVERLAP: f32 = 0.5;

/// Cosine similarity at or above this counts as semantic support, provided
/// there is at least weak keyword overlap.
const SEMANTIC_SUPPORT: f32 = 0.75;
const WEAK_OVERLAP: f32 = 0.25;

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"))
}

fn quote_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[^"]+""#).expect("valid regex"))
}

const ASSERTION_MARKERS: &[&str] = &[
    " shows ", " showed ", " demonstrates ", " increases ", " decreases ",
    " reduces ", " improves ", " causes ", " results in ", " leads to ",
    " outperforms ", " achieves ",
];

const OPINION_MARKERS: &[&str] = &[
    "should ", "arguably", "we believe", "in our view", "probably", "likely the best",
];

/// Extract candidate claims and verify each against the chunk pool.
pub async fn extract_and_verify<E: Embedder>(
    text: &str,
    index: &ChunkIndex,
    embedder: &E,
    config: &PipelineConfig,
) -> Vec<Claim> {
    let chunks = index.all().await;
    let mut claims = Vec::new();

    for sentence in split_sentences(text) {
        let Some(claim_type) = classify_candidate(&sentence) else {
            continue;
        };

        let claim_embedding = match embedder.embed(&sentence).await {
            Ok(v) => v,
            Err(_) => placeholder_embedding(&sentence, embedder.dimension()),
        };

        let mut supporting: BTreeSet<Uuid> = BTreeSet::new();
        let mut conflicting: BTreeSet<Uuid> = BTreeSet::new();
        let sentence_numbers = extract_numbers(&sentence);

        for chunk in &chunks {
            let overlap = keyword_match(&sentence, &chunk.text);
            let semantic = chunk
                .embedding
                .as_ref()
                .map(|emb| cosine_similarity(&claim_embedding, emb))
                .unwrap_or(0.0);

            let candidate_support = overlap >= SUPPORT_OVERLAP
                || (semantic >= SEMANTIC_SUPPORT && overlap >= WEAK_OVERLAP);
            if !candidate_support {
                continue;
            }

            if !sentence_numbers.is_empty() {
                let chunk_numbers = extract_numbers(&chunk.text);
                if !chunk_numbers.is_empty() && sentence_numbers.is_disjoint(&chunk_numbers) {
                    // Same topic, different numbers: a direct factual
                    // conflict, recorded rather than resolved.
                    conflicting.insert(chunk.source_id);
                    continue;
                }
            }

            supporting.insert(chunk.source_id);
        }

        // A source cannot both support and contradict the same claim;
        // treat it as conflicted.
        supporting.retain(|id| !conflicting.contains(id));

        let claim = build_claim(
            sentence,
            claim_type,
            supporting.into_iter().collect(),
            conflicting.into_iter().collect(),
            config,
        );
        debug!(
            statement = %claim.statement,
            verified = claim.verified,
            supporting = claim.supporting_sources.len(),
            "extracted claim"
        );
        claims.push(claim);
    }

    claims
}

/// Decide whether a sentence is a checkable candidate, and of what type.
///
/// Candidates carry factual markers: numbers, quoted text, named entities,
/// or strong assertion verbs. Everything else is skipped.
pub fn classify_candidate(sentence: &str) -> Option<ClaimType> {
    let trimmed = sentence.trim();
    if trimmed.split_whitespace().count() < 4 {
        return None;
    }

    if quote_pattern().is_match(trimmed) {
        return Some(ClaimType::Quote);
    }

    let lower = trimmed.to_lowercase();
    if OPINION_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(ClaimType::Opinion);
    }

    if number_pattern().is_match(trimmed) {
        return Some(ClaimType::Statistic);
    }

    let has_named_entity = trimmed
        .split_whitespace()
        .skip(1)
        .any(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false));
    let has_assertion = ASSERTION_MARKERS.iter().any(|m| lower.contains(m));
    if has_named_entity || has_assertion {
        return Some(ClaimType::Fact);
    }

    None
}

fn build_claim(
    statement: String,
    claim_type: ClaimType,
    supporting: Vec<Uuid>,
    conflicting: Vec<Uuid>,
    config: &PipelineConfig,
) -> Claim {
    let has_conflict = !conflicting.is_empty();
    let verified = !has_conflict && supporting.len() >= config.min_supporting_sources;

    let confidence = if has_conflict {
        0.0
    } else {
        match supporting.len() {
            0 => 0.0,
            1 => 40.0,
            n => (55.0 + 15.0 * n as f64).min(95.0),
        }
    };

    Claim {
        statement,
        claim_type,
        supporting_sources: supporting.clone(),
        verified,
        confidence,
        verification: Verification {
            supporting,
            conflicting,
            sources_agree: !has_conflict,
            needs_review: has_conflict,
        },
    }
}

/// Normalized numeric tokens in a text.
fn extract_numbers(text: &str) -> BTreeSet<String> {
    number_pattern()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(".0").to_string())
        .collect()
}

/// Group claims by supporting source for reporting.
pub fn claims_by_source(claims: &[Claim]) -> HashMap<Uuid, Vec<usize>> {
    let mut map: HashMap<Uuid, Vec<usize>> = HashMap::new();
    for (i, claim) in claims.iter().enumerate() {
        for source_id in &claim.supporting_sources {
            map.entry(*source_id).or_default().push(i);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEmbedder;
    use crate::types::chunk::{Chunk, ConceptType};

    async fn pool(entries: &[(Uuid, &str)]) -> ChunkIndex {
        let index = ChunkIndex::new();
        for (i, (source_id, text)) in entries.iter().enumerate() {
            let mut chunk = Chunk::new(*source_id, *text, ConceptType::Narrative, i);
            chunk.embedding = Some(placeholder_embedding(text, 8));
            index.insert(chunk).await;
        }
        index
    }

    #[tokio::test]
    async fn two_agreeing_sources_verify_a_statistic() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let index = pool(&[
            (a, "Adopters reported a 40% cost reduction within 18-24 months."),
            (b, "Survey data shows 40% cost reduction within 18 to 24 months of rollout."),
        ])
        .await;
        let embedder = MockEmbedder::new(8);
        let config = PipelineConfig::default();

        let claims = extract_and_verify(
            "Teams achieved a 40% cost reduction within 18-24 months.",
            &index,
            &embedder,
            &config,
        )
        .await;

        assert_eq!(claims.len(), 1);
        let claim = &claims[0];
        assert_eq!(claim.claim_type, ClaimType::Statistic);
        assert!(claim.verified);
        assert!(claim.confidence > 0.0);
        assert_eq!(claim.supporting_sources.len(), 2);
        assert!(claim.has_independent_support());
    }

    #[tokio::test]
    async fn single_source_claim_is_never_verified() {
        let a = Uuid::new_v4();
        let index = pool(&[(
            a,
            "Throughput reached 12000 requests per second in the benchmark.",
        )])
        .await;
        let embedder = MockEmbedder::new(8);
        let config = PipelineConfig::default();

        let claims = extract_and_verify(
            "The benchmark throughput reached 12000 requests per second.",
            &index,
            &embedder,
            &config,
        )
        .await;

        assert_eq!(claims.len(), 1);
        assert!(!claims[0].verified);
        assert_eq!(claims[0].supporting_sources.len(), 1);
        assert!(claims[0].confidence > 0.0);
    }

    #[tokio::test]
    async fn contradictory_numbers_flag_review_with_zero_confidence() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let index = pool(&[
            (a, "Median failover time was 2 seconds across the fleet measurements."),
            (b, "Median failover time was 9 seconds across the fleet measurements."),
        ])
        .await;
        let embedder = MockEmbedder::new(8);
        let config = PipelineConfig::default();

        let claims = extract_and_verify(
            "Median failover time was 2 seconds across the fleet measurements.",
            &index,
            &embedder,
            &config,
        )
        .await;

        assert_eq!(claims.len(), 1);
        let claim = &claims[0];
        assert!(!claim.verified);
        assert!(claim.verification.needs_review);
        assert_eq!(claim.confidence, 0.0);
        assert!(!claim.verification.sources_agree);
        assert!(!claim.verification.conflicting.is_empty());
        assert!(!claim.verification.supporting.is_empty());
    }

    #[tokio::test]
    async fn sentences_without_factual_markers_are_skipped() {
        let index = pool(&[]).await;
        let embedder = MockEmbedder::new(8);
        let config = PipelineConfig::default();

        let claims = extract_and_verify(
            "this topic matters a great deal to everyone involved.",
            &index,
            &embedder,
            &config,
        )
        .await;
        assert!(claims.is_empty());
    }

    #[test]
    fn candidate_classification() {
        assert_eq!(
            classify_candidate("Latency dropped 40% after the change."),
            Some(ClaimType::Statistic)
        );
        assert_eq!(
            classify_candidate("The maintainer said \"we ship weekly\" last year."),
            Some(ClaimType::Quote)
        );
        assert_eq!(
            classify_candidate("Teams should probably adopt the simpler design."),
            Some(ClaimType::Opinion)
        );
        assert_eq!(
            classify_candidate("The broker demonstrates strong ordering guarantees."),
            Some(ClaimType::Fact)
        );
        assert_eq!(classify_candidate("too short here"), None);
    }

    #[test]
    fn number_extraction_normalizes() {
        let numbers = extract_numbers("40% within 18-24 months, about 40.0 again");
        assert!(numbers.contains("40"));
        assert!(numbers.contains("18"));
        assert!(numbers.contains("24"));
    }
}
