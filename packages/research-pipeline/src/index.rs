//! Hybrid chunk index - keyword and vector search over ingested chunks.
//!
//! Supports incremental insertion and is safe to query concurrently with
//! insertion of other documents' chunks (interior async RwLock). Both
//! search paths return empty results - never an error - when the index
//! holds nothing.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::types::chunk::Chunk;

/// A chunk with its retrieval score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Hybrid keyword + vector index over chunks.
#[derive(Default)]
pub struct ChunkIndex {
    chunks: RwLock<Vec<Chunk>>,
}

impl ChunkIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one chunk.
    pub async fn insert(&self, chunk: Chunk) {
        self.chunks.write().await.push(chunk);
    }

    /// Insert a batch of chunks.
    pub async fn insert_batch(&self, batch: impl IntoIterator<Item = Chunk>) {
        self.chunks.write().await.extend(batch);
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    /// Whether the index is empty.
    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    /// All indexed chunks, in insertion order.
    pub async fn all(&self) -> Vec<Chunk> {
        self.chunks.read().await.clone()
    }

    /// Keyword search: rank chunks by query-term coverage.
    pub async fn search(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        let chunks = self.chunks.read().await;
        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .map(|chunk| ScoredChunk {
                score: keyword_match(query, &chunk.text),
                chunk: chunk.clone(),
            })
            .filter(|s| s.score > 0.0)
            .collect();

        sort_scored(&mut scored);
        scored.truncate(k);
        scored
    }

    /// Nearest-neighbor search over chunk embeddings.
    ///
    /// Chunks without an embedding are skipped.
    pub async fn similarity_search(&self, vector: &[f32], k: usize) -> Vec<ScoredChunk> {
        let chunks = self.chunks.read().await;
        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .filter_map(|chunk| {
                chunk.embedding.as_ref().map(|emb| ScoredChunk {
                    score: cosine_similarity(vector, emb),
                    chunk: chunk.clone(),
                })
            })
            .collect();

        sort_scored(&mut scored);
        scored.truncate(k);
        scored
    }

    /// Hybrid search: keyword and vector rankings fused with
    /// Reciprocal Rank Fusion, keyword-boosted for specific terms.
    pub async fn hybrid_search(
        &self,
        query: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Vec<ScoredChunk> {
        let (semantic_weight, keyword_weight) = fusion_weights(query);

        let semantic = self.similarity_search(query_embedding, k * 2).await;
        let keyword = self.search(query, k * 2).await;

        hybrid_rank(&semantic, &keyword, semantic_weight, keyword_weight, k)
    }
}

/// Cosine similarity between two vectors.
///
/// Dimension mismatches and zero vectors score 0 rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Term-coverage keyword score.
pub fn keyword_match(query: &str, text: &str) -> f32 {
    let query_lower = query.to_lowercase();
    let query_terms: Vec<&str> = query_lower
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .collect();

    if query_terms.is_empty() {
        return 0.0;
    }

    let text_lower = text.to_lowercase();
    let matches = query_terms
        .iter()
        .filter(|term| text_lower.contains(*term))
        .count();

    matches as f32 / query_terms.len() as f32
}

/// Whether the query contains terms that benefit from keyword search:
/// quoted phrases, numbers, mid-sentence proper nouns, technical tokens.
pub fn has_specific_terms(query: &str) -> bool {
    if query.contains('"') {
        return true;
    }

    let words: Vec<&str> = query.split_whitespace().collect();

    if words.iter().any(|w| w.chars().any(|c| c.is_numeric())) {
        return true;
    }

    let has_proper_nouns = words
        .iter()
        .skip(1)
        .any(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false));
    if has_proper_nouns {
        return true;
    }

    words.iter().any(|w| w.contains('-') || w.contains('_'))
}

/// Semantic/keyword weights for fusion, boosting keyword weight when the
/// query carries specific terms.
fn fusion_weights(query: &str) -> (f32, f32) {
    const BASE_SEMANTIC: f32 = 0.6;
    const SPECIFIC_BOOST: f32 = 1.5;

    let base_keyword = 1.0 - BASE_SEMANTIC;
    if has_specific_terms(query) {
        let boosted = (base_keyword * SPECIFIC_BOOST).min(0.8);
        (1.0 - boosted, boosted)
    } else {
        (BASE_SEMANTIC, base_keyword)
    }
}

/// Combine two rankings using Reciprocal Rank Fusion.
fn hybrid_rank(
    semantic: &[ScoredChunk],
    keyword: &[ScoredChunk],
    semantic_weight: f32,
    keyword_weight: f32,
    k: usize,
) -> Vec<ScoredChunk> {
    const K: f32 = 60.0;
    let mut fused: HashMap<uuid::Uuid, ScoredChunk> = HashMap::new();

    for (rank, scored) in semantic.iter().enumerate() {
        let rrf = semantic_weight / (K + rank as f32 + 1.0);
        fused
            .entry(scored.chunk.id)
            .and_modify(|s| s.score += rrf)
            .or_insert_with(|| ScoredChunk {
                chunk: scored.chunk.clone(),
                score: rrf,
            });
    }

    for (rank, scored) in keyword.iter().enumerate() {
        let rrf = keyword_weight / (K + rank as f32 + 1.0);
        fused
            .entry(scored.chunk.id)
            .and_modify(|s| s.score += rrf)
            .or_insert_with(|| ScoredChunk {
                chunk: scored.chunk.clone(),
                score: rrf,
            });
    }

    let mut combined: Vec<ScoredChunk> = fused.into_values().collect();
    sort_scored(&mut combined);
    combined.truncate(k);
    combined
}

/// Sort by score descending with a stable structural tiebreak, so ranking
/// does not depend on hash-map iteration order.
fn sort_scored(scored: &mut [ScoredChunk]) {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.source_id.cmp(&b.chunk.source_id))
            .then_with(|| a.chunk.position.cmp(&b.chunk.position))
    });
}
