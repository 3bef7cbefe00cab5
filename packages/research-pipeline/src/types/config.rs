//! Pipeline configuration.
//!
//! Every threshold and weight the pipeline uses lives here, with builder
//! setters. Nothing is hard-coded in stage logic.

use serde::{Deserialize, Serialize};

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Weights for the five credibility sub-scores
    pub credibility_weights: CredibilityWeights,

    /// Sources scoring below this are filtered from downstream stages
    /// (kept in the audit trail). Default: 60.
    pub min_credibility: f64,

    /// Half-life in days for the recency sub-score
    pub recency_half_life_days: f64,

    /// Whether the topic is fast-moving (halves the recency half-life)
    pub fast_moving_topic: bool,

    /// Sufficiency threshold for the corrective retrieval loop (0-100).
    /// Default: 70.
    pub sufficiency_threshold: f64,

    /// Maximum retrieval iterations. Default: 3.
    pub max_retrieval_iterations: usize,

    /// Independent sources required before a claim is verified. Default: 2.
    pub min_supporting_sources: usize,

    /// Overall score required for `ready_to_publish`. Default: 80.
    pub publish_threshold: f64,

    /// Bounded worker pool size for per-source operations. Default: 3.
    pub concurrency: usize,

    /// Retry attempts for external calls. Default: 3.
    pub max_attempts: u32,

    /// Base backoff in milliseconds for the first retry. Default: 250.
    pub backoff_base_ms: u64,

    /// Per-attempt timeout in milliseconds. Default: 30s.
    pub call_timeout_ms: u64,

    /// Consecutive failures before the circuit opens. Default: 5.
    pub circuit_failure_threshold: u32,

    /// Minimum interval between language-model calls, in milliseconds.
    /// Default: 200.
    pub model_min_interval_ms: u64,

    /// Cache TTLs per call type
    pub cache_ttl: CacheTtl,

    /// Minimum words for a chunk to stand alone; smaller structural
    /// units merge with a neighbor. Default: 30.
    pub min_chunk_words: usize,

    /// Maximum words before a chunk is split at a paragraph boundary.
    /// Default: 300.
    pub max_chunk_words: usize,

    /// Lexical overlap below which adjacent paragraphs are judged to
    /// belong to different concepts (0.0-1.0). Default: 0.12.
    pub topic_shift_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            credibility_weights: CredibilityWeights::default(),
            min_credibility: 60.0,
            recency_half_life_days: 730.0,
            fast_moving_topic: false,
            sufficiency_threshold: 70.0,
            max_retrieval_iterations: 3,
            min_supporting_sources: 2,
            publish_threshold: 80.0,
            concurrency: 3,
            max_attempts: 3,
            backoff_base_ms: 250,
            call_timeout_ms: 30_000,
            circuit_failure_threshold: 5,
            model_min_interval_ms: 200,
            cache_ttl: CacheTtl::default(),
            min_chunk_words: 30,
            max_chunk_words: 300,
            topic_shift_threshold: 0.12,
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the credibility filter threshold.
    pub fn with_min_credibility(mut self, threshold: f64) -> Self {
        self.min_credibility = threshold;
        self
    }

    /// Set the sufficiency threshold.
    pub fn with_sufficiency_threshold(mut self, threshold: f64) -> Self {
        self.sufficiency_threshold = threshold;
        self
    }

    /// Set the publish gate.
    pub fn with_publish_threshold(mut self, threshold: f64) -> Self {
        self.publish_threshold = threshold;
        self
    }

    /// Set the worker pool size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Mark the topic as fast-moving for recency decay.
    pub fn fast_moving(mut self) -> Self {
        self.fast_moving_topic = true;
        self
    }

    /// Effective recency half-life in days.
    pub fn effective_half_life_days(&self) -> f64 {
        if self.fast_moving_topic {
            self.recency_half_life_days / 2.0
        } else {
            self.recency_half_life_days
        }
    }
}

/// Weights for the credibility sub-scores. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityWeights {
    pub authority: f64,
    pub recency: f64,
    pub citation_strength: f64,
    pub methodology: f64,
    pub bias_risk: f64,
}

impl Default for CredibilityWeights {
    fn default() -> Self {
        Self {
            authority: 0.30,
            recency: 0.20,
            citation_strength: 0.20,
            methodology: 0.15,
            bias_risk: 0.15,
        }
    }
}

impl CredibilityWeights {
    /// Sum of the weights; callers may assert this is ~1.0.
    pub fn total(&self) -> f64 {
        self.authority + self.recency + self.citation_strength + self.methodology + self.bias_risk
    }
}

/// Cache TTLs per external call type, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheTtl {
    /// Search results move quickly. Default: 6 hours.
    pub search_secs: u64,

    /// Scraped page content is comparatively static. Default: 7 days.
    pub scrape_secs: u64,

    /// Embeddings are pure functions of their input. Default: 30 days.
    pub embed_secs: u64,

    /// Model analyses. Default: 24 hours.
    pub analyze_secs: u64,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            search_secs: 6 * 3600,
            scrape_secs: 7 * 24 * 3600,
            embed_secs: 30 * 24 * 3600,
            analyze_secs: 24 * 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let weights = CredibilityWeights::default();
        assert!((weights.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fast_moving_halves_half_life() {
        let config = PipelineConfig::new().fast_moving();
        assert_eq!(
            config.effective_half_life_days(),
            config.recency_half_life_days / 2.0
        );
    }
}
