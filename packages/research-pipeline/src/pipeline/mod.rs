//! The research pipeline - orchestration of all stages.
//!
//! Stage order: acquisition, credibility gate, chunking, embedding and
//! indexing, corrective retrieval, synthesis, claim verification, citation
//! assignment, rendering, hallucination audit, bias checks, quality score.
//! Per-source work runs on a bounded worker pool; cross-source aggregation
//! is single-threaded and runs only after the stage barrier. A run always
//! completes with a result; failure manifests as a low score and populated
//! warnings, except for configuration errors, which are fatal up front.

pub mod acquire;
pub mod bias;
pub mod chunker;
pub mod citations;
pub mod claims;
pub mod credibility;
pub mod hallucination;
pub mod prompts;
pub mod quality;
pub mod report;
pub mod retrieval;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::cache::{CallKind, TtlCache};
use crate::error::{PipelineError, Result};
use crate::index::ChunkIndex;
use crate::resilience::Resilience;
use crate::traits::embedder::{placeholder_embedding, Embedder};
use crate::traits::model::{
    parse_extracted_items, ExtractedItem, LanguageModel, ModelResponse, RateLimitedModel,
};
use crate::traits::search::SearchProvider;
use crate::types::chunk::Chunk;
use crate::types::citation::CitationStyle;
use crate::types::config::PipelineConfig;
use crate::types::request::{Depth, ResearchRequest, ResearchResult, RunMetadata};
use crate::types::source::Source;

use self::citations::CitationSet;
use self::quality::QualityInputs;
use self::retrieval::CorrectiveRetriever;

/// The research synthesis pipeline.
///
/// Generic over its three injected capabilities; each instance owns its own
/// cache and resilience state, so parallel pipelines never share anything.
pub struct Pipeline<P: SearchProvider, E: Embedder, M: LanguageModel> {
    provider: P,
    embedder: E,
    model: RateLimitedModel<M>,
    config: PipelineConfig,
    resilience: Resilience,
    cache: TtlCache,
}

impl<P: SearchProvider, E: Embedder, M: LanguageModel> Pipeline<P, E, M> {
    /// Create a pipeline, validating the configuration.
    ///
    /// Configuration errors are fatal: no partial result would be
    /// meaningful, so they are raised here rather than during a run.
    pub fn new(provider: P, embedder: E, model: M, config: PipelineConfig) -> Result<Self> {
        validate_config(&config)?;

        let resilience = Resilience::new(
            config.max_attempts,
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.call_timeout_ms),
        )
        .with_failure_threshold(config.circuit_failure_threshold);

        let model = RateLimitedModel::new(
            model,
            Duration::from_millis(config.model_min_interval_ms.max(1)),
        );
        let cache = TtlCache::new(config.cache_ttl.clone());

        Ok(Self {
            provider,
            embedder,
            model,
            config,
            resilience,
            cache,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, request: ResearchRequest) -> Result<ResearchResult> {
        if request.topic.trim().is_empty() {
            return Err(PipelineError::InvalidRequest {
                reason: "topic is empty".into(),
            });
        }
        if request.max_sources == 0 {
            return Err(PipelineError::InvalidRequest {
                reason: "max_sources must be at least 1".into(),
            });
        }

        let started_at = Utc::now();
        let mut warnings = Vec::new();

        // Stage 1: acquisition (worker pool, re-sorted by request index)
        let acquisition = acquire::acquire_sources(
            &request.topic,
            request.max_sources,
            &self.provider,
            &self.resilience,
            &self.cache,
            self.config.concurrency,
        )
        .await;
        warnings.extend(acquisition.warnings);
        let mut sources = acquisition.sources;
        let sources_acquired = sources.len();

        // Stage 2: credibility (single-threaded, after the barrier)
        let now = Utc::now();
        credibility::score_all(&mut sources, now, &self.config);
        let credible_idx = credibility::credible_indices(&sources, &self.config);
        let sources_credible = credible_idx.len();
        if sources_credible < sources_acquired {
            warnings.push(format!(
                "{} sources fell below the credibility threshold and were excluded",
                sources_acquired - sources_credible
            ));
        }
        let credible: Vec<Source> = credible_idx.iter().map(|&i| sources[i].clone()).collect();
        info!(
            acquired = sources_acquired,
            credible = sources_credible,
            "credibility gate applied"
        );

        // Stage 3: chunking (deterministic per source)
        let mut chunks: Vec<Chunk> = Vec::new();
        for source in &credible {
            chunks.extend(chunker::chunk_source(source, &self.config));
        }

        // Stage 4: embedding (worker pool, re-sorted) and indexing
        let chunks = self.embed_chunks(chunks, &mut warnings).await;
        let index = ChunkIndex::new();
        index.insert_batch(chunks.iter().cloned()).await;

        // Stage 5: corrective retrieval
        let cached_model = CachedModel {
            inner: &self.model,
            cache: &self.cache,
        };
        let retrieval_config = self.retrieval_config(request.depth);
        let retriever =
            CorrectiveRetriever::new(&index, &self.embedder, &cached_model, &retrieval_config);
        let outcome = retriever
            .retrieve(&request.topic, request.depth.retrieval_k())
            .await;
        info!(
            iterations = outcome.iterations,
            sufficiency = outcome.sufficiency,
            "retrieval finished"
        );

        // Stage 6: structured extraction over the retrieved chunks, through
        // the validated JSON schema boundary
        let extracted_items = self
            .extract_items(&outcome, &cached_model, &mut warnings)
            .await;

        // Stage 7: synthesis
        let synthesis = self
            .synthesize(&request, &outcome, &cached_model, &mut warnings)
            .await;

        // Stage 8: claim extraction and verification
        let claims =
            claims::extract_and_verify(&synthesis, &index, &self.embedder, &self.config).await;

        // Stage 9: citations and rendering
        let citation_set = CitationSet::assign(&claims, now);
        let document = report::render_document(
            &synthesis,
            &claims,
            &citation_set,
            &credible,
            CitationStyle::Numeric,
        );

        // Stage 10: independent hallucination audit over the final text
        let hallucination_findings = hallucination::audit(&document, &index, &claims).await;

        // Stage 11: bias checks
        let bias_findings = bias::detect_bias(&credible, &document);

        // Stage 12: quality aggregation
        let inputs = QualityInputs {
            sources: &credible,
            chunks: &chunks,
            claims: &claims,
            citations: &citation_set,
            bias_findings: &bias_findings,
            hallucination_findings: &hallucination_findings,
            open_gaps: &outcome.open_gaps,
        };
        let quality = quality::compute_quality(&inputs, &self.config);

        Ok(ResearchResult {
            request,
            sources,
            chunks,
            extracted_items,
            claims,
            citations: citation_set.citations().to_vec(),
            bias_findings,
            hallucination_findings,
            quality,
            document,
            open_gaps: outcome.open_gaps,
            warnings,
            metadata: RunMetadata {
                started_at,
                finished_at: Utc::now(),
                sources_acquired,
                sources_credible,
                retrieval_iterations: outcome.iterations,
            },
        })
    }

    /// Overview runs keep a single retrieval pass; deeper runs get the
    /// full refinement budget.
    fn retrieval_config(&self, depth: Depth) -> PipelineConfig {
        let mut config = self.config.clone();
        if depth == Depth::Overview {
            config.max_retrieval_iterations = 1;
        }
        config
    }

    /// Embed chunks on the worker pool, degrading to a deterministic
    /// placeholder on exhaustion, and restore request order afterwards.
    async fn embed_chunks(&self, chunks: Vec<Chunk>, warnings: &mut Vec<String>) -> Vec<Chunk> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let futures = chunks
            .into_iter()
            .enumerate()
            .map(|(index, mut chunk)| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");

                    if let Some(hit) = self.cache.get(CallKind::Embed, &chunk.text).await {
                        if let Ok(embedding) = serde_json::from_str::<Vec<f32>>(&hit) {
                            chunk.embedding = Some(embedding);
                            return (index, chunk, None);
                        }
                    }

                    match self
                        .resilience
                        .call("embed", || self.embedder.embed(&chunk.text))
                        .await
                    {
                        Ok(embedding) => {
                            if let Ok(serialized) = serde_json::to_string(&embedding) {
                                self.cache.put(CallKind::Embed, &chunk.text, serialized).await;
                            }
                            chunk.embedding = Some(embedding);
                            (index, chunk, None)
                        }
                        Err(e) => {
                            let warning = format!(
                                "embedding degraded to placeholder for chunk {}: {}",
                                chunk.id, e
                            );
                            warn!(chunk = %chunk.id, %e, "embedding failed after retries");
                            chunk.embedding = Some(placeholder_embedding(
                                &chunk.text,
                                self.embedder.dimension(),
                            ));
                            (index, chunk, Some(warning))
                        }
                    }
                }
            })
            .collect::<Vec<_>>();

        let mut collected = join_all(futures).await;
        collected.sort_by_key(|(index, _, _)| *index);

        let mut ordered = Vec::with_capacity(collected.len());
        for (_, chunk, warning) in collected {
            if let Some(warning) = warning {
                warnings.push(warning);
            }
            ordered.push(chunk);
        }
        ordered
    }

    /// Extract structured items from each retrieved chunk through the
    /// validated schema boundary: a response that fails validation is
    /// re-asked once, then the chunk degrades to no items with a warning.
    async fn extract_items<'a>(
        &self,
        outcome: &retrieval::RetrievalOutcome,
        model: &CachedModel<'a, RateLimitedModel<M>>,
        warnings: &mut Vec<String>,
    ) -> Vec<ExtractedItem> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let instructions = prompts::extract_items_instructions();

        let futures = outcome
            .chunks
            .iter()
            .enumerate()
            .map(|(index, scored)| {
                let semaphore = Arc::clone(&semaphore);
                let instructions = instructions.as_str();
                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");

                    for _ in 0..2 {
                        match model.analyze(&scored.chunk.text, instructions, true).await {
                            Ok(ModelResponse::Json(value)) => {
                                if let Ok(items) = parse_extracted_items(&value) {
                                    return (index, items, None);
                                }
                            }
                            Ok(ModelResponse::Text(_)) | Err(_) => {}
                        }
                    }

                    let warning =
                        format!("structured extraction skipped for chunk {}", scored.chunk.id);
                    (index, Vec::new(), Some(warning))
                }
            })
            .collect::<Vec<_>>();

        let mut collected = join_all(futures).await;
        collected.sort_by_key(|(index, _, _)| *index);

        let mut items = Vec::new();
        for (_, chunk_items, warning) in collected {
            if let Some(warning) = warning {
                warnings.push(warning);
            }
            items.extend(chunk_items);
        }
        items
    }

    /// Synthesize the narrative document from the retrieved context,
    /// falling back to the raw context when the model is unavailable so
    /// the run still completes.
    async fn synthesize<'a>(
        &self,
        request: &ResearchRequest,
        outcome: &retrieval::RetrievalOutcome,
        model: &CachedModel<'a, RateLimitedModel<M>>,
        warnings: &mut Vec<String>,
    ) -> String {
        if outcome.chunks.is_empty() {
            warnings.push("no context retrieved; document is empty".into());
            return String::new();
        }

        let context: String = outcome
            .chunks
            .iter()
            .map(|s| s.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let instructions = prompts::synthesis_instructions(&request.topic, request.audience);

        match self
            .resilience
            .call("synthesize", || model.analyze(&context, &instructions, false))
            .await
        {
            Ok(response) => response.into_text(),
            Err(e) => {
                warnings.push(format!("synthesis degraded to raw context: {}", e));
                context
            }
        }
    }
}

fn validate_config(config: &PipelineConfig) -> Result<()> {
    if config.concurrency == 0 {
        return Err(PipelineError::Config("concurrency must be at least 1".into()));
    }
    if config.max_retrieval_iterations == 0 {
        return Err(PipelineError::Config(
            "max_retrieval_iterations must be at least 1".into(),
        ));
    }
    let weight_total = config.credibility_weights.total();
    if (weight_total - 1.0).abs() > 0.01 {
        return Err(PipelineError::Config(format!(
            "credibility weights must sum to 1.0, got {:.3}",
            weight_total
        )));
    }
    for (name, value) in [
        ("min_credibility", config.min_credibility),
        ("sufficiency_threshold", config.sufficiency_threshold),
        ("publish_threshold", config.publish_threshold),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(PipelineError::Config(format!(
                "{} must be within 0-100, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

/// Model wrapper that consults the run's cache before calling through.
///
/// Keyed on (instructions, mode, text); a failed lookup degrades to direct
/// execution.
struct CachedModel<'a, M: LanguageModel> {
    inner: &'a M,
    cache: &'a TtlCache,
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for CachedModel<'_, M> {
    async fn analyze(&self, text: &str, instructions: &str, json: bool) -> Result<ModelResponse> {
        let key = format!("{}|{}|{}", instructions, json, text);

        if let Some(hit) = self.cache.get(CallKind::Analyze, &key).await {
            if json {
                if let Ok(value) = serde_json::from_str(&hit) {
                    return Ok(ModelResponse::Json(value));
                }
            } else {
                return Ok(ModelResponse::Text(hit));
            }
        }

        let response = self.inner.analyze(text, instructions, json).await?;
        let serialized = match &response {
            ModelResponse::Text(text) => text.clone(),
            ModelResponse::Json(value) => value.to_string(),
        };
        self.cache.put(CallKind::Analyze, &key, serialized).await;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEmbedder, MockLanguageModel, MockSearchProvider};
    use crate::types::config::CredibilityWeights;

    #[test]
    fn invalid_config_is_fatal() {
        let config = PipelineConfig {
            credibility_weights: CredibilityWeights {
                authority: 0.9,
                recency: 0.9,
                citation_strength: 0.0,
                methodology: 0.0,
                bias_risk: 0.0,
            },
            ..Default::default()
        };

        let result = Pipeline::new(
            MockSearchProvider::new(),
            MockEmbedder::new(8),
            MockLanguageModel::new(),
            config,
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn zero_concurrency_is_fatal() {
        let config = PipelineConfig {
            concurrency: 0,
            ..Default::default()
        };
        let result = Pipeline::new(
            MockSearchProvider::new(),
            MockEmbedder::new(8),
            MockLanguageModel::new(),
            config,
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn empty_topic_is_rejected() {
        let pipeline = Pipeline::new(
            MockSearchProvider::new(),
            MockEmbedder::new(8),
            MockLanguageModel::new(),
            PipelineConfig::default(),
        )
        .unwrap();

        let result = pipeline.run(ResearchRequest::new("   ")).await;
        assert!(matches!(result, Err(PipelineError::InvalidRequest { .. })));
    }

    #[tokio::test]
    async fn empty_search_still_completes_with_low_score() {
        let pipeline = Pipeline::new(
            MockSearchProvider::new(),
            MockEmbedder::new(8),
            MockLanguageModel::new(),
            PipelineConfig::default(),
        )
        .unwrap();

        let result = pipeline
            .run(ResearchRequest::new("a topic nobody wrote about"))
            .await
            .unwrap();

        assert!(result.sources.is_empty());
        assert!(result.claims.is_empty());
        assert!(!result.quality.ready_to_publish);
        assert_eq!(result.quality.overall, 0.0);
    }
}
