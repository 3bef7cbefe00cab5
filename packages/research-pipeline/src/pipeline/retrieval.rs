//! Corrective retrieval loop.
//!
//! Retrieves candidate chunks, grades the set's *sufficiency* (not just
//! relevance), and re-queries with a refined query when insufficient -
//! bounded to a fixed number of iterations, with an early exit when the
//! sufficiency score plateaus. Always returns a (possibly empty) chunk set;
//! insufficiency is surfaced as a low grade, never as an error.

use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::index::{keyword_match, ChunkIndex, ScoredChunk};
use crate::pipeline::prompts;
use crate::traits::embedder::{placeholder_embedding, Embedder};
use crate::traits::model::{LanguageModel, ModelResponse};
use crate::types::config::PipelineConfig;

/// Query intent, classified up front to set the evidence bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    /// Checkable factual question - the highest evidence bar
    Factual,

    /// Step-by-step guidance
    HowTo,

    /// Contrast between alternatives - needs balanced perspectives
    Comparison,

    /// "What is X"
    Definition,

    /// Subjective judgement
    Opinion,
}

impl QueryIntent {
    /// Minimum number of independent sources the retrieved set must span
    /// before it can be judged sufficient.
    pub fn min_independent_sources(&self) -> usize {
        match self {
            QueryIntent::Factual => 3,
            QueryIntent::Comparison => 2,
            QueryIntent::HowTo => 2,
            QueryIntent::Definition => 1,
            QueryIntent::Opinion => 2,
        }
    }
}

const HOW_TO_KEYWORDS: &[&str] = &["how to", "how do i", "steps to", "guide to", "set up", "install"];
const COMPARISON_KEYWORDS: &[&str] = &["versus", " vs ", " vs. ", "compared to", "difference between", "better than", " or "];
const DEFINITION_KEYWORDS: &[&str] = &["what is", "what are", "define", "meaning of", "definition of"];
const OPINION_KEYWORDS: &[&str] = &["should i", "is it worth", "best ", "worst ", "do you think", "opinions on"];

/// Classify a query's intent from keyword heuristics.
///
/// Checked most-specific first; anything unmatched is treated as factual,
/// which applies the strictest source requirement.
pub fn classify_intent(query: &str) -> QueryIntent {
    let lower = format!(" {} ", query.to_lowercase());

    if DEFINITION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return QueryIntent::Definition;
    }
    if HOW_TO_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return QueryIntent::HowTo;
    }
    if COMPARISON_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return QueryIntent::Comparison;
    }
    if OPINION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return QueryIntent::Opinion;
    }
    QueryIntent::Factual
}

/// Grade of one retrieved context set.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextGrade {
    /// How related the set is to the query (0-100)
    pub relevance: f64,

    /// Whether an answer could be written from this set alone (0-100).
    /// The stricter, decisive gate.
    pub sufficiency: f64,

    /// Sub-topics the set lacks
    #[serde(default)]
    pub missing_topics: Vec<String>,
}

/// What the retrieval loop produced.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    /// The final chunk set - sufficient, or best-effort after the budget
    pub chunks: Vec<ScoredChunk>,

    /// Sufficiency of the returned set
    pub sufficiency: f64,

    /// Iterations actually performed (1-based)
    pub iterations: usize,

    /// The classified query intent
    pub intent: QueryIntent,

    /// Sub-topics still missing when the loop stopped
    pub open_gaps: Vec<String>,
}

/// Corrective retriever over an index, an embedder, and a grading model.
pub struct CorrectiveRetriever<'a, E: Embedder, M: LanguageModel> {
    index: &'a ChunkIndex,
    embedder: &'a E,
    model: &'a M,
    config: &'a PipelineConfig,
}

impl<'a, E: Embedder, M: LanguageModel> CorrectiveRetriever<'a, E, M> {
    /// Create a retriever.
    pub fn new(
        index: &'a ChunkIndex,
        embedder: &'a E,
        model: &'a M,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            model,
            config,
        }
    }

    /// Run the corrective loop for a query.
    pub async fn retrieve(&self, query: &str, k: usize) -> RetrievalOutcome {
        let intent = classify_intent(query);
        let mut current_query = query.to_string();
        let mut best: Option<(Vec<ScoredChunk>, ContextGrade)> = None;
        let mut previous_sufficiency: Option<f64> = None;
        let mut iterations = 0;

        for iteration in 1..=self.config.max_retrieval_iterations {
            iterations = iteration;

            let embedding = match self.embedder.embed(&current_query).await {
                Ok(v) => v,
                Err(_) => placeholder_embedding(&current_query, self.embedder.dimension()),
            };
            let chunks = self.index.hybrid_search(&current_query, &embedding, k).await;

            let mut grade = self.grade(query, &chunks).await;

            // The evidence bar is part of sufficiency: a set spanning too
            // few independent sources cannot be sufficient for this intent.
            if distinct_sources(&chunks) < intent.min_independent_sources() {
                grade.sufficiency = grade
                    .sufficiency
                    .min(self.config.sufficiency_threshold - 1.0)
                    .max(0.0);
                if grade.missing_topics.is_empty() {
                    grade.missing_topics.push(format!(
                        "independent corroboration for {}",
                        query
                    ));
                }
            }

            debug!(
                iteration,
                sufficiency = grade.sufficiency,
                relevance = grade.relevance,
                "graded retrieval set"
            );

            let sufficient = grade.sufficiency >= self.config.sufficiency_threshold;
            let improved = best
                .as_ref()
                .map(|(_, g)| grade.sufficiency > g.sufficiency)
                .unwrap_or(true);
            if improved {
                best = Some((chunks, grade.clone()));
            }

            if sufficient {
                break;
            }

            // Plateau: no improvement over the previous iteration means a
            // refined query is not helping; stop early.
            if let Some(previous) = previous_sufficiency {
                if grade.sufficiency <= previous {
                    info!(iteration, "sufficiency plateaued, stopping retrieval early");
                    break;
                }
            }
            previous_sufficiency = Some(grade.sufficiency);

            current_query = refine_query(query, &grade.missing_topics);
        }

        let (chunks, grade) = best.unwrap_or((
            Vec::new(),
            ContextGrade {
                relevance: 0.0,
                sufficiency: 0.0,
                missing_topics: vec![query.to_string()],
            },
        ));

        RetrievalOutcome {
            chunks,
            sufficiency: grade.sufficiency,
            iterations,
            intent,
            open_gaps: if grade.sufficiency >= self.config.sufficiency_threshold {
                Vec::new()
            } else {
                grade.missing_topics
            },
        }
    }

    /// Grade a context set via the model's JSON mode, re-asking once on a
    /// schema mismatch and falling back to a lexical heuristic after that.
    async fn grade(&self, query: &str, chunks: &[ScoredChunk]) -> ContextGrade {
        if chunks.is_empty() {
            return ContextGrade {
                relevance: 0.0,
                sufficiency: 0.0,
                missing_topics: vec![query.to_string()],
            };
        }

        let context: String = chunks
            .iter()
            .map(|s| s.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n");
        let instructions = prompts::grade_instructions(query);

        for _ in 0..2 {
            match self.model.analyze(&context, &instructions, true).await {
                Ok(ModelResponse::Json(value)) => {
                    if let Ok(grade) = serde_json::from_value::<ContextGrade>(value) {
                        return clamp_grade(grade);
                    }
                }
                Ok(ModelResponse::Text(_)) | Err(_) => {}
            }
        }

        heuristic_grade(query, chunks)
    }
}

fn clamp_grade(mut grade: ContextGrade) -> ContextGrade {
    grade.relevance = grade.relevance.clamp(0.0, 100.0);
    grade.sufficiency = grade.sufficiency.clamp(0.0, 100.0);
    grade
}

/// Lexical fallback grade: query-term coverage across the set.
fn heuristic_grade(query: &str, chunks: &[ScoredChunk]) -> ContextGrade {
    let combined: String = chunks
        .iter()
        .map(|s| s.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let coverage = keyword_match(query, &combined) as f64 * 100.0;
    let combined_lower = combined.to_lowercase();

    let missing_topics: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 3 && !combined_lower.contains(*w))
        .map(|w| w.to_string())
        .collect();

    ContextGrade {
        relevance: coverage,
        // Coverage alone never demonstrates completeness; discount it.
        sufficiency: coverage * 0.8,
        missing_topics,
    }
}

/// Build a refined query from the original plus the detected gaps.
pub fn refine_query(original: &str, missing_topics: &[String]) -> String {
    if missing_topics.is_empty() {
        return original.to_string();
    }
    let gaps = missing_topics
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {}", original, gaps)
}

/// Count the distinct sources a chunk set spans.
pub fn distinct_sources(chunks: &[ScoredChunk]) -> usize {
    chunks
        .iter()
        .map(|s| s.chunk.source_id)
        .collect::<HashSet<_>>()
        .len()
}
