//! Language-model trait - chunk analysis, grading, and synthesis.
//!
//! The model seam has a JSON mode with a validated schema at the boundary:
//! structured extraction returns tagged variants, and a response that fails
//! schema validation is re-asked once rather than propagated as untyped data.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Language-model analysis over text.
///
/// Implementations wrap specific LLM providers and handle prompting and
/// transport. The pipeline only ever sees text or parsed JSON.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Analyze text under the given instructions.
    ///
    /// With `json` set, the model must return a JSON document; the caller
    /// validates it against a typed schema and re-asks once on mismatch.
    async fn analyze(&self, text: &str, instructions: &str, json: bool) -> Result<ModelResponse>;
}

/// What a model call returned.
#[derive(Debug, Clone)]
pub enum ModelResponse {
    /// Free-form text
    Text(String),

    /// Parsed JSON document
    Json(serde_json::Value),
}

impl ModelResponse {
    /// The response as text, serializing JSON if needed.
    pub fn into_text(self) -> String {
        match self {
            ModelResponse::Text(text) => text,
            ModelResponse::Json(value) => value.to_string(),
        }
    }

    /// The response as JSON, if it is one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ModelResponse::Json(value) => Some(value),
            ModelResponse::Text(_) => None,
        }
    }
}

/// A structured item extracted from a chunk by the model.
///
/// This is the validated schema for JSON-mode extraction. Anything that
/// does not parse into one of these variants is rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractedItem {
    /// A numeric claim with its context
    Statistic {
        value: String,
        context: String,
        #[serde(default)]
        unit: Option<String>,
    },

    /// A concrete case study or worked example
    CaseStudy {
        subject: String,
        outcome: String,
    },

    /// A qualitative insight or takeaway
    Insight { statement: String },

    /// Directly quoted text with its speaker, when known
    Quote {
        text: String,
        #[serde(default)]
        attribution: Option<String>,
    },
}

/// Parse a JSON-mode extraction response against the item schema.
///
/// Accepts either a bare array or an object with an `items` field, which
/// covers the two shapes providers actually produce.
pub fn parse_extracted_items(value: &serde_json::Value) -> Result<Vec<ExtractedItem>> {
    let array = match value {
        serde_json::Value::Array(_) => value.clone(),
        serde_json::Value::Object(map) => map
            .get("items")
            .cloned()
            .ok_or_else(|| PipelineError::SchemaMismatch {
                reason: "expected an array or an object with an `items` field".into(),
            })?,
        _ => {
            return Err(PipelineError::SchemaMismatch {
                reason: "expected a JSON array of extraction items".into(),
            })
        }
    };

    serde_json::from_value(array).map_err(|e| PipelineError::SchemaMismatch {
        reason: e.to_string(),
    })
}

/// A model wrapper that enforces a minimum interval between calls.
///
/// Paid LLM services throttle aggressively; the pipeline spaces its calls
/// instead of discovering the provider's limits the hard way.
pub struct RateLimitedModel<M: LanguageModel> {
    inner: M,
    limiter: Arc<DirectRateLimiter>,
}

impl<M: LanguageModel> RateLimitedModel<M> {
    /// Wrap a model with a minimum inter-call interval.
    pub fn new(model: M, min_interval: Duration) -> Self {
        let quota = Quota::with_period(min_interval)
            .unwrap_or_else(|| Quota::per_second(nonzero_ext::nonzero!(10u32)));
        Self {
            inner: model,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wrap with an explicit requests-per-second budget.
    pub fn per_second(model: M, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        );
        Self {
            inner: model,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for RateLimitedModel<M> {
    async fn analyze(&self, text: &str, instructions: &str, json: bool) -> Result<ModelResponse> {
        self.limiter.until_ready().await;
        self.inner.analyze(text, instructions, json).await
    }
}
