//! Typed errors for the research pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! The failure taxonomy distinguishes external-service failures (retried,
//! then degraded per unit) from configuration errors (fatal, raised
//! immediately). Insufficient or conflicting evidence is *not* an error:
//! it surfaces on the result as a low score or a `needs_review` claim.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Search or scrape provider failed
    #[error("search provider error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Embedding service failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Language-model service unavailable or failed
    #[error("language model error: {0}")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Model returned output that failed schema validation after re-ask
    #[error("model response failed schema validation: {reason}")]
    SchemaMismatch { reason: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Call timed out
    #[error("timeout after {millis}ms: {operation}")]
    Timeout { operation: String, millis: u64 },

    /// Circuit breaker is open after repeated failures
    #[error("circuit open for: {operation}")]
    CircuitOpen { operation: String },

    /// Invalid research request
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Configuration error. Fatal: no partial result is meaningful.
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether this error class is worth retrying.
    ///
    /// Configuration and validation errors are deterministic and
    /// never retried; transient service failures are.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Search(_)
                | PipelineError::Embedding(_)
                | PipelineError::Model(_)
                | PipelineError::Timeout { .. }
        )
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
