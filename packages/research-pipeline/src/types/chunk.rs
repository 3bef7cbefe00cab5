//! Chunk types - concept-bounded slices of source text.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A concept-bounded slice of a source's text.
///
/// A chunk holds a weak back-reference to its owning source (`source_id`)
/// and never outlives the source's conceptual lifetime within a run.
/// Chunk boundaries follow semantic structure - headings, paragraph breaks,
/// topic shifts - not fixed character counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier for this chunk
    pub id: Uuid,

    /// Owning source (back-reference, never an owning pointer)
    pub source_id: Uuid,

    /// Text content of the chunk
    pub text: String,

    /// Concept type inferred from surface patterns
    pub concept: ConceptType,

    /// Order of this chunk within its source
    pub position: usize,

    /// Vector embedding, populated by the indexing stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(source_id: Uuid, text: impl Into<String>, concept: ConceptType, position: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            text: text.into(),
            concept,
            position,
            embedding: None,
        }
    }

    /// Set the embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Word count of the chunk text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Concept type tag inferred from surface patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConceptType {
    /// Definitional phrasing ("X is a ...", "X refers to ...")
    Definition,

    /// Worked or concrete example
    Example,

    /// Numeric claims and measurements
    Statistic,

    /// Step-by-step instructions
    Procedure,

    /// Contrasting alternatives
    Comparison,

    /// Everything else
    Narrative,
}

impl Default for ConceptType {
    fn default() -> Self {
        Self::Narrative
    }
}
