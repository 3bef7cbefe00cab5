//! Claim types - atomic, checkable statements extracted from generated text.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An atomic factual statement extracted from generated text.
///
/// Invariant: `verified == true` requires at least two independent
/// supporting sources (distinct identifiers) with no unresolved conflict.
/// A single-source claim may carry confidence but never the verified flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// The statement being made
    pub statement: String,

    /// What kind of claim this is
    pub claim_type: ClaimType,

    /// Sources judged to support this claim
    pub supporting_sources: Vec<Uuid>,

    /// Whether the claim passed multi-source verification
    pub verified: bool,

    /// Confidence in the claim (0-100)
    pub confidence: f64,

    /// Full verification record
    pub verification: Verification,
}

impl Claim {
    /// Create a new unverified claim.
    pub fn new(statement: impl Into<String>, claim_type: ClaimType) -> Self {
        Self {
            statement: statement.into(),
            claim_type,
            supporting_sources: Vec::new(),
            verified: false,
            confidence: 0.0,
            verification: Verification::default(),
        }
    }

    /// Whether the supporting set satisfies the independence invariant.
    pub fn has_independent_support(&self) -> bool {
        let mut ids = self.supporting_sources.clone();
        ids.sort();
        ids.dedup();
        ids.len() >= 2
    }
}

/// Kind of claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimType {
    /// A checkable factual assertion
    Fact,

    /// A numeric measurement or percentage
    Statistic,

    /// Directly quoted text
    Quote,

    /// A judgement or interpretation
    Opinion,
}

/// Record of how a claim was verified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verification {
    /// Sources whose text supports the statement
    #[serde(default)]
    pub supporting: Vec<Uuid>,

    /// Sources whose text directly conflicts with the statement
    #[serde(default)]
    pub conflicting: Vec<Uuid>,

    /// Whether the supporting sources agree with each other
    pub sources_agree: bool,

    /// Whether a human should resolve this claim before publication.
    ///
    /// Set when sources disagree; the pipeline records both sides rather
    /// than silently picking one.
    pub needs_review: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_support_requires_distinct_ids() {
        let mut claim = Claim::new("Latency dropped 40%", ClaimType::Statistic);
        let id = Uuid::new_v4();
        claim.supporting_sources = vec![id, id];
        assert!(!claim.has_independent_support());

        claim.supporting_sources = vec![id, Uuid::new_v4()];
        assert!(claim.has_independent_support());
    }
}
