//! Prompt templates for the language-model seam.
//!
//! Prompts are hashed so cached analyses invalidate when the wording
//! changes.

use sha2::{Digest, Sha256};

use crate::types::request::Audience;

/// Instructions for grading a retrieved context set.
///
/// Sufficiency is the decisive gate: could a complete answer be written
/// from this context alone, with zero external knowledge?
pub fn grade_instructions(query: &str) -> String {
    format!(
        "You are grading retrieved context for the query: {query:?}.\n\
         Return JSON with fields:\n\
         - \"relevance\": 0-100, how related the context is to the query\n\
         - \"sufficiency\": 0-100, whether a complete answer could be \
           written from this context alone with zero external knowledge\n\
         - \"missing_topics\": array of sub-topics the context lacks\n\
         Grade sufficiency strictly: topical relevance without complete \
         coverage must score low."
    )
}

/// Instructions for synthesizing the long-form document.
pub fn synthesis_instructions(topic: &str, audience: Audience) -> String {
    let register = match audience {
        Audience::General => "a general reader with no assumed background",
        Audience::Practitioner => "a practitioner with working familiarity",
        Audience::Expert => "an expert who wants full technical depth",
    };

    format!(
        "Write a long-form research document on {topic:?} for {register}. \
         Use only the provided context. State facts plainly, keep numeric \
         claims exactly as the context gives them, and do not introduce \
         information absent from the context."
    )
}

/// Instructions for structured item extraction from a chunk.
pub fn extract_items_instructions() -> String {
    "Extract the discrete items in this text as a JSON array. Each item is \
     an object with a \"type\" field of \"statistic\", \"case_study\", \
     \"insight\", or \"quote\", plus that type's fields (statistic: value, \
     context, unit; case_study: subject, outcome; insight: statement; \
     quote: text, attribution). Output nothing but the array."
        .to_string()
}

/// Hash a prompt for cache invalidation.
pub fn prompt_hash(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_hash_is_stable() {
        let a = prompt_hash(&grade_instructions("q"));
        let b = prompt_hash(&grade_instructions("q"));
        let c = prompt_hash(&grade_instructions("other"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
