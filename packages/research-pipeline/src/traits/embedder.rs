//! Embedder trait - vector representations for chunks and queries.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Embedding generation for semantic similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch operation).
    ///
    /// More efficient than calling `embed` repeatedly when the backing
    /// service supports batching.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimensionality of the vectors this embedder produces.
    fn dimension(&self) -> usize;
}

/// Deterministic placeholder vector for degraded embedding calls.
///
/// When the embedding service is exhausted, the run continues with a
/// content-derived stand-in instead of aborting. The same text always
/// produces the same placeholder, so degraded runs stay reproducible.
pub fn placeholder_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = hasher.finalize();

    (0..dimension)
        .map(|i| {
            let byte = hash[i % 32] as f32;
            // Normalize to [-1, 1]
            (byte / 127.5) - 1.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_deterministic() {
        let a = placeholder_embedding("hello", 64);
        let b = placeholder_embedding("hello", 64);
        let c = placeholder_embedding("world", 64);

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn placeholder_values_in_range() {
        let v = placeholder_embedding("anything at all", 256);
        assert!(v.iter().all(|x| (-1.0..=1.0).contains(x)));
    }
}
