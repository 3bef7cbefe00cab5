//! Search provider trait - source acquisition.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::source::Source;

/// Discovery and retrieval of candidate documents for a topic.
///
/// Implementations wrap real search and scraping backends. The contract
/// is tolerant by design: a provider returns the results it could get and
/// never fails the whole call because a single URL was unreachable.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for candidate sources on a topic.
    ///
    /// Returns up to `limit` unscored sources. Partial results are
    /// expected; an empty vec means nothing was found, not an error.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Source>>;

    /// Fetch the full text of one URL.
    ///
    /// Used to enrich a source whose search snippet was too thin.
    async fn scrape(&self, url: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSearchProvider;
    use crate::types::source::SourceType;

    #[tokio::test]
    async fn mock_provider_returns_configured_sources() {
        let provider = MockSearchProvider::new().with_result(
            "queues",
            Source::new("https://a.edu/q", "Queue paper", SourceType::Academic)
                .with_text("Queues queue things."),
        );

        let results = provider.search("queues", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Queue paper");

        let empty = provider.search("unknown", 10).await.unwrap();
        assert!(empty.is_empty());
    }
}
