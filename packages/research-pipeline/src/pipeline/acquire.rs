//! Source acquisition - search fan-out with bounded concurrency.
//!
//! Per-source scraping runs on a small worker pool; results are collected
//! and re-sorted by original request index before the next stage, so
//! downstream output never depends on network race timing. A unit that
//! fails after its retry budget is dropped with a recorded warning, not a
//! run failure.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::cache::{CallKind, TtlCache};
use crate::resilience::Resilience;
use crate::traits::search::SearchProvider;
use crate::types::source::Source;

/// Sources with text shorter than this are scraped for their full content.
const THIN_TEXT_CHARS: usize = 200;

/// What acquisition produced.
#[derive(Debug, Default)]
pub struct AcquisitionResult {
    /// Acquired sources, in search-result order
    pub sources: Vec<Source>,

    /// Units dropped or degraded along the way
    pub warnings: Vec<String>,
}

/// Acquire up to `max_sources` candidate sources for a topic.
pub async fn acquire_sources<P: SearchProvider>(
    topic: &str,
    max_sources: usize,
    provider: &P,
    resilience: &Resilience,
    cache: &TtlCache,
    concurrency: usize,
) -> AcquisitionResult {
    let mut result = AcquisitionResult::default();

    let search_key = format!("{}|{}", topic, max_sources);
    let mut sources = match cache.get(CallKind::Search, &search_key).await {
        Some(hit) => serde_json::from_str::<Vec<Source>>(&hit).unwrap_or_default(),
        None => {
            match resilience
                .call("search", || provider.search(topic, max_sources))
                .await
            {
                Ok(sources) => {
                    if let Ok(serialized) = serde_json::to_string(&sources) {
                        cache.put(CallKind::Search, &search_key, serialized).await;
                    }
                    sources
                }
                Err(e) => {
                    warn!(topic, %e, "search failed after retries");
                    result
                        .warnings
                        .push(format!("search failed for {:?}: {}", topic, e));
                    Vec::new()
                }
            }
        }
    };
    sources.truncate(max_sources);
    info!(topic, count = sources.len(), "acquired candidate sources");

    // Scrape thin sources on the worker pool. Collect (index, outcome) and
    // re-sort so ordering is independent of completion order.
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let futures = sources
        .into_iter()
        .enumerate()
        .map(|(index, source)| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                if source.text.len() >= THIN_TEXT_CHARS {
                    return (index, source, None);
                }

                let _permit = semaphore.acquire().await.expect("semaphore closed");

                if let Some(hit) = cache.get(CallKind::Scrape, &source.url).await {
                    let mut enriched = source;
                    enriched.text = hit;
                    return (index, enriched, None);
                }

                match resilience
                    .call("scrape", || provider.scrape(&source.url))
                    .await
                {
                    Ok(text) => {
                        cache.put(CallKind::Scrape, &source.url, text.clone()).await;
                        let mut enriched = source;
                        enriched.text = text;
                        (index, enriched, None)
                    }
                    Err(e) => {
                        let warning =
                            format!("scrape failed for {}: {}; keeping snippet", source.url, e);
                        warn!(url = %source.url, %e, "scrape failed after retries");
                        (index, source, Some(warning))
                    }
                }
            }
        })
        .collect::<Vec<_>>();

    let mut collected = join_all(futures).await;
    collected.sort_by_key(|(index, _, _)| *index);

    for (_, source, warning) in collected {
        if let Some(warning) = warning {
            result.warnings.push(warning);
        }
        result.sources.push(source);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSearchProvider;
    use crate::types::config::PipelineConfig;
    use crate::types::source::SourceType;
    use std::time::Duration;

    fn infra() -> (Resilience, TtlCache) {
        let config = PipelineConfig::default();
        (
            Resilience::new(
                config.max_attempts,
                Duration::from_millis(1),
                Duration::from_millis(500),
            ),
            TtlCache::default(),
        )
    }

    #[tokio::test]
    async fn thin_sources_are_scraped() {
        let provider = MockSearchProvider::new()
            .with_result(
                "queues",
                Source::new("https://a.example/q", "Queues", SourceType::News).with_text("stub"),
            )
            .with_page("https://a.example/q", "Full scraped article text about queues.");
        let (resilience, cache) = infra();

        let result =
            acquire_sources("queues", 5, &provider, &resilience, &cache, 2).await;
        assert_eq!(result.sources.len(), 1);
        assert!(result.sources[0].text.contains("Full scraped article"));
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn failed_scrape_keeps_snippet_and_warns() {
        let provider = MockSearchProvider::new()
            .with_result(
                "queues",
                Source::new("https://down.example/q", "Queues", SourceType::News)
                    .with_text("snippet only"),
            )
            .fail_scrape("https://down.example/q");
        let (resilience, cache) = infra();

        let result =
            acquire_sources("queues", 5, &provider, &resilience, &cache, 2).await;
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].text, "snippet only");
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn ordering_follows_search_results() {
        let long_text = "x".repeat(300);
        let provider = MockSearchProvider::new().with_results(
            "topic",
            vec![
                Source::new("https://a.example/1", "First", SourceType::News)
                    .with_text(&long_text),
                Source::new("https://a.example/2", "Second", SourceType::News)
                    .with_text(&long_text),
                Source::new("https://a.example/3", "Third", SourceType::News)
                    .with_text(&long_text),
            ],
        );
        let (resilience, cache) = infra();

        let result = acquire_sources("topic", 5, &provider, &resilience, &cache, 3).await;
        let titles: Vec<&str> = result.sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn total_search_failure_degrades_to_empty() {
        let provider = MockSearchProvider::new().fail_search();
        let (resilience, cache) = infra();

        let result = acquire_sources("topic", 5, &provider, &resilience, &cache, 2).await;
        assert!(result.sources.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn repeated_search_hits_cache() {
        let provider = MockSearchProvider::new().with_result(
            "topic",
            Source::new("https://a.example/1", "Doc", SourceType::News)
                .with_text(&"y".repeat(300)),
        );
        let (resilience, cache) = infra();

        let _ = acquire_sources("topic", 5, &provider, &resilience, &cache, 2).await;
        let _ = acquire_sources("topic", 5, &provider, &resilience, &cache, 2).await;
        assert_eq!(provider.search_calls(), 1);
    }
}
