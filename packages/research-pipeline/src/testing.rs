//! Testing utilities including mock provider implementations.
//!
//! These make it possible to exercise the whole pipeline without real
//! search, embedding, or model backends. All mocks are deterministic and
//! track their calls for assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{PipelineError, Result};
use crate::traits::embedder::{placeholder_embedding, Embedder};
use crate::traits::model::{LanguageModel, ModelResponse};
use crate::traits::search::SearchProvider;
use crate::types::source::Source;

/// A mock search provider returning predefined sources and pages.
#[derive(Default)]
pub struct MockSearchProvider {
    results: Arc<RwLock<HashMap<String, Vec<Source>>>>,
    pages: Arc<RwLock<HashMap<String, String>>>,
    failing_scrapes: Arc<RwLock<Vec<String>>>,
    fail_search: Arc<RwLock<bool>>,
    search_calls: Arc<RwLock<usize>>,
}

impl MockSearchProvider {
    /// Create a mock with no configured results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one source to a query's results.
    pub fn with_result(self, query: impl Into<String>, source: Source) -> Self {
        self.results
            .write()
            .unwrap()
            .entry(query.into())
            .or_default()
            .push(source);
        self
    }

    /// Set a query's full result list.
    pub fn with_results(self, query: impl Into<String>, sources: Vec<Source>) -> Self {
        self.results.write().unwrap().insert(query.into(), sources);
        self
    }

    /// Add scrapeable page content for a URL.
    pub fn with_page(self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), content.into());
        self
    }

    /// Mark a URL's scrape as failing.
    pub fn fail_scrape(self, url: impl Into<String>) -> Self {
        self.failing_scrapes.write().unwrap().push(url.into());
        self
    }

    /// Make every search call fail.
    pub fn fail_search(self) -> Self {
        *self.fail_search.write().unwrap() = true;
        self
    }

    /// Number of search calls made.
    pub fn search_calls(&self) -> usize {
        *self.search_calls.read().unwrap()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Source>> {
        *self.search_calls.write().unwrap() += 1;

        if *self.fail_search.read().unwrap() {
            return Err(PipelineError::Search(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock search down",
            ))));
        }

        let mut results = self
            .results
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        results.truncate(limit);
        Ok(results)
    }

    async fn scrape(&self, url: &str) -> Result<String> {
        if self.failing_scrapes.read().unwrap().iter().any(|u| u == url) {
            return Err(PipelineError::Search(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock scrape refused",
            ))));
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| {
                PipelineError::Search(Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no mock page for {}", url),
                )))
            })
    }
}

/// A mock embedder producing deterministic, content-derived vectors.
pub struct MockEmbedder {
    dimension: usize,
    overrides: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    fail: Arc<RwLock<bool>>,
    calls: Arc<RwLock<usize>>,
}

impl MockEmbedder {
    /// Create a mock embedder with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            overrides: Arc::default(),
            fail: Arc::default(),
            calls: Arc::default(),
        }
    }

    /// Pin an embedding for a specific text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.overrides.write().unwrap().insert(text.into(), embedding);
        self
    }

    /// Make every call fail, to exercise the placeholder degrade path.
    pub fn failing(self) -> Self {
        *self.fail.write().unwrap() = true;
        self
    }

    /// Number of embed calls made.
    pub fn calls(&self) -> usize {
        *self.calls.read().unwrap()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        *self.calls.write().unwrap() += 1;

        if *self.fail.read().unwrap() {
            return Err(PipelineError::Embedding("mock embedder down".into()));
        }

        Ok(self
            .overrides
            .read()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| placeholder_embedding(text, self.dimension)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Record of one mock model call.
#[derive(Debug, Clone)]
pub struct MockModelCall {
    pub json: bool,
    pub instructions: String,
}

/// A mock language model with scripted responses.
///
/// With no script configured, text-mode calls echo the analyzed text back
/// (so synthesized documents stay verifiable against their context) and
/// JSON-mode calls return an empty object, which exercises the callers'
/// schema-mismatch fallbacks.
#[derive(Default)]
pub struct MockLanguageModel {
    json_response: Arc<RwLock<Option<serde_json::Value>>>,
    json_sequence: Arc<RwLock<VecDeque<serde_json::Value>>>,
    text_response: Arc<RwLock<Option<String>>>,
    fail: Arc<RwLock<bool>>,
    calls: Arc<RwLock<Vec<MockModelCall>>>,
}

impl MockLanguageModel {
    /// Create a mock model with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this JSON value for every JSON-mode call.
    pub fn with_json_response(self, value: serde_json::Value) -> Self {
        *self.json_response.write().unwrap() = Some(value);
        self
    }

    /// Queue JSON values returned one per JSON-mode call, in order.
    /// Falls back to the fixed response (then the default) when drained.
    pub fn with_json_sequence(self, values: impl IntoIterator<Item = serde_json::Value>) -> Self {
        self.json_sequence.write().unwrap().extend(values);
        self
    }

    /// Return this text for every call, regardless of mode. In JSON mode
    /// this simulates a provider ignoring the schema.
    pub fn with_text_response(self, text: impl Into<String>) -> Self {
        *self.text_response.write().unwrap() = Some(text.into());
        self
    }

    /// Make every call fail.
    pub fn failing(self) -> Self {
        *self.fail.write().unwrap() = true;
        self
    }

    /// All calls made to this mock.
    pub fn calls(&self) -> Vec<MockModelCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn analyze(&self, text: &str, instructions: &str, json: bool) -> Result<ModelResponse> {
        self.calls.write().unwrap().push(MockModelCall {
            json,
            instructions: instructions.to_string(),
        });

        if *self.fail.read().unwrap() {
            return Err(PipelineError::Model(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock model down",
            ))));
        }

        if let Some(text) = self.text_response.read().unwrap().clone() {
            return Ok(ModelResponse::Text(text));
        }

        if json {
            if let Some(value) = self.json_sequence.write().unwrap().pop_front() {
                return Ok(ModelResponse::Json(value));
            }
            if let Some(value) = self.json_response.read().unwrap().clone() {
                return Ok(ModelResponse::Json(value));
            }
            return Ok(ModelResponse::Json(serde_json::json!({})));
        }

        Ok(ModelResponse::Text(text.to_string()))
    }
}

/// Builder for complete pipeline test scenarios.
pub struct TestScenario {
    provider: MockSearchProvider,
    embedder: MockEmbedder,
    model: MockLanguageModel,
}

impl TestScenario {
    /// Create a scenario with default mocks.
    pub fn new() -> Self {
        Self {
            provider: MockSearchProvider::new(),
            embedder: MockEmbedder::new(64),
            model: MockLanguageModel::new(),
        }
    }

    /// Register a topic with its search results.
    pub fn with_topic(mut self, topic: &str, sources: Vec<Source>) -> Self {
        self.provider = self.provider.with_results(topic, sources);
        self
    }

    /// Script the model's JSON responses.
    pub fn with_grades(mut self, values: impl IntoIterator<Item = serde_json::Value>) -> Self {
        self.model = self.model.with_json_sequence(values);
        self
    }

    /// Take the three mocks.
    pub fn build(self) -> (MockSearchProvider, MockEmbedder, MockLanguageModel) {
        (self.provider, self.embedder, self.model)
    }
}

impl Default for TestScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::source::SourceType;

    #[tokio::test]
    async fn mock_model_echoes_text_by_default() {
        let model = MockLanguageModel::new();
        let response = model.analyze("the input", "summarize", false).await.unwrap();
        assert_eq!(response.into_text(), "the input");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].json);
    }

    #[tokio::test]
    async fn mock_model_json_sequence_drains_in_order() {
        let model = MockLanguageModel::new().with_json_sequence([
            serde_json::json!({"n": 1}),
            serde_json::json!({"n": 2}),
        ]);

        let first = model.analyze("", "grade", true).await.unwrap();
        let second = model.analyze("", "grade", true).await.unwrap();
        assert_eq!(first.as_json().unwrap()["n"], 1);
        assert_eq!(second.as_json().unwrap()["n"], 2);
    }

    #[tokio::test]
    async fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(32);
        let a = embedder.embed("hello").await.unwrap();
        let b = embedder.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_eq!(embedder.calls(), 2);
    }

    #[tokio::test]
    async fn failing_embedder_errors() {
        let embedder = MockEmbedder::new(8).failing();
        assert!(embedder.embed("text").await.is_err());
    }

    #[tokio::test]
    async fn scenario_builder_wires_topics() {
        let (provider, _, _) = TestScenario::new()
            .with_topic(
                "queues",
                vec![Source::new("https://a.example/q", "Doc", SourceType::News)],
            )
            .build();

        let results = provider.search("queues", 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
