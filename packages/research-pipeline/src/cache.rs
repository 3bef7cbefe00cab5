//! Per-run TTL cache for external call results.
//!
//! Keys are content-derived (SHA-256 of call kind + input), so identical
//! inputs hit the cache regardless of when they occur in the run. Each call
//! type has its own TTL: search results go stale in hours, scraped content
//! lasts days, embeddings are pure functions of their input.
//!
//! Reads never block on network availability and a miss (or an expired
//! entry) degrades to direct execution - the cache can only make a run
//! cheaper, never break it. One cache handle is injected per pipeline run.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::types::config::CacheTtl;

/// Which external call a cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Search,
    Scrape,
    Embed,
    Analyze,
}

impl CallKind {
    fn label(&self) -> &'static str {
        match self {
            CallKind::Search => "search",
            CallKind::Scrape => "scrape",
            CallKind::Embed => "embed",
            CallKind::Analyze => "analyze",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory TTL cache with content-derived keys.
pub struct TtlCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: CacheTtl,
}

impl TtlCache {
    /// Create a cache with the given per-kind TTLs.
    pub fn new(ttl: CacheTtl) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Derive the cache key for a call.
    pub fn key(kind: CallKind, input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(kind.label().as_bytes());
        hasher.update(b":");
        hasher.update(input.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn ttl_for(&self, kind: CallKind) -> Duration {
        let secs = match kind {
            CallKind::Search => self.ttl.search_secs,
            CallKind::Scrape => self.ttl.scrape_secs,
            CallKind::Embed => self.ttl.embed_secs,
            CallKind::Analyze => self.ttl.analyze_secs,
        };
        Duration::seconds(secs as i64)
    }

    /// Look up a cached result. Expired entries read as misses.
    pub async fn get(&self, kind: CallKind, input: &str) -> Option<String> {
        let key = Self::key(kind, input);
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| entry.value.clone())
    }

    /// Store a result under its content-derived key.
    pub async fn put(&self, kind: CallKind, input: &str, value: impl Into<String>) {
        let key = Self::key(kind, input);
        let entry = Entry {
            value: value.into(),
            expires_at: Utc::now() + self.ttl_for(kind),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Drop expired entries.
    pub async fn evict_expired(&self) {
        let now = Utc::now();
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.expires_at > now);
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(CacheTtl::default())
    }
}
