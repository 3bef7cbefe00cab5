//! Trait abstractions for injected external capabilities.
//!
//! The pipeline never talks to the network itself. It consumes three
//! narrow contracts - search/scrape, embedding, and language-model
//! analysis - and each run receives its own provider instances
//! (no globals, no singletons).

pub mod embedder;
pub mod model;
pub mod search;
