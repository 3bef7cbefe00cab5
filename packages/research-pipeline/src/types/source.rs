//! Source types - units of evidence with credibility scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of evidence acquired for a research run.
///
/// Created at acquisition time and scored exactly once by the credibility
/// scorer; immutable thereafter. Sources are never deleted during a run -
/// low-credibility sources are filtered from downstream stages but kept in
/// the run's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier for this source within the run
    pub id: Uuid,

    /// URL the source was acquired from
    pub url: String,

    /// Title of the document
    pub title: String,

    /// Kind of publication this source is
    pub source_type: SourceType,

    /// Publication date, when known
    pub published: Option<DateTime<Utc>>,

    /// Author list, when known
    #[serde(default)]
    pub authors: Vec<String>,

    /// Raw text or abstract
    pub text: String,

    /// External citation count, when available
    pub citation_count: Option<u32>,

    /// Declared conflict of interest, when one was detected or disclosed
    pub conflict_of_interest: Option<String>,

    /// Credibility score, populated exactly once by the scorer.
    #[serde(skip_serializing_if = "Option::is_none")]
    credibility: Option<CredibilityScore>,
}

impl Source {
    /// Create a new unscored source.
    pub fn new(url: impl Into<String>, title: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: title.into(),
            source_type,
            published: None,
            authors: Vec::new(),
            text: String::new(),
            citation_count: None,
            conflict_of_interest: None,
            credibility: None,
        }
    }

    /// Set the raw text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the publication date.
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Set the author list.
    pub fn with_authors(mut self, authors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.authors = authors.into_iter().map(|a| a.into()).collect();
        self
    }

    /// Set the external citation count.
    pub fn with_citation_count(mut self, count: u32) -> Self {
        self.citation_count = Some(count);
        self
    }

    /// Record a declared conflict of interest.
    pub fn with_conflict_of_interest(mut self, description: impl Into<String>) -> Self {
        self.conflict_of_interest = Some(description.into());
        self
    }

    /// The credibility score, if the scorer has run.
    pub fn credibility(&self) -> Option<&CredibilityScore> {
        self.credibility.as_ref()
    }

    /// Whether the scorer has populated the score fields.
    pub fn is_scored(&self) -> bool {
        self.credibility.is_some()
    }

    /// Populate the score fields. First write wins: the score is set
    /// exactly once and later calls are ignored.
    pub fn set_credibility(&mut self, score: CredibilityScore) {
        if self.credibility.is_none() {
            self.credibility = Some(score);
        }
    }

    /// Overall credibility on the 0-100 scale, or 0 if unscored.
    pub fn credibility_score(&self) -> f64 {
        self.credibility.as_ref().map(|c| c.overall).unwrap_or(0.0)
    }

    /// Host part of the source URL, used for independence checks.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}

/// Kind of publication a source is.
///
/// The ordering here reflects the authority ladder used by the credibility
/// scorer: academic work ranks above official documentation, which ranks
/// above industry reports, news, and community discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    /// Peer-reviewed papers and academic studies
    Academic,

    /// Official documentation and standards bodies
    OfficialDocumentation,

    /// Industry analyses and vendor whitepapers
    IndustryReport,

    /// Journalism and trade press
    News,

    /// Forums, blogs, and community threads
    CommunityDiscussion,

    /// Anything else
    Other,
}

impl SourceType {
    /// Base authority score (0-100) for this source type.
    pub fn authority(&self) -> f64 {
        match self {
            SourceType::Academic => 95.0,
            SourceType::OfficialDocumentation => 85.0,
            SourceType::IndustryReport => 72.0,
            SourceType::News => 60.0,
            SourceType::CommunityDiscussion => 40.0,
            SourceType::Other => 50.0,
        }
    }
}

/// Composite credibility estimate for a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityScore {
    /// Weighted overall score (0-100)
    pub overall: f64,

    /// The five sub-scores the overall was derived from
    pub breakdown: CredibilityBreakdown,
}

/// The five weighted sub-scores behind a credibility score.
///
/// All values are on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityBreakdown {
    /// Mapped from the source type's authority ladder
    pub authority: f64,

    /// Decays with document age; half-life depends on the topic
    pub recency: f64,

    /// Proxy from external citation counts, neutral when unknown
    pub citation_strength: f64,

    /// Presence of a stated method or data section
    pub methodology: f64,

    /// Inverse of detected conflict-of-interest or promotional language
    pub bias_risk: f64,
}
