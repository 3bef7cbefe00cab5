//! Citation types - stable inline markers and bibliography entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::source::Source;

/// A rendered reference to a source.
///
/// One citation is created per (source, first use) pair per document;
/// the same source reused later reuses the existing marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Stable inline marker, e.g. `[3]`
    pub marker: String,

    /// The backing source
    pub source_id: Uuid,

    /// Quoted text this citation backs, when one was captured
    pub quoted_text: Option<String>,

    /// When the source was accessed
    pub accessed: DateTime<Utc>,
}

impl Citation {
    /// Create a new citation with a numeric marker.
    pub fn new(index: usize, source_id: Uuid, accessed: DateTime<Utc>) -> Self {
        Self {
            marker: format!("[{}]", index),
            source_id,
            quoted_text: None,
            accessed,
        }
    }

    /// Attach quoted text.
    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quoted_text = Some(quote.into());
        self
    }
}

/// Bibliography rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CitationStyle {
    /// `[1] Author. (Year). Title. URL`
    Numeric,

    /// `Author (Year). Title. Retrieved from URL`
    AuthorYear,
}

impl Default for CitationStyle {
    fn default() -> Self {
        Self::Numeric
    }
}

/// Render one bibliography entry for a source.
pub fn render_entry(source: &Source, marker: &str, style: CitationStyle) -> String {
    let mut entry = String::new();

    if style == CitationStyle::Numeric {
        entry.push_str(marker);
        entry.push(' ');
    }

    if !source.authors.is_empty() {
        entry.push_str(&source.authors.join(", "));
        if style == CitationStyle::AuthorYear {
            if let Some(published) = source.published {
                entry.push_str(&format!(" ({})", published.format("%Y")));
            }
        }
        entry.push_str(". ");
    } else if style == CitationStyle::AuthorYear {
        if let Some(published) = source.published {
            entry.push_str(&format!("({}). ", published.format("%Y")));
        }
    }

    if style == CitationStyle::Numeric {
        if let Some(published) = source.published {
            entry.push_str(&format!("({}). ", published.format("%Y")));
        }
    }

    entry.push_str(&source.title);

    match style {
        CitationStyle::Numeric => entry.push_str(&format!(". {}", source.url)),
        CitationStyle::AuthorYear => entry.push_str(&format!(". Retrieved from {}", source.url)),
    }

    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::source::SourceType;
    use chrono::TimeZone;

    #[test]
    fn numeric_entry_format() {
        let source = Source::new("https://a.edu/p", "Measuring Queues", SourceType::Academic)
            .with_authors(["Lee, K."])
            .with_published(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        let entry = render_entry(&source, "[1]", CitationStyle::Numeric);
        assert!(entry.starts_with("[1] Lee, K.. (2024). Measuring Queues"));
        assert!(entry.ends_with("https://a.edu/p"));
    }

    #[test]
    fn author_year_entry_format() {
        let source = Source::new("https://a.edu/p", "Measuring Queues", SourceType::Academic)
            .with_authors(["Lee, K."])
            .with_published(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        let entry = render_entry(&source, "[1]", CitationStyle::AuthorYear);
        assert!(entry.contains("Lee, K. (2024)"));
        assert!(entry.contains("Retrieved from https://a.edu/p"));
    }
}
