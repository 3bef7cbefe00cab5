//! Report rendering - inline citation markers and a trailing bibliography.

use crate::index::keyword_match;
use crate::pipeline::chunker::split_sentences;
use crate::pipeline::citations::CitationSet;
use crate::types::citation::CitationStyle;
use crate::types::claim::Claim;
use crate::types::source::Source;

/// Overlap at or above which a sentence is treated as stating a claim.
const CLAIM_MATCH: f32 = 0.7;

/// Render the final document: the synthesized text with inline markers
/// after sentences that state verified claims, plus a References section.
pub fn render_document(
    synthesis: &str,
    claims: &[Claim],
    citations: &CitationSet,
    sources: &[Source],
    style: CitationStyle,
) -> String {
    let mut body = Vec::new();

    for sentence in split_sentences(synthesis) {
        let markers = claims
            .iter()
            .filter(|c| c.verified)
            .filter(|c| keyword_match(&sentence, &c.statement) >= CLAIM_MATCH)
            .map(|c| citations.markers_for_claim(c))
            .find(|m| !m.is_empty());

        match markers {
            Some(markers) => body.push(annotate(&sentence, &markers)),
            None => body.push(sentence),
        }
    }

    let mut document = body.join(" ");

    if !citations.is_empty() {
        document.push_str("\n\n## References\n\n");
        document.push_str(&citations.render_bibliography(sources, style));
    }

    document
}

/// Insert markers before the sentence's terminal punctuation.
fn annotate(sentence: &str, markers: &str) -> String {
    match sentence.char_indices().last() {
        Some((at, ch)) if matches!(ch, '.' | '!' | '?') => {
            format!("{} {}{}", &sentence[..at], markers, ch)
        }
        _ => format!("{} {}", sentence, markers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::claim::ClaimType;
    use crate::types::source::SourceType;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn verified_sentences_get_markers_and_bibliography() {
        let source = Source::new("https://a.edu/p", "Queue Study", SourceType::Academic);
        let other = Source::new("https://b.org/d", "Broker Docs", SourceType::OfficialDocumentation);

        let mut claim = Claim::new(
            "Failover completes within 2 seconds on average.",
            ClaimType::Statistic,
        );
        claim.supporting_sources = vec![source.id, other.id];
        claim.verified = true;

        let mut citations = CitationSet::default();
        citations.cite(source.id, Utc::now());
        citations.cite(other.id, Utc::now());

        let document = render_document(
            "Failover completes within 2 seconds on average. Adoption continues to grow.",
            &[claim],
            &citations,
            &[source, other],
            CitationStyle::Numeric,
        );

        assert!(document.contains("average [1][2]."));
        assert!(!document.contains("grow [1]"));
        assert!(document.contains("## References"));
        assert!(document.contains("Queue Study"));
    }

    #[test]
    fn no_citations_means_no_references_section() {
        let document = render_document(
            "Nothing verified here.",
            &[],
            &CitationSet::default(),
            &[],
            CitationStyle::Numeric,
        );
        assert!(!document.contains("## References"));
    }

    #[test]
    fn annotate_places_markers_before_period() {
        assert_eq!(annotate("It works.", "[1]"), "It works [1].");
        assert_eq!(annotate("No punctuation", "[2]"), "No punctuation [2]");
    }
}
