//! Credibility scorer - five weighted sub-scores per source.
//!
//! Pure function of the source metadata, the supplied current date, and the
//! configured weights: re-scoring with identical inputs yields identical
//! output. Sources below the configured minimum are filtered from all
//! downstream stages but retained in the run's audit trail.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::config::PipelineConfig;
use crate::types::source::{CredibilityBreakdown, CredibilityScore, Source};

/// Markers that indicate a stated method or data section.
const METHODOLOGY_MARKERS: &[&str] = &[
    "methodology",
    "method",
    "dataset",
    "data set",
    "sample size",
    "we measured",
    "we collected",
    "experiment",
    "survey",
    "benchmark",
    "study design",
];

/// Promotional phrasing that raises bias risk.
const PROMOTIONAL_MARKERS: &[&str] = &[
    "buy now",
    "sign up today",
    "limited offer",
    "best-in-class",
    "industry-leading",
    "revolutionary",
    "game-changing",
    "guaranteed results",
];

/// Compute the credibility score for one source.
pub fn score_source(source: &Source, now: DateTime<Utc>, config: &PipelineConfig) -> CredibilityScore {
    let breakdown = CredibilityBreakdown {
        authority: source.source_type.authority(),
        recency: recency_score(source.published, now, config.effective_half_life_days()),
        citation_strength: citation_strength(source.citation_count),
        methodology: methodology_score(&source.text),
        bias_risk: bias_risk_score(source),
    };

    let weights = &config.credibility_weights;
    let overall = (breakdown.authority * weights.authority
        + breakdown.recency * weights.recency
        + breakdown.citation_strength * weights.citation_strength
        + breakdown.methodology * weights.methodology
        + breakdown.bias_risk * weights.bias_risk)
        .clamp(0.0, 100.0);

    CredibilityScore { overall, breakdown }
}

/// Score every unscored source in place.
pub fn score_all(sources: &mut [Source], now: DateTime<Utc>, config: &PipelineConfig) {
    for source in sources.iter_mut() {
        if !source.is_scored() {
            let score = score_source(source, now, config);
            debug!(url = %source.url, overall = score.overall, "scored source");
            source.set_credibility(score);
        }
    }
}

/// Indices of sources that pass the credibility gate.
///
/// The full slice stays intact as the audit trail; downstream stages work
/// from this credible subset.
pub fn credible_indices(sources: &[Source], config: &PipelineConfig) -> Vec<usize> {
    sources
        .iter()
        .enumerate()
        .filter(|(_, s)| s.credibility_score() >= config.min_credibility)
        .map(|(i, _)| i)
        .collect()
}

/// Recency decays exponentially with age. Unknown dates score neutral.
fn recency_score(published: Option<DateTime<Utc>>, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    match published {
        Some(published) => {
            let age_days = (now - published).num_seconds().max(0) as f64 / 86_400.0;
            100.0 * 0.5f64.powf(age_days / half_life_days.max(1.0))
        }
        None => 50.0,
    }
}

/// Log-scaled proxy from external citation counts; neutral when unknown.
fn citation_strength(citation_count: Option<u32>) -> f64 {
    match citation_count {
        Some(count) => {
            let scaled = ((1.0 + count as f64).ln() / (1.0 + 1000.0f64).ln()) * 100.0;
            scaled.min(100.0)
        }
        None => 50.0,
    }
}

/// Presence of methodology markers in the text.
fn methodology_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let hits = METHODOLOGY_MARKERS
        .iter()
        .filter(|m| lower.contains(*m))
        .count();

    match hits {
        0 => 30.0,
        1 => 65.0,
        _ => 95.0,
    }
}

/// Inverse of detected conflict-of-interest and promotional language:
/// higher means lower bias risk.
fn bias_risk_score(source: &Source) -> f64 {
    let mut score = 90.0;

    if source.conflict_of_interest.is_some() {
        score = 30.0;
    }

    let lower = source.text.to_lowercase();
    let promotional_hits = PROMOTIONAL_MARKERS
        .iter()
        .filter(|m| lower.contains(*m))
        .count();

    score -= 15.0 * promotional_hits as f64;
    score.max(10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::source::SourceType;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn scoring_is_deterministic() {
        let source = Source::new("https://a.edu/p", "Paper", SourceType::Academic)
            .with_text("Our methodology used a dataset of 10k samples.")
            .with_published(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
            .with_citation_count(120);
        let config = PipelineConfig::default();

        let a = score_source(&source, now(), &config);
        let b = score_source(&source, now(), &config);
        assert_eq!(a, b);
    }

    #[test]
    fn academic_outranks_community_on_same_metadata() {
        let config = PipelineConfig::default();
        let text = "Plain description with no markers.";

        let academic =
            Source::new("https://a.edu", "A", SourceType::Academic).with_text(text);
        let community =
            Source::new("https://forum.example", "B", SourceType::CommunityDiscussion)
                .with_text(text);

        let a = score_source(&academic, now(), &config);
        let c = score_source(&community, now(), &config);
        assert!(a.overall > c.overall);
    }

    #[test]
    fn recency_decays_with_age() {
        let config = PipelineConfig::default();
        let half_life = config.effective_half_life_days();

        let fresh = recency_score(Some(now() - chrono::Duration::days(30)), now(), half_life);
        let old = recency_score(Some(now() - chrono::Duration::days(2000)), now(), half_life);
        assert!(fresh > old);
        assert_eq!(recency_score(None, now(), half_life), 50.0);
    }

    #[test]
    fn fast_moving_topics_decay_faster() {
        let slow = PipelineConfig::default();
        let fast = PipelineConfig::default().fast_moving();

        let published = Some(now() - chrono::Duration::days(365));
        let slow_score = recency_score(published, now(), slow.effective_half_life_days());
        let fast_score = recency_score(published, now(), fast.effective_half_life_days());
        assert!(fast_score < slow_score);
    }

    #[test]
    fn conflict_of_interest_tanks_bias_score() {
        let clean = Source::new("https://a.com", "A", SourceType::IndustryReport)
            .with_text("Neutral description.");
        let conflicted = Source::new("https://b.com", "B", SourceType::IndustryReport)
            .with_text("Neutral description.")
            .with_conflict_of_interest("vendor-funded");

        assert!(bias_risk_score(&clean) > bias_risk_score(&conflicted));
    }

    #[test]
    fn gate_keeps_audit_trail_intact() {
        let config = PipelineConfig::default();
        let mut sources = vec![
            Source::new("https://a.edu/p", "Strong", SourceType::Academic)
                .with_text("methodology dataset benchmark")
                .with_citation_count(500),
            Source::new("https://forum.example/t", "Weak", SourceType::CommunityDiscussion)
                .with_text("buy now! revolutionary game-changing results")
                .with_conflict_of_interest("affiliate links"),
        ];
        score_all(&mut sources, now(), &config);

        let credible = credible_indices(&sources, &config);
        assert_eq!(credible, vec![0]);
        // Filtered source remains in the slice
        assert_eq!(sources.len(), 2);
        assert!(sources[1].is_scored());
    }
}
