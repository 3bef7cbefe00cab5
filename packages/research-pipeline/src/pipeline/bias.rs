//! Bias detector - four independent checks over the source set and the
//! generated document.
//!
//! Each check produces zero or more advisory findings; none of them blocks
//! the run. Thresholds follow the reference defaults: 70% dominance, 20%
//! academic floor, 80/20 sentiment skew.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::finding::{BiasCategory, BiasFinding, Severity};
use crate::types::source::{Source, SourceType};

const DOMINANCE_SHARE: f64 = 0.70;
const ACADEMIC_FLOOR: f64 = 0.20;
const SENTIMENT_SKEW: f64 = 0.80;
const MIN_SET_FOR_DIVERSITY: usize = 5;

/// Narrow-range threshold: a large source set published within this many
/// days suggests the selection missed the topic's history.
const NARROW_RANGE_DAYS: i64 = 30;

const POSITIVE_WORDS: &[&str] = &[
    "excellent", "superior", "impressive", "outstanding", "remarkable", "ideal",
    "powerful", "seamless", "robust", "elegant", "effective",
];

const NEGATIVE_WORDS: &[&str] = &[
    "poor", "inferior", "disappointing", "flawed", "broken", "unreliable",
    "fragile", "awkward", "ineffective", "problematic", "dangerous",
];

const VAGUE_ATTRIBUTIONS: &[&str] = &[
    "some say",
    "experts agree",
    "many believe",
    "it is widely known",
    "people think",
    "studies show",
];

const CERTAINTY_WORDS: &[&str] = &[
    "definitely",
    "undoubtedly",
    "certainly",
    "unquestionably",
    "without question",
    "obviously",
];

const CONTRAST_MARKERS: &[&str] = &[
    "however",
    "on the other hand",
    "in contrast",
    "although",
    "conversely",
    "critics",
    "skeptics",
    "a counterargument",
];

/// Run all four bias checks.
pub fn detect_bias(sources: &[Source], document: &str) -> Vec<BiasFinding> {
    let mut findings = Vec::new();
    findings.extend(check_source_diversity(sources));
    findings.extend(check_presentation(document));
    findings.extend(check_selection(sources));
    findings.extend(check_confirmation(document, sources));
    findings
}

/// (a) Source diversity: one publication dominating, or too little
/// academic representation in a meaningful set.
fn check_source_diversity(sources: &[Source]) -> Vec<BiasFinding> {
    let mut findings = Vec::new();
    if sources.len() < 2 {
        return findings;
    }

    if let Some((host, count)) = dominant_host(sources) {
        let share = count as f64 / sources.len() as f64;
        if share > DOMINANCE_SHARE {
            findings.push(
                BiasFinding::new(
                    BiasCategory::SourceDiversity,
                    Severity::Medium,
                    format!(
                        "{} of {} sources come from {}",
                        count,
                        sources.len(),
                        host
                    ),
                    "add sources from other publications",
                )
                .with_sources(ids_from_host(sources, &host)),
            );
        }
    }

    if sources.len() >= MIN_SET_FOR_DIVERSITY {
        let academic = sources
            .iter()
            .filter(|s| s.source_type == SourceType::Academic)
            .count();
        let share = academic as f64 / sources.len() as f64;
        if share < ACADEMIC_FLOOR {
            findings.push(BiasFinding::new(
                BiasCategory::SourceDiversity,
                Severity::Medium,
                format!(
                    "academic sources are {:.0}% of the set, below the {:.0}% floor",
                    share * 100.0,
                    ACADEMIC_FLOOR * 100.0
                ),
                "add peer-reviewed or academic sources",
            ));
        }
    }

    findings
}

/// (b) Presentation: skewed sentiment, or vague attribution without
/// citation.
fn check_presentation(document: &str) -> Vec<BiasFinding> {
    let mut findings = Vec::new();
    let lower = document.to_lowercase();

    let positive = count_occurrences(&lower, POSITIVE_WORDS);
    let negative = count_occurrences(&lower, NEGATIVE_WORDS);
    let total = positive + negative;

    if total >= 5 {
        let positive_share = positive as f64 / total as f64;
        if positive_share > SENTIMENT_SKEW || positive_share < (1.0 - SENTIMENT_SKEW) {
            let leaning = if positive_share > SENTIMENT_SKEW {
                "positive"
            } else {
                "negative"
            };
            findings.push(BiasFinding::new(
                BiasCategory::Presentation,
                Severity::Medium,
                format!(
                    "sentiment words lean {} ({} positive / {} negative)",
                    leaning, positive, negative
                ),
                "balance the framing or attribute judgements to sources",
            ));
        }
    }

    let uncited_vague = VAGUE_ATTRIBUTIONS
        .iter()
        .map(|phrase| uncited_occurrences(&lower, phrase))
        .sum::<usize>();
    if uncited_vague >= 2 {
        findings.push(BiasFinding::new(
            BiasCategory::Presentation,
            Severity::Low,
            format!("{} vague attributions appear without a citation", uncited_vague),
            "name the source or cut the attribution",
        ));
    }

    findings
}

/// (c) Selection: a narrow publication window for a large set, declared
/// conflicts of interest, and over-reliance on a single source type.
fn check_selection(sources: &[Source]) -> Vec<BiasFinding> {
    let mut findings = Vec::new();

    if sources.len() >= MIN_SET_FOR_DIVERSITY {
        let dates: Vec<DateTime<Utc>> = sources.iter().filter_map(|s| s.published).collect();
        if dates.len() >= MIN_SET_FOR_DIVERSITY {
            let min = dates.iter().min().copied().unwrap_or_default();
            let max = dates.iter().max().copied().unwrap_or_default();
            if (max - min).num_days() <= NARROW_RANGE_DAYS {
                findings.push(BiasFinding::new(
                    BiasCategory::Selection,
                    Severity::Medium,
                    format!(
                        "{} sources were all published within {} days",
                        dates.len(),
                        (max - min).num_days()
                    ),
                    "include older material to capture the topic's history",
                ));
            }
        }

        // Over-reliance on one source type is a selection act: it reflects
        // what was chosen to be read, not just how it is presented.
        if let Some((source_type, count)) = dominant_type(sources) {
            let share = count as f64 / sources.len() as f64;
            if share > DOMINANCE_SHARE {
                findings.push(
                    BiasFinding::new(
                        BiasCategory::Selection,
                        Severity::High,
                        format!(
                            "{} of {} sources are {:?}",
                            count,
                            sources.len(),
                            source_type
                        ),
                        "rebalance the source set across publication types",
                    )
                    .with_sources(ids_of_type(sources, source_type)),
                );
            }
        }
    }

    let conflicted: Vec<Uuid> = sources
        .iter()
        .filter(|s| s.conflict_of_interest.is_some())
        .map(|s| s.id)
        .collect();
    if !conflicted.is_empty() {
        findings.push(
            BiasFinding::new(
                BiasCategory::Selection,
                Severity::Medium,
                format!("{} sources declare a conflict of interest", conflicted.len()),
                "weigh or replace the conflicted sources",
            )
            .with_sources(conflicted),
        );
    }

    findings
}

/// (d) Confirmation: absolute-certainty language in bulk, or the total
/// absence of contrasting-viewpoint language in a meaningful set.
fn check_confirmation(document: &str, sources: &[Source]) -> Vec<BiasFinding> {
    let mut findings = Vec::new();
    let lower = document.to_lowercase();

    let certainty = count_occurrences(&lower, CERTAINTY_WORDS);
    if certainty >= 3 {
        findings.push(BiasFinding::new(
            BiasCategory::Confirmation,
            Severity::Medium,
            format!("{} absolute-certainty phrases in the document", certainty),
            "qualify claims with the strength of their evidence",
        ));
    }

    if sources.len() >= MIN_SET_FOR_DIVERSITY {
        let has_contrast = CONTRAST_MARKERS.iter().any(|m| lower.contains(m));
        if !has_contrast {
            findings.push(BiasFinding::new(
                BiasCategory::Confirmation,
                Severity::Medium,
                "no contrasting-viewpoint language despite a broad source set".to_string(),
                "present at least one dissenting or limiting perspective",
            ));
        }
    }

    findings
}

fn count_occurrences(haystack: &str, needles: &[&str]) -> usize {
    needles
        .iter()
        .map(|needle| haystack.matches(needle).count())
        .sum()
}

/// Occurrences of a phrase not followed by a citation marker on the same
/// stretch of text.
fn uncited_occurrences(haystack: &str, phrase: &str) -> usize {
    haystack
        .match_indices(phrase)
        .filter(|(at, _)| {
            let window_end = (at + phrase.len() + 80).min(haystack.len());
            !haystack[at + phrase.len()..window_end].contains('[')
        })
        .count()
}

fn dominant_type(sources: &[Source]) -> Option<(SourceType, usize)> {
    let mut counts: HashMap<SourceType, usize> = HashMap::new();
    for source in sources {
        *counts.entry(source.source_type).or_insert(0) += 1;
    }
    counts.into_iter().max_by_key(|(_, count)| *count)
}

fn dominant_host(sources: &[Source]) -> Option<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for source in sources {
        if let Some(host) = source.host() {
            *counts.entry(host).or_insert(0) += 1;
        }
    }
    counts.into_iter().max_by_key(|(_, count)| *count)
}

fn ids_of_type(sources: &[Source], source_type: SourceType) -> Vec<Uuid> {
    sources
        .iter()
        .filter(|s| s.source_type == source_type)
        .map(|s| s.id)
        .collect()
}

fn ids_from_host(sources: &[Source], host: &str) -> Vec<Uuid> {
    sources
        .iter()
        .filter(|s| s.host().as_deref() == Some(host))
        .map(|s| s.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_of(source_type: SourceType, host: &str) -> Source {
        Source::new(format!("https://{}/doc", host), "Doc", source_type)
    }

    #[test]
    fn community_dominated_set_yields_high_selection_finding() {
        let mut sources: Vec<Source> = (0..6)
            .map(|i| source_of(SourceType::CommunityDiscussion, &format!("forum{}.example", i)))
            .collect();
        sources.push(source_of(SourceType::News, "news.example"));

        let findings = detect_bias(&sources, "");
        let selection_high = findings.iter().any(|f| {
            f.category == BiasCategory::Selection && f.severity == Severity::High
        });
        assert!(selection_high, "expected a high-severity selection finding");
    }

    #[test]
    fn low_academic_share_yields_diversity_finding() {
        let sources: Vec<Source> = vec![
            source_of(SourceType::News, "a.example"),
            source_of(SourceType::News, "b.example"),
            source_of(SourceType::IndustryReport, "c.example"),
            source_of(SourceType::IndustryReport, "d.example"),
            source_of(SourceType::OfficialDocumentation, "e.example"),
        ];

        let findings = check_source_diversity(&sources);
        assert!(findings
            .iter()
            .any(|f| f.category == BiasCategory::SourceDiversity));
    }

    #[test]
    fn balanced_small_set_is_clean() {
        let sources = vec![
            source_of(SourceType::Academic, "a.edu"),
            source_of(SourceType::News, "b.example"),
        ];
        let document = "However, the evidence is mixed. Critics note limits.";

        let findings = detect_bias(&sources, document);
        assert!(findings.is_empty());
    }

    #[test]
    fn skewed_sentiment_is_flagged() {
        let document = "excellent excellent superior impressive outstanding seamless results";
        let findings = check_presentation(document);
        assert!(findings
            .iter()
            .any(|f| f.category == BiasCategory::Presentation));
    }

    #[test]
    fn vague_attribution_without_citation_is_flagged() {
        let document = "Some say it scales. Experts agree it is the future.";
        let findings = check_presentation(document);
        assert!(findings
            .iter()
            .any(|f| f.description.contains("vague attributions")));
    }

    #[test]
    fn cited_attribution_is_not_flagged() {
        let document = "Some say it scales [1]. Experts agree it is the future [2].";
        let findings = check_presentation(document);
        assert!(findings.is_empty());
    }

    #[test]
    fn narrow_date_range_is_flagged() {
        use chrono::TimeZone;
        let base = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let sources: Vec<Source> = (0..6)
            .map(|i| {
                source_of(SourceType::News, &format!("site{}.example", i))
                    .with_published(base + chrono::Duration::days(i))
            })
            .collect();

        let findings = check_selection(&sources);
        assert!(findings
            .iter()
            .any(|f| f.description.contains("published within")));
    }

    #[test]
    fn declared_conflicts_are_flagged() {
        let sources = vec![
            source_of(SourceType::IndustryReport, "vendor.example")
                .with_conflict_of_interest("vendor-funded benchmark"),
            source_of(SourceType::News, "news.example"),
        ];

        let findings = check_selection(&sources);
        let conflict = findings
            .iter()
            .find(|f| f.description.contains("conflict of interest"))
            .expect("conflict finding");
        assert_eq!(conflict.affected_sources.len(), 1);
    }

    #[test]
    fn certainty_language_in_bulk_is_flagged() {
        let document = "This is definitely right. Undoubtedly so. Certainly the best path.";
        let findings = check_confirmation(document, &[]);
        assert!(findings
            .iter()
            .any(|f| f.category == BiasCategory::Confirmation));
    }

    #[test]
    fn missing_contrast_with_broad_set_is_flagged() {
        let sources: Vec<Source> = (0..5)
            .map(|i| source_of(SourceType::News, &format!("s{}.example", i)))
            .collect();
        let document = "Everything works well and adoption is smooth.";

        let findings = check_confirmation(document, &sources);
        assert!(findings
            .iter()
            .any(|f| f.description.contains("contrasting-viewpoint")));
    }
}
