//! Citation manager - stable markers and bibliography rendering.
//!
//! Markers are assigned in order of first appearance and are stable for the
//! lifetime of one document: re-running assignment over the same ordered
//! claim list reproduces byte-identical marker-to-source mappings.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use crate::types::citation::{render_entry, Citation, CitationStyle};
use crate::types::claim::Claim;
use crate::types::source::Source;

/// The citations for one document.
#[derive(Debug, Clone, Default)]
pub struct CitationSet {
    /// Marker per source, in first-appearance order
    markers: IndexMap<Uuid, String>,

    /// One citation per (source, first use)
    citations: Vec<Citation>,
}

impl CitationSet {
    /// Assign citations for an ordered claim list.
    ///
    /// Only verified claims generate citations; each supporting source gets
    /// one citation at its first appearance and reuses that marker after.
    pub fn assign(claims: &[Claim], accessed: DateTime<Utc>) -> Self {
        let mut set = CitationSet::default();

        for claim in claims.iter().filter(|c| c.verified) {
            for source_id in &claim.supporting_sources {
                set.cite(*source_id, accessed);
            }
        }

        set
    }

    /// Cite a source, creating the citation on first use.
    ///
    /// Returns the stable marker for the source.
    pub fn cite(&mut self, source_id: Uuid, accessed: DateTime<Utc>) -> &str {
        if !self.markers.contains_key(&source_id) {
            let index = self.markers.len() + 1;
            let citation = Citation::new(index, source_id, accessed);
            self.markers.insert(source_id, citation.marker.clone());
            self.citations.push(citation);
        }
        &self.markers[&source_id]
    }

    /// The marker for a source, if it has been cited.
    pub fn marker_for(&self, source_id: Uuid) -> Option<&str> {
        self.markers.get(&source_id).map(|m| m.as_str())
    }

    /// Inline markers for a claim's supporting sources, e.g. `[1][3]`.
    pub fn markers_for_claim(&self, claim: &Claim) -> String {
        claim
            .supporting_sources
            .iter()
            .filter_map(|id| self.marker_for(*id))
            .collect()
    }

    /// The citations in assignment order.
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// The marker-to-source mapping in assignment order.
    pub fn marker_map(&self) -> Vec<(String, Uuid)> {
        self.markers
            .iter()
            .map(|(id, marker)| (marker.clone(), *id))
            .collect()
    }

    /// Number of cited sources.
    pub fn len(&self) -> usize {
        self.citations.len()
    }

    /// Whether no source has been cited.
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    /// Render the bibliography in the given style, one entry per cited
    /// source, in marker order.
    pub fn render_bibliography(&self, sources: &[Source], style: CitationStyle) -> String {
        let mut lines = Vec::with_capacity(self.citations.len());
        for (source_id, marker) in &self.markers {
            if let Some(source) = sources.iter().find(|s| s.id == *source_id) {
                lines.push(render_entry(source, marker, style));
            }
        }
        lines.join("\n")
    }
}
