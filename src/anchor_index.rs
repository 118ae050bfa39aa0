//! C2 AnchorIndex — validates and deduplicates the anchors attached to a
//! document's chunks (spec §4.2).

use std::collections::HashMap;

use crate::errors::{CoreError, CoreResult};
use crate::identifiers::{ChunkId, ConceptId};
use crate::model::chunk::AnchorPayload;

/// One anchor plus the chunk it was attached to, the shape `AnchorIndex`
/// ingests and deduplicates (spec §4.2).
#[derive(Debug, Clone)]
pub struct AnchorEntry {
    /// The chunk the anchor lives on.
    pub chunk_id: ChunkId,
    /// The anchor payload itself.
    pub payload: AnchorPayload,
}

/// A queryable index from concept to the chunks/spans it anchors.
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    by_concept: HashMap<ConceptId, Vec<AnchorEntry>>,
}

impl AnchorIndex {
    /// Build an index from raw anchor entries, validating the strict
    /// four-field payload contract and deduplicating overlapping anchors for
    /// the same concept on the same chunk by keeping the widest span (spec
    /// §4.2, §7 schema-violation rejection).
    pub fn build(entries: Vec<AnchorEntry>) -> CoreResult<Self> {
        for entry in &entries {
            Self::validate_payload(&entry.payload)?;
        }

        let mut grouped: HashMap<(ChunkId, ConceptId), Vec<AnchorEntry>> = HashMap::new();
        for entry in entries {
            grouped
                .entry((entry.chunk_id, entry.payload.concept_id))
                .or_default()
                .push(entry);
        }

        let mut by_concept: HashMap<ConceptId, Vec<AnchorEntry>> = HashMap::new();
        for ((_, concept_id), mut group) in grouped {
            let deduped = Self::dedup_overlapping(&mut group);
            by_concept.entry(concept_id).or_default().extend(deduped);
        }

        Ok(Self { by_concept })
    }

    /// An anchor payload carries exactly `{concept_id, label, role, span}`
    /// and nothing else — enforced structurally by `AnchorPayload`'s field
    /// set, so the only remaining check is that the span is well-formed.
    fn validate_payload(payload: &AnchorPayload) -> CoreResult<()> {
        let (start, end) = payload.span;
        if start >= end {
            return Err(CoreError::SchemaViolation(format!(
                "anchor span must be non-empty and ordered, got [{start}, {end})"
            )));
        }
        if payload.label.trim().is_empty() {
            return Err(CoreError::SchemaViolation(
                "anchor label must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Collapse anchors whose spans overlap into the single widest span,
    /// keeping the earliest-starting non-overlapping anchors distinct (spec
    /// §4.2 "two overlapping anchors for the same concept on the same chunk
    /// collapse to one, keeping the widest span").
    fn dedup_overlapping(group: &mut [AnchorEntry]) -> Vec<AnchorEntry> {
        group.sort_by_key(|e| e.payload.span.0);
        let mut result: Vec<AnchorEntry> = Vec::new();
        for entry in group.iter() {
            match result.last_mut() {
                Some(prev) if spans_overlap(prev.payload.span, entry.payload.span) => {
                    if span_width(entry.payload.span) > span_width(prev.payload.span) {
                        *prev = entry.clone();
                    }
                }
                _ => result.push(entry.clone()),
            }
        }
        result
    }

    /// Every anchor entry attached to a concept, across every chunk.
    pub fn anchors_for_concept(&self, concept_id: ConceptId) -> &[AnchorEntry] {
        self.by_concept
            .get(&concept_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of distinct concepts carrying at least one anchor.
    pub fn concept_count(&self) -> usize {
        self.by_concept.len()
    }
}

fn span_width(span: (usize, usize)) -> usize {
    span.1.saturating_sub(span.0)
}

fn spans_overlap(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::chunk::AnchorRole;

    fn entry(chunk_id: ChunkId, concept_id: ConceptId, span: (usize, usize)) -> AnchorEntry {
        AnchorEntry {
            chunk_id,
            payload: AnchorPayload {
                concept_id,
                label: "SAP S/4HANA".to_string(),
                role: AnchorRole::Mention,
                span,
            },
        }
    }

    #[test]
    fn rejects_empty_span() {
        let chunk_id = ChunkId::new();
        let concept_id = ConceptId::new();
        let mut bad = entry(chunk_id, concept_id, (5, 5));
        bad.payload.span = (5, 5);
        let result = AnchorIndex::build(vec![bad]);
        assert!(matches!(result, Err(CoreError::SchemaViolation(_))));
    }

    #[test]
    fn overlapping_anchors_for_same_concept_collapse_to_widest_span() {
        let chunk_id = ChunkId::new();
        let concept_id = ConceptId::new();
        let entries = vec![
            entry(chunk_id, concept_id, (0, 10)),
            entry(chunk_id, concept_id, (5, 20)),
        ];
        let index = AnchorIndex::build(entries).unwrap();
        let anchors = index.anchors_for_concept(concept_id);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].payload.span, (5, 20));
    }

    #[test]
    fn non_overlapping_anchors_stay_distinct() {
        let chunk_id = ChunkId::new();
        let concept_id = ConceptId::new();
        let entries = vec![
            entry(chunk_id, concept_id, (0, 10)),
            entry(chunk_id, concept_id, (20, 30)),
        ];
        let index = AnchorIndex::build(entries).unwrap();
        assert_eq!(index.anchors_for_concept(concept_id).len(), 2);
    }

    #[test]
    fn distinct_concepts_are_not_merged_even_when_spans_overlap() {
        let chunk_id = ChunkId::new();
        let a = ConceptId::new();
        let b = ConceptId::new();
        let entries = vec![entry(chunk_id, a, (0, 10)), entry(chunk_id, b, (5, 15))];
        let index = AnchorIndex::build(entries).unwrap();
        assert_eq!(index.concept_count(), 2);
    }
}
