//! C1 ChunkingEngine — layout-aware splitting that never cuts an atomic
//! region, plus segment and anchor mapping (spec §4.1).

use crate::config::ChunkingConfig;
use crate::errors::{CoreError, CoreResult};
use crate::identifiers::{ChunkId, ConceptId, DocId};
use crate::model::chunk::{
    AnchorPayload, AnchorRole, ChunkKind, ConfidenceSignal, RegionType, TypeAwareChunk,
};
use crate::model::document::{DocItem, ItemType};

/// A document segment the chunking engine maps chunks onto (spec §4.1
/// "segment mapping"). Segments come from an upstream layout pass; this
/// crate only consumes them.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Stable segment identity.
    pub id: String,
    /// Position among sibling segments, used as the tie-break of last
    /// resort.
    pub index: usize,
    /// Inclusive start offset into the document's full text.
    pub char_start: usize,
    /// Exclusive end offset into the document's full text.
    pub char_end: usize,
}

impl Segment {
    fn center(&self) -> f64 {
        (self.char_start + self.char_end) as f64 / 2.0
    }
}

/// A raw concept anchor in document-absolute character coordinates, the
/// shape an upstream extractor hands to the chunking engine before it is
/// rewritten to chunk-local coordinates (spec §4.1 "anchor mapping").
#[derive(Debug, Clone)]
pub struct RawAnchor {
    /// The concept being anchored.
    pub concept_id: ConceptId,
    /// Caller-supplied label.
    pub label: String,
    /// Role name; unknown values fall back to `mention` (spec §4.2).
    pub role: String,
    /// Inclusive start offset into the document's full text.
    pub char_start: usize,
    /// Exclusive end offset into the document's full text.
    pub char_end: usize,
}

/// Layout-aware chunking engine (spec §4.1).
#[derive(Debug, Clone)]
pub struct ChunkingEngine {
    config: ChunkingConfig,
    fail_fast_on_orphans: bool,
}

impl ChunkingEngine {
    /// Build an engine with the given config. `fail_fast_on_orphans`
    /// implements the optional fail-fast path named in spec §4.1 step 4 and
    /// §7 ("invariant breach ... orphan chunks with fail-fast on").
    pub fn new(config: ChunkingConfig, fail_fast_on_orphans: bool) -> Self {
        Self {
            config,
            fail_fast_on_orphans,
        }
    }

    /// Split `items` (already in reading order) into chunks, map each onto
    /// its best `segment`, and attach `anchors` in chunk-local coordinates.
    pub fn chunk_document(
        &self,
        doc_id: DocId,
        items: &[DocItem],
        segments: &[Segment],
        anchors: &[RawAnchor],
    ) -> CoreResult<Vec<TypeAwareChunk>> {
        let mut chunks = Vec::new();
        for region in self.detect_regions(items) {
            match region {
                Region::Atomic(item) => chunks.push(self.chunk_from_atomic_item(doc_id, item)),
                Region::NonAtomic(run) => {
                    chunks.extend(self.split_non_atomic_run(doc_id, run));
                }
            }
        }

        self.verify_no_cut_tables(items, &chunks)?;

        for chunk in &mut chunks {
            let (segment_id, overlap) = self.best_segment(chunk.char_start, chunk.char_end, segments);
            chunk.segment_id = segment_id;
            chunk.segment_overlap_chars = overlap;
        }

        if self.fail_fast_on_orphans && chunks.iter().any(|c| c.segment_id.is_none()) {
            return Err(CoreError::InvariantBreach(
                "orphan chunk(s) remain with fail-fast orphan checking enabled".to_string(),
            ));
        }

        for chunk in &mut chunks {
            chunk.anchors = self.anchors_for_chunk(chunk.char_start, chunk.char_end, anchors);
        }

        for chunk in &mut chunks {
            let (confidence, signals) = Self::parse_confidence(&chunk.text);
            chunk.parse_confidence = confidence;
            chunk.confidence_signals = signals;
        }

        Ok(chunks)
    }

    fn detect_regions<'a>(&self, items: &'a [DocItem]) -> Vec<Region<'a>> {
        let mut regions = Vec::new();
        let mut run: Vec<&DocItem> = Vec::new();
        for item in items {
            if item.item_type.is_atomic() {
                if !run.is_empty() {
                    regions.push(Region::NonAtomic(std::mem::take(&mut run)));
                }
                regions.push(Region::Atomic(item));
            } else {
                run.push(item);
            }
        }
        if !run.is_empty() {
            regions.push(Region::NonAtomic(run));
        }
        regions
    }

    fn chunk_from_atomic_item(&self, doc_id: DocId, item: &DocItem) -> TypeAwareChunk {
        let (region_type, kind) = match item.item_type {
            ItemType::Table => (RegionType::Table, ChunkKind::TableText),
            ItemType::Figure => (RegionType::Figure, ChunkKind::FigureText),
            _ => unreachable!("only Table/Figure items are atomic"),
        };
        TypeAwareChunk {
            chunk_id: ChunkId::new(),
            doc_id,
            text: item.text.clone(),
            kind,
            page_no: item.page_no,
            section_id: Some(item.section_id),
            item_ids: vec![item.item_id],
            is_relation_bearing: true,
            segment_id: None,
            segment_overlap_chars: 0,
            is_atomic: true,
            region_type,
            parse_confidence: 1.0,
            confidence_signals: vec![],
            char_start: item.charspan_start,
            char_end: item.charspan_end,
            token_count: tokenize(&item.text).len() as u32,
            anchors: vec![],
        }
    }

    fn split_non_atomic_run(&self, doc_id: DocId, run: Vec<&DocItem>) -> Vec<TypeAwareChunk> {
        let tokens = run_tokens(&run);
        if tokens.is_empty() {
            return vec![];
        }

        let window = self.config.chunk_size_tokens as usize;
        let overlap = self.config.overlap_tokens as usize;
        let minimum = self.config.minimum_chunk_tokens as usize;
        let stride = window.saturating_sub(overlap).max(1);

        let mut windows: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;
        while start < tokens.len() {
            let end = (start + window).min(tokens.len());
            windows.push((start, end));
            if end == tokens.len() {
                break;
            }
            start += stride;
        }

        // Drop a short trailing remainder only if at least one chunk
        // precedes it (spec §4.1 step 2).
        if windows.len() > 1 {
            if let Some(&(last_start, last_end)) = windows.last() {
                if last_end - last_start < minimum {
                    windows.pop();
                }
            }
        }

        let section_id = run.first().map(|item| item.section_id);
        let page_no = run.first().and_then(|item| item.page_no);
        let item_ids = run.iter().map(|item| item.item_id).collect::<Vec<_>>();

        windows
            .into_iter()
            .map(|(start, end)| {
                let char_start = tokens[start].1;
                let char_end = tokens[end - 1].2;
                let text = tokens[start..end]
                    .iter()
                    .map(|(text, _, _)| text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                TypeAwareChunk {
                    chunk_id: ChunkId::new(),
                    doc_id,
                    text,
                    kind: ChunkKind::Narrative,
                    page_no,
                    section_id,
                    item_ids: item_ids.clone(),
                    is_relation_bearing: true,
                    segment_id: None,
                    segment_overlap_chars: 0,
                    is_atomic: false,
                    region_type: RegionType::Narrative,
                    parse_confidence: 1.0,
                    confidence_signals: vec![],
                    char_start,
                    char_end,
                    token_count: (end - start) as u32,
                    anchors: vec![],
                }
            })
            .collect()
    }

    /// Verify no chunk partially overlaps an atomic region (spec §8
    /// invariant 1: "no cut tables").
    fn verify_no_cut_tables(&self, items: &[DocItem], chunks: &[TypeAwareChunk]) -> CoreResult<()> {
        for item in items.iter().filter(|i| i.item_type.is_atomic()) {
            let (region_start, region_end) = item.span();
            for chunk in chunks {
                let overlap = chunk.overlap_with(region_start, region_end);
                let fully_contains =
                    chunk.char_start <= region_start && chunk.char_end >= region_end;
                if overlap > 0 && !fully_contains {
                    return Err(CoreError::InvariantBreach(format!(
                        "chunk {} partially overlaps atomic region [{region_start}, {region_end})",
                        chunk.chunk_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn best_segment(
        &self,
        char_start: usize,
        char_end: usize,
        segments: &[Segment],
    ) -> (Option<String>, usize) {
        let chunk_center = (char_start + char_end) as f64 / 2.0;
        let mut best: Option<(&Segment, usize)> = None;
        for segment in segments {
            let overlap_start = char_start.max(segment.char_start);
            let overlap_end = char_end.min(segment.char_end);
            let overlap = overlap_end.saturating_sub(overlap_start);
            if overlap == 0 {
                continue;
            }
            best = match best {
                None => Some((segment, overlap)),
                Some((current, current_overlap)) => {
                    if overlap > current_overlap {
                        Some((segment, overlap))
                    } else if overlap == current_overlap {
                        let current_dist = (chunk_center - current.center()).abs();
                        let candidate_dist = (chunk_center - segment.center()).abs();
                        if candidate_dist < current_dist
                            || (candidate_dist == current_dist && segment.index < current.index)
                        {
                            Some((segment, overlap))
                        } else {
                            Some((current, current_overlap))
                        }
                    } else {
                        Some((current, current_overlap))
                    }
                }
            };
        }

        match best {
            Some((segment, overlap)) if overlap >= self.config.orphan_overlap_min_chars as usize => {
                (Some(segment.id.clone()), overlap)
            }
            _ => (None, 0),
        }
    }

    fn anchors_for_chunk(
        &self,
        char_start: usize,
        char_end: usize,
        anchors: &[RawAnchor],
    ) -> Vec<AnchorPayload> {
        anchors
            .iter()
            .filter(|anchor| anchor.char_start < char_end && anchor.char_end > char_start)
            .map(|anchor| {
                let local_start = anchor.char_start.saturating_sub(char_start);
                let local_end = (anchor.char_end.saturating_sub(char_start)).min(char_end - char_start);
                AnchorPayload {
                    concept_id: anchor.concept_id,
                    label: anchor.label.clone(),
                    role: AnchorRole::parse_or_fallback(&anchor.role),
                    span: (local_start, local_end),
                }
            })
            .collect()
    }

    /// Heuristic parse-quality score from printable-character ratio and
    /// repetition (spec §4.1 step 6).
    fn parse_confidence(text: &str) -> (f32, Vec<ConfidenceSignal>) {
        let total = text.chars().count().max(1);
        let printable = text.chars().filter(|c| !c.is_control()).count();
        let printable_ratio = printable as f32 / total as f32;

        let words: Vec<&str> = text.split_whitespace().collect();
        let unique: std::collections::HashSet<&str> = words.iter().copied().collect();
        let repetition_penalty = if words.is_empty() {
            0.0
        } else {
            1.0 - (unique.len() as f32 / words.len() as f32)
        };

        let confidence = (printable_ratio * (1.0 - 0.5 * repetition_penalty)).clamp(0.0, 1.0);
        let signals = vec![
            ConfidenceSignal {
                name: "printable_char_ratio".to_string(),
                value: printable_ratio,
            },
            ConfidenceSignal {
                name: "repetition_penalty".to_string(),
                value: repetition_penalty,
            },
        ];
        (confidence, signals)
    }
}

enum Region<'a> {
    Atomic(&'a DocItem),
    NonAtomic(Vec<&'a DocItem>),
}

/// Whitespace tokens with absolute `[start, end)` character spans.
fn tokenize(text: &str) -> Vec<(String, usize, usize)> {
    let mut tokens = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut byte_idx = 0;
    for ch in text.chars() {
        let char_len = ch.len_utf8();
        if ch.is_whitespace() {
            if let Some(start) = current_start.take() {
                tokens.push((text[start..byte_idx].to_string(), start, byte_idx));
            }
        } else if current_start.is_none() {
            current_start = Some(byte_idx);
        }
        byte_idx += char_len;
    }
    if let Some(start) = current_start {
        tokens.push((text[start..byte_idx].to_string(), start, byte_idx));
    }
    tokens
}

/// Tokenize a run of items, rewriting each token's span to absolute
/// document coordinates via its owning item's `charspan_start`.
fn run_tokens(run: &[&DocItem]) -> Vec<(String, usize, usize)> {
    let mut all = Vec::new();
    for item in run {
        for (text, local_start, local_end) in tokenize(&item.text) {
            all.push((
                text,
                item.charspan_start + local_start,
                item.charspan_start + local_end,
            ));
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{ItemId, SectionId};

    fn item(item_type: ItemType, text: &str, start: usize) -> DocItem {
        DocItem {
            item_id: ItemId::new(),
            doc_id: DocId::new(),
            doc_version_id: crate::identifiers::DocVersionId::new(),
            item_type,
            text: text.to_string(),
            page_no: Some(1),
            section_id: SectionId::new(),
            charspan_start: start,
            charspan_end: start + text.len(),
            reading_order_index: 0,
        }
    }

    #[test]
    fn table_item_becomes_one_atomic_chunk_regardless_of_size() {
        let long_table = "cell ".repeat(500);
        let doc_id = DocId::new();
        let table = item(ItemType::Table, &long_table, 0);
        let engine = ChunkingEngine::new(ChunkingConfig::default(), false);
        let chunks = engine
            .chunk_document(doc_id, &[table.clone()], &[], &[])
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_atomic);
        assert_eq!(chunks[0].kind, ChunkKind::TableText);
        assert_eq!(chunks[0].span(), table.span());
    }

    #[test]
    fn narrative_run_splits_by_sliding_window() {
        let doc_id = DocId::new();
        let words = (0..600).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let paragraph = item(ItemType::Paragraph, &words, 0);
        let engine = ChunkingEngine::new(ChunkingConfig::default(), false);
        let chunks = engine
            .chunk_document(doc_id, &[paragraph], &[], &[])
            .unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.is_atomic);
            assert_eq!(chunk.kind, ChunkKind::Narrative);
            assert!(chunk.token_count <= 256);
        }
    }

    #[test]
    fn short_single_chunk_is_kept_even_below_minimum() {
        let doc_id = DocId::new();
        let paragraph = item(ItemType::Paragraph, "just a few words here", 0);
        let engine = ChunkingEngine::new(ChunkingConfig::default(), false);
        let chunks = engine
            .chunk_document(doc_id, &[paragraph], &[], &[])
            .unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn segment_mapping_picks_max_overlap_with_tie_break_by_earliest_index() {
        let doc_id = DocId::new();
        let paragraph = item(ItemType::Paragraph, "alpha beta gamma delta", 0);
        let engine = ChunkingEngine::new(ChunkingConfig::default(), false);
        let chunk_span = paragraph.span();
        let segments = vec![
            Segment {
                id: "seg-0".to_string(),
                index: 0,
                char_start: chunk_span.0,
                char_end: chunk_span.1,
            },
            Segment {
                id: "seg-1".to_string(),
                index: 1,
                char_start: chunk_span.0,
                char_end: chunk_span.1,
            },
        ];
        let chunks = engine
            .chunk_document(doc_id, &[paragraph], &segments, &[])
            .unwrap();
        assert_eq!(chunks[0].segment_id, Some("seg-0".to_string()));
    }

    #[test]
    fn orphan_chunk_has_no_segment_when_overlap_too_small() {
        let doc_id = DocId::new();
        let paragraph = item(ItemType::Paragraph, "alpha beta gamma delta epsilon", 0);
        let engine = ChunkingEngine::new(ChunkingConfig::default(), false);
        let segments = vec![Segment {
            id: "seg-0".to_string(),
            index: 0,
            char_start: 0,
            char_end: 2,
        }];
        let chunks = engine
            .chunk_document(doc_id, &[paragraph], &segments, &[])
            .unwrap();
        assert_eq!(chunks[0].segment_id, None);
    }

    #[test]
    fn fail_fast_on_orphans_returns_invariant_breach() {
        let doc_id = DocId::new();
        let paragraph = item(ItemType::Paragraph, "alpha beta gamma delta epsilon", 0);
        let engine = ChunkingEngine::new(ChunkingConfig::default(), true);
        let result = engine.chunk_document(doc_id, &[paragraph], &[], &[]);
        assert!(matches!(result, Err(CoreError::InvariantBreach(_))));
    }

    #[test]
    fn anchor_mapping_rewrites_span_to_chunk_local_coordinates() {
        let doc_id = DocId::new();
        let paragraph = item(ItemType::Paragraph, "alpha beta gamma delta", 0);
        let engine = ChunkingEngine::new(ChunkingConfig::default(), false);
        let concept_id = ConceptId::new();
        let anchors = vec![RawAnchor {
            concept_id,
            label: "beta".to_string(),
            role: "primary".to_string(),
            char_start: 6,
            char_end: 10,
        }];
        let chunks = engine
            .chunk_document(doc_id, &[paragraph], &[], &anchors)
            .unwrap();
        assert_eq!(chunks[0].anchors.len(), 1);
        assert_eq!(chunks[0].anchors[0].span, (6, 10));
    }

    #[test]
    fn anchor_with_unknown_role_falls_back_to_mention() {
        let doc_id = DocId::new();
        let paragraph = item(ItemType::Paragraph, "alpha beta", 0);
        let engine = ChunkingEngine::new(ChunkingConfig::default(), false);
        let anchors = vec![RawAnchor {
            concept_id: ConceptId::new(),
            label: "alpha".to_string(),
            role: "nonsense".to_string(),
            char_start: 0,
            char_end: 5,
        }];
        let chunks = engine
            .chunk_document(doc_id, &[paragraph], &[], &anchors)
            .unwrap();
        assert_eq!(chunks[0].anchors[0].role, AnchorRole::Mention);
    }
}
