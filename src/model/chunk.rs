//! TypeAwareChunk and the anchor payload attached to it (spec §3, §4.1-4.2).

use serde::{Deserialize, Serialize};

use crate::identifiers::{ChunkId, ConceptId, DocId, ItemId, SectionId};

/// The retrieval unit chunking produces (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAwareChunk {
    /// This chunk's identity.
    pub chunk_id: ChunkId,
    /// Owning document.
    pub doc_id: DocId,
    /// Chunk text, concatenated from its source items.
    pub text: String,
    /// What kind of content this chunk carries.
    pub kind: ChunkKind,
    /// Source page number, if known.
    pub page_no: Option<u32>,
    /// The section this chunk falls under, if known.
    pub section_id: Option<SectionId>,
    /// The `DocItem`s this chunk was assembled from, in reading order.
    pub item_ids: Vec<ItemId>,
    /// Whether claim/marker extraction should run against this chunk.
    pub is_relation_bearing: bool,
    /// The best-matching document segment, or `None` if orphaned (spec
    /// §4.1 segment mapping).
    pub segment_id: Option<String>,
    /// Character overlap with `segment_id`'s span, `0` if orphaned.
    pub segment_overlap_chars: usize,
    /// True if this chunk covers an atomic region in full (never split).
    pub is_atomic: bool,
    /// The layout region type this chunk was built from.
    pub region_type: RegionType,
    /// Heuristic parse-quality score in `[0, 1]`.
    pub parse_confidence: f32,
    /// Named signals `parse_confidence` was derived from, for diagnostics.
    pub confidence_signals: Vec<ConfidenceSignal>,
    /// Inclusive start offset into the document's full text.
    pub char_start: usize,
    /// Exclusive end offset into the document's full text.
    pub char_end: usize,
    /// Token count, used to enforce `chunk_size_tokens`/overlap/minimum.
    pub token_count: u32,
    /// Concept anchors attached to this chunk, in chunk-local coordinates.
    pub anchors: Vec<AnchorPayload>,
}

impl TypeAwareChunk {
    /// This chunk's character span as a half-open range.
    pub fn span(&self) -> (usize, usize) {
        (self.char_start, self.char_end)
    }

    /// Character overlap between this chunk's span and an arbitrary span,
    /// used by both segment mapping and anchor mapping (spec §4.1).
    pub fn overlap_with(&self, other_start: usize, other_end: usize) -> usize {
        let start = self.char_start.max(other_start);
        let end = self.char_end.min(other_end);
        end.saturating_sub(start)
    }
}

/// What kind of content a chunk carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkKind {
    /// Narrative prose.
    Narrative,
    /// Text extracted from a figure/image.
    FigureText,
    /// Text extracted from a table.
    TableText,
    /// A section heading.
    Heading,
}

/// The layout region a chunk was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionType {
    /// A table — atomic, never split.
    Table,
    /// A figure or image — atomic, never split.
    Figure,
    /// Narrative prose — may be split by the sliding window.
    Narrative,
}

impl RegionType {
    /// True for region types chunking must never split (spec §4.1).
    pub fn is_atomic(&self) -> bool {
        matches!(self, RegionType::Table | RegionType::Figure)
    }
}

/// A named heuristic signal contributing to `parse_confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSignal {
    /// Signal name (e.g. `"printable_char_ratio"`, `"repetition_penalty"`).
    pub name: String,
    /// The signal's contribution, in `[0, 1]`.
    pub value: f32,
}

/// The role a concept anchor plays at its span (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorRole {
    /// The span's primary subject.
    Primary,
    /// An incidental mention.
    Mention,
    /// The span defines the concept.
    Definition,
    /// The span gives an example of the concept.
    Example,
}

impl AnchorRole {
    /// Parse a role name, falling back to [`AnchorRole::Mention`] for any
    /// value outside the strict enumeration (spec §4.2).
    pub fn parse_or_fallback(raw: &str) -> Self {
        match raw {
            "primary" => AnchorRole::Primary,
            "definition" => AnchorRole::Definition,
            "example" => AnchorRole::Example,
            "mention" => AnchorRole::Mention,
            _ => AnchorRole::Mention,
        }
    }
}

/// An anchor binding a concept to a span within a chunk. The payload is
/// strictly these four fields — no caller may attach anything else (spec
/// §3, §4.2, §7 schema-violation rejection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorPayload {
    /// The concept being anchored.
    pub concept_id: ConceptId,
    /// Caller-supplied label for the mention (e.g. a surface form).
    pub label: String,
    /// The role this mention plays at its span.
    pub role: AnchorRole,
    /// Chunk-local `[start, end)` character span.
    pub span: (usize, usize),
}
