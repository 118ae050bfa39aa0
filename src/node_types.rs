//! Node labels for the stratified graph (spec §3).

use serde::{Deserialize, Serialize};

/// A node label in the graph, matching spec §3's data model one-for-one.
///
/// Used by the archiver's preserved-label check (spec §4.10) and by stores
/// that need to branch on label without downcasting a concrete struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    /// The stable identity of an ingested document across all its versions.
    Document,
    /// One immutable, parsed version of a `Document`.
    DocumentVersion,
    /// A layout-derived section within a document version.
    Section,
    /// An atomic parsed unit (paragraph, table row, list item, ...).
    DocItem,
    /// A retrieval-sized, type-aware chunk built from one or more `DocItem`s.
    TypeAwareChunk,
    /// An unresolved candidate concept extracted from a chunk.
    ProtoConcept,
    /// A tenant-unique concept a `ProtoConcept` was promoted to.
    CanonicalConcept,
    /// A structural grouping of concepts within a document (spec §4.6).
    Topic,
    /// A raw occurrence of a marker surface form in a document.
    MarkerMention,
    /// The tenant-unique marker a `MarkerMention` normalizes to.
    CanonicalMarker,
    /// An extracted factual statement with an attached assertion context.
    Claim,
}

impl NodeLabel {
    /// True for labels spec §4.10/§6 excludes from structural archival: the
    /// archiver refuses to touch these even when asked.
    pub fn is_archive_preserved(&self) -> bool {
        matches!(
            self,
            NodeLabel::Document
                | NodeLabel::DocumentVersion
                | NodeLabel::Section
                | NodeLabel::ProtoConcept
                | NodeLabel::CanonicalConcept
        )
    }

    /// True for labels that sit in the concept/canonicalization layer.
    pub fn is_concept_layer(&self) -> bool {
        matches!(self, NodeLabel::ProtoConcept | NodeLabel::CanonicalConcept)
    }

    /// True for labels that sit in the marker-normalization layer.
    pub fn is_marker_layer(&self) -> bool {
        matches!(self, NodeLabel::MarkerMention | NodeLabel::CanonicalMarker)
    }

    /// The label's name as it appears in the data model (`PascalCase`,
    /// matching spec §3's node naming).
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeLabel::Document => "Document",
            NodeLabel::DocumentVersion => "DocumentVersion",
            NodeLabel::Section => "Section",
            NodeLabel::DocItem => "DocItem",
            NodeLabel::TypeAwareChunk => "TypeAwareChunk",
            NodeLabel::ProtoConcept => "ProtoConcept",
            NodeLabel::CanonicalConcept => "CanonicalConcept",
            NodeLabel::Topic => "Topic",
            NodeLabel::MarkerMention => "MarkerMention",
            NodeLabel::CanonicalMarker => "CanonicalMarker",
            NodeLabel::Claim => "Claim",
        }
    }
}
