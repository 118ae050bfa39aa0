//! Document, Section, and DocItem — the structural skeleton a document is
//! parsed into before chunking (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{DocId, DocVersionId, ItemId, SectionId, TenantId};

/// The stable identity of an ingested document across all of its versions.
/// Mutated only through creating a new version; the struct itself never
/// changes once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity across versions.
    pub doc_id: DocId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Human-readable title.
    pub title: String,
    /// The version currently considered authoritative.
    pub current_version_id: DocVersionId,
    /// Opaque, caller-supplied metadata.
    pub metadata: serde_json::Value,
    /// When this document was first ingested.
    pub ingested_at: DateTime<Utc>,
    /// Pass-1/pass-2 lifecycle state, gating archival eligibility.
    pub lifecycle: DocumentLifecycle,
    /// Set once the archiver has moved structural nodes to disk.
    pub structural_archived: bool,
    /// When the archive completed, if it has.
    pub structural_archived_at: Option<DateTime<Utc>>,
    /// On-disk location of the archive, if one exists.
    pub structural_archive_path: Option<String>,
}

/// Per-pass lifecycle tracking (spec §3 "Lifecycle states").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLifecycle {
    /// Extraction pass status.
    pub pass1_status: PassStatus,
    /// Enrichment pass status.
    pub pass2_status: PassStatus,
    /// Named phases of pass 2 that have completed, in completion order.
    pub pass2_phases_completed: Vec<String>,
}

impl DocumentLifecycle {
    /// The phase name that gates structural archival (spec §4.10).
    pub const SEMANTIC_CONSOLIDATION_PHASE: &'static str = "semantic_consolidation";

    /// True once both passes report complete and semantic consolidation has
    /// run — the sole eligibility condition for archiving (age limits, if
    /// any, are applied by the caller on top of this).
    pub fn is_archive_eligible(&self) -> bool {
        self.pass1_status == PassStatus::Complete
            && self.pass2_status == PassStatus::Complete
            && self
                .pass2_phases_completed
                .iter()
                .any(|phase| phase == Self::SEMANTIC_CONSOLIDATION_PHASE)
    }
}

/// Status of an ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassStatus {
    /// Not yet started.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Complete,
    /// Terminated with an unrecoverable error; does not cascade to other
    /// documents in the batch (spec §7 propagation policy).
    Failed,
}

/// One immutable, parsed version of a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// This version's identity.
    pub doc_version_id: DocVersionId,
    /// The document this is a version of.
    pub doc_id: DocId,
    /// Monotonically increasing per document.
    pub sequence: u32,
    /// When this version was parsed and stored.
    pub created_at: DateTime<Utc>,
}

/// A layout-derived section within a document version. `section_level == 0`
/// is the synthetic document root (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// This section's identity.
    pub section_id: SectionId,
    /// Owning document.
    pub doc_id: DocId,
    /// Section heading text.
    pub title: String,
    /// Slash-delimited path from the document root, e.g. `/1/1.2`.
    pub section_path: String,
    /// Nesting depth; `0` is the synthetic root.
    pub section_level: u32,
    /// The enclosing section, if any (`None` only for the root).
    pub parent_section_id: Option<SectionId>,
}

/// The kind of content a [`DocItem`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    /// Narrative prose.
    Paragraph,
    /// A section heading.
    Heading,
    /// A table, an atomic region for chunking purposes.
    Table,
    /// A figure or image, an atomic region for chunking purposes.
    Figure,
    /// A bulleted or numbered list.
    List,
    /// An OCR'd or vision-derived page observation.
    VisionPage,
}

impl ItemType {
    /// True for item types that must never be split across chunks (spec
    /// §4.1 "never cut a table").
    pub fn is_atomic(&self) -> bool {
        matches!(self, ItemType::Table | ItemType::Figure)
    }
}

/// An atomic parsed unit of a document (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocItem {
    /// This item's identity.
    pub item_id: ItemId,
    /// Owning document.
    pub doc_id: DocId,
    /// The version this item was parsed from.
    pub doc_version_id: DocVersionId,
    /// What kind of content this item carries.
    pub item_type: ItemType,
    /// Extracted text content.
    pub text: String,
    /// Source page number, if the document has pages.
    pub page_no: Option<u32>,
    /// The section this item belongs to.
    pub section_id: SectionId,
    /// Inclusive start offset into the document's full text.
    pub charspan_start: usize,
    /// Exclusive end offset into the document's full text.
    pub charspan_end: usize,
    /// Position in natural reading order, used to keep chunk emission order
    /// equal to reading order (spec §5 ordering guarantees).
    pub reading_order_index: u32,
}

impl DocItem {
    /// Character span as a half-open range.
    pub fn span(&self) -> (usize, usize) {
        (self.charspan_start, self.charspan_end)
    }
}
