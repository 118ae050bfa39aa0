//! ProtoConcept, CanonicalConcept, and Topic (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{CanonicalId, ChunkId, ConceptId, DocId, TenantId, TopicId};

/// An unresolved candidate concept extracted from a chunk. Immutable once
/// created (spec §3) — canonicalization produces a separate
/// [`CanonicalConcept`] and links back via `PROMOTED_TO`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoConcept {
    /// This proto-concept's identity.
    pub concept_id: ConceptId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Raw surface form as extracted.
    pub concept_name: String,
    /// Caller-supplied or inferred type hint.
    pub concept_type: String,
    /// What produced this candidate (e.g. `"ner"`, `"regex"`, `"llm"`).
    pub extraction_method: String,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f32,
    /// The document segment this concept was extracted from, if known.
    pub segment_id: Option<String>,
    /// Owning document.
    pub document_id: DocId,
    /// Chunks this concept was mentioned in.
    pub chunk_ids: Vec<ChunkId>,
    /// Opaque extraction metadata.
    pub metadata_json: serde_json::Value,
}

/// The tenant-unique, deduplicated form of a concept (spec §3). Mutations
/// are append-only to `chunk_ids`/`document_ids` and monotonic on `support`
/// — nothing here is ever overwritten or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalConcept {
    /// Globally unique, content-derived from `(tenant_id, canonical_name)`.
    pub canonical_id: CanonicalId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The deduplicated name, unique within the tenant.
    pub canonical_name: String,
    /// A representative surface form, if one was chosen.
    pub surface_form: Option<String>,
    /// Concept type, possibly overridden by an ontology match over an LLM
    /// hint (spec §4.3 step 1).
    pub concept_type: String,
    /// A short unifying definition, if one is available.
    pub unified_definition: Option<String>,
    /// Quality score in `[0, 1]`.
    pub quality_score: f32,
    /// Deduplicated, order-preserving union of every promoted proto's
    /// chunk ids (spec §4.3 chunk-id aggregation).
    pub chunk_ids: Vec<ChunkId>,
    /// Monotonically incremented each time a proto is promoted into this
    /// concept.
    pub support: u32,
    /// Documents this concept has been observed in.
    pub document_ids: Vec<DocId>,
    /// When this concept was first promoted.
    pub promoted_at: DateTime<Utc>,
    /// Opaque audit trail of the canonicalization decision (ontology hit,
    /// LLM reasoning, or fallback), including any `ambiguity_warning`.
    pub decision_trace_json: serde_json::Value,
    /// Optimistic-concurrency version, bumped on every committed mutation.
    pub version: u64,
}

impl CanonicalConcept {
    /// Merge an incoming list of chunk ids into `chunk_ids`, preserving the
    /// existing order and appending only ids not already present (spec
    /// §4.3 chunk-id aggregation: "deduplicate, order-preserving").
    pub fn merge_chunk_ids(&mut self, incoming: &[ChunkId]) {
        for id in incoming {
            if !self.chunk_ids.contains(id) {
                self.chunk_ids.push(*id);
            }
        }
    }

    /// Record another document as a source for this concept, if not already
    /// recorded.
    pub fn observe_document(&mut self, doc_id: DocId) {
        if !self.document_ids.contains(&doc_id) {
            self.document_ids.push(doc_id);
        }
    }
}

impl crate::entity::AggregateRoot for CanonicalConcept {
    type Id = CanonicalId;

    fn id(&self) -> Self::Id {
        self.canonical_id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn increment_version(&mut self) {
        self.version += 1;
    }
}

/// A structural topic: a `CanonicalConcept` with `concept_type == "TOPIC"`
/// in the data model, modeled here as its own struct for type safety (spec
/// §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Deterministic id derived from `(doc_id, level, normalized_title)`.
    pub topic_id: TopicId,
    /// Owning document.
    pub doc_id: DocId,
    /// Normalized title (spec §4.6: lowercased, numbering stripped,
    /// punctuation removed, stop-words filtered, whitespace collapsed).
    pub normalized_title: String,
    /// Nesting depth, `0..=max_level`.
    pub level: u8,
    /// Slash-delimited section path this topic was derived from.
    pub section_path: String,
    /// The first document this topic was observed in.
    pub first_document_id: DocId,
    /// How many times this topic has been re-emitted across documents.
    pub support: u32,
}
