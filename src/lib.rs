// Copyright 2025 Cowboy AI, LLC.

//! # stratakg-core
//!
//! A stratified knowledge-graph ingestion and consolidation core.
//!
//! Documents are parsed into a structural layer (`Document` / `Section` /
//! `DocItem`), chunked and anchored for retrieval ([`chunking`],
//! [`anchor_index`]), and mined for two largely independent semantic layers:
//!
//! - **Concepts**: extraction produces `ProtoConcept`s, which
//!   [`canonicalize`] resolves against an existing ontology (falling back to
//!   an LLM, then to a deterministic title-case heuristic) and
//!   [`consolidation_store`] persists as tenant-unique `CanonicalConcept`s.
//! - **Markers and claims**: [`marker_normalizer`] resolves raw marker
//!   mentions into tenant-unique `CanonicalMarker`s; [`claim_engine`]
//!   compares and aggregates claims scoped under those markers;
//!   [`temporal_axis`] answers since-when/still-applicable queries over
//!   them; [`assertion_store`] tracks which claim is attached to which
//!   markers and flags polarity conflicts.
//!
//! [`topic`] derives structural topics from a document's section tree and
//! the concepts each topic covers. Once both passes are complete,
//! [`archiver`] moves the structural layer to cold storage, preserving the
//! concept and document-identity layers in the live graph.
//!
//! ## Design Principles
//!
//! 1. **Strict contracts at every seam**: anchors, markers, and aggregate
//!    writes are validated against their narrow contract before being
//!    accepted, never silently coerced.
//! 2. **Deterministic ids**: canonical concepts, topics, and marker rules
//!    derive their id from content, not randomness, so concurrent or
//!    repeated writes converge instead of racing.
//! 3. **Typed non-error outcomes**: most "this didn't work out" conditions
//!    (an unresolved marker, an invalid applicability axis, a lock loss) are
//!    typed results the caller matches on, not [`errors::CoreError`] — that
//!    is reserved for conditions that really do abort the operation.
//! 4. **Graceful degradation over hard failure**: the canonicalizer degrades
//!    to a heuristic when the LLM or lock service is unavailable rather than
//!    failing the whole promotion; the circuit breaker in front of the LLM
//!    call exists so degradation kicks in quickly under sustained failure.

#![warn(missing_docs)]

pub mod anchor_index;
pub mod archiver;
pub mod assertion_store;
pub mod canonicalize;
pub mod chunking;
pub mod claim_engine;
pub mod concept_naming;
pub mod config;
pub mod consolidation_store;
pub mod entity;
pub mod errors;
pub mod identifiers;
pub mod marker_normalizer;
pub mod model;
pub mod node_types;
pub mod ontology_quality;
pub mod relationship_types;
pub mod temporal_axis;
pub mod topic;

pub use anchor_index::{AnchorEntry, AnchorIndex};
pub use archiver::{ArchiveBlobStore, ArchiveManifest, ArchiveManifestEntry, ArchivePayload, StructuralArchiver};
pub use assertion_store::{AssertionDiff, AssertionStore, InMemoryAssertionStore};
pub use canonicalize::{Canonicalizer, ConceptRepository, DistributedLock, LlmFallback, LlmSuggestion, OntologyContext};
pub use chunking::{ChunkingEngine, RawAnchor, Segment};
pub use claim_engine::{
    compare_claims, compare_forms, infer_authority, tolerance_for, AggregatedVerdict, AggregationStatus,
    AggregatorPolicy, ComparisonExplanation, ComparisonResult,
};
pub use config::{
    ChunkingConfig, CircuitBreakerConfig, LockConfig, MarkerConstraints, MarkerRule, TenantMarkerConfig, TopicConfig,
};
pub use consolidation_store::{InMemoryConsolidationStore, RelatedToEdge};
pub use entity::{AggregateRoot, Lifecycle};
pub use errors::{CoreError, CoreResult};
pub use marker_normalizer::{
    is_strong_entity_signal, select_entity_anchor, EntityCandidate, EntityHint, MarkerNormalizer,
    NormalizationOutcome, SelectedAnchor,
};
pub use temporal_axis::{
    compare_contexts, compare_markers, since_when, since_when_guarded, still_applicable, validate_axis,
    Applicability, CompareResult, ContextComparison, GuardedSinceWhenResult, LatestPolicy, NumericMarkerLatest,
    OrderingConfidence, SinceWhenResult, StillApplicableResult, TemporalObservation,
};
pub use topic::{normalize_title, ConceptObservation, CoversBuilder, TopicExtractor};

pub use model::assertion::{AssertionAttachment, Polarity as AssertionPolarity, Scope as AssertionScope};
pub use model::chunk::{AnchorPayload, AnchorRole, ChunkKind, ConfidenceSignal, RegionType, TypeAwareChunk};
pub use model::claim::{Authority, Claim, ClaimForm, ClaimFormContext, TruthRegime};
pub use model::concept::{CanonicalConcept, ProtoConcept, Topic};
pub use model::document::{DocItem, Document, DocumentLifecycle, DocumentVersion, ItemType, PassStatus, Section};
pub use model::marker::{CanonicalMarker, MarkerMention, MentionResolution, MentionStatus, ResolvedBy};

pub use identifiers::{
    AssertionId, CanonicalId, ChunkId, ClaimId, ConceptId, DocId, DocVersionId, ItemId,
    MarkerMentionId, RuleId, SectionId, TenantId, TopicId,
};
pub use node_types::NodeLabel;
pub use relationship_types::{Covers, ExtractedFrom, MentionedIn, Polarity as EdgePolarity, RelationKind, SalienceMethod};
pub use concept_naming::rank_candidates_by_similarity;
pub use ontology_quality::{cosine_similarity, ConceptVector, EmbeddingDimension, EmbeddingSchema};
