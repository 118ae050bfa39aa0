// Copyright 2025 Cowboy AI, LLC.

//! Relationship types for edges between the structural, concept, marker, and
//! claim nodes that make up a tenant's stratified graph.

use serde::{Deserialize, Serialize};

use crate::identifiers::{ClaimId, MarkerMentionId};

/// The kind of edge connecting two nodes.
///
/// Edges that carry no data beyond their endpoints are unit variants; edges
/// whose semantics depend on attached data (`COVERS`, `EXTRACTED_FROM`,
/// `MENTIONED_IN`) carry that data inline so a caller pattern-matching on the
/// relation gets the attributes for free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationKind {
    /// `Document -[:HAS_VERSION]-> DocumentVersion`
    HasVersion,
    /// `DocumentVersion -[:HAS_SECTION]-> Section`
    HasSection,
    /// `Section -[:HAS_ITEM]-> DocItem`
    HasItem,
    /// `DocItem -[:IN_CHUNK]-> TypeAwareChunk`
    InChunk,

    /// `ProtoConcept -[:PROMOTED_TO]-> CanonicalConcept`. 1:1 by construction
    /// (spec §4.3/§8 invariant 3): a proto-concept is promoted at most once.
    PromotedTo,
    /// `TypeAwareChunk -[:MENTIONS]-> ProtoConcept|CanonicalConcept`, anchored
    /// at the point the chunking engine recorded the mention.
    Mentions,
    /// `CanonicalConcept -[:RELATED_TO]-> CanonicalConcept`, the
    /// consolidation store's merged concept-concept edge (spec §4.5).
    RelatedTo,

    /// `Document -[:HAS_TOPIC]-> Topic`
    HasTopic,
    /// `Topic -[:SUBTOPIC_OF]-> Topic`, bounded by `max_level` (spec §4.6).
    SubtopicOf,
    /// `Topic -[:COVERS]-> CanonicalConcept`, carrying the salience score and
    /// the scoring method/version that produced it.
    Covers(Covers),

    /// `MarkerMention -[:INSTANCE_OF]-> CanonicalMarker`, set once
    /// normalization resolves the mention (spec §4.4).
    InstanceOf,
    /// `MarkerMention -[:MENTIONED_IN]-> TypeAwareChunk`, carrying how many
    /// times the mention's surface form occurs in that chunk.
    MentionedIn(MentionedIn),

    /// `Claim -[:EXTRACTED_FROM]-> TypeAwareChunk`, carrying the assertion
    /// attachment (polarity, scope, markers, confidence) from spec §4.9.
    ExtractedFrom(ExtractedFrom),
    /// `Claim -[:ABOUT]-> CanonicalConcept`
    About,
}

/// Attributes on a `COVERS` edge (spec §4.6, §9 open question: salience
/// method). `method`/`version` are carried so a future scoring pass can be
/// told apart from edges produced by this one without a migration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covers {
    /// Doc-local salience in `[0, 1]`: `count / max_count_in_doc`.
    pub salience: f32,
    /// Raw mention count the salience was derived from.
    pub mention_count: u32,
    /// Identifies the scoring method that produced `salience`.
    pub method: SalienceMethod,
    /// Schema version of `method`'s output, for forward compatibility.
    pub version: u16,
}

/// How a `COVERS` salience score was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalienceMethod {
    /// `count / max_count_in_doc`, the only method this crate implements.
    DocLocalFrequency,
}

/// Attributes on a `MENTIONED_IN` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionedIn {
    /// How many times this mention's surface form occurs in the chunk.
    pub count: u32,
}

/// Attributes on an `EXTRACTED_FROM` edge: the assertion context a claim was
/// extracted under (spec §4.9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFrom {
    /// Whether the claim affirms or negates its content.
    pub polarity: Polarity,
    /// The applicability scope the claim was made under, if any.
    pub scope: Option<String>,
    /// Canonical markers governing when this claim applies.
    pub markers: Vec<MarkerMentionId>,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Whether an assertion affirms or negates its content (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// The claim holds as stated.
    Affirmed,
    /// The claim is explicitly negated.
    Negated,
}

impl RelationKind {
    /// True for edges that describe parent/child structural containment.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RelationKind::HasVersion
                | RelationKind::HasSection
                | RelationKind::HasItem
                | RelationKind::InChunk
        )
    }

    /// True for edges belonging to the concept layer (proto/canonical
    /// concepts and their consolidation).
    pub fn is_concept_layer(&self) -> bool {
        matches!(
            self,
            RelationKind::PromotedTo | RelationKind::Mentions | RelationKind::RelatedTo
        )
    }

    /// True for edges belonging to the topic/COVERS layer.
    pub fn is_topic_layer(&self) -> bool {
        matches!(
            self,
            RelationKind::HasTopic | RelationKind::SubtopicOf | RelationKind::Covers(_)
        )
    }

    /// True for edges belonging to the marker-normalization layer.
    pub fn is_marker_layer(&self) -> bool {
        matches!(
            self,
            RelationKind::InstanceOf | RelationKind::MentionedIn(_)
        )
    }

    /// True for edges belonging to the claim/assertion layer.
    pub fn is_claim_layer(&self) -> bool {
        matches!(self, RelationKind::ExtractedFrom(_) | RelationKind::About)
    }

    /// A stable, human-readable name matching the edge label conventions
    /// used throughout spec §3's data model (`SCREAMING_SNAKE_CASE`).
    pub fn display_name(&self) -> &'static str {
        match self {
            RelationKind::HasVersion => "HAS_VERSION",
            RelationKind::HasSection => "HAS_SECTION",
            RelationKind::HasItem => "HAS_ITEM",
            RelationKind::InChunk => "IN_CHUNK",
            RelationKind::PromotedTo => "PROMOTED_TO",
            RelationKind::Mentions => "MENTIONS",
            RelationKind::RelatedTo => "RELATED_TO",
            RelationKind::HasTopic => "HAS_TOPIC",
            RelationKind::SubtopicOf => "SUBTOPIC_OF",
            RelationKind::Covers(_) => "COVERS",
            RelationKind::InstanceOf => "INSTANCE_OF",
            RelationKind::MentionedIn(_) => "MENTIONED_IN",
            RelationKind::ExtractedFrom(_) => "EXTRACTED_FROM",
            RelationKind::About => "ABOUT",
        }
    }
}
