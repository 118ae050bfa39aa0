//! Assertion attachments carried on every `EXTRACTED_FROM` edge (spec §3,
//! §4.9).

use serde::{Deserialize, Serialize};

use crate::identifiers::{AssertionId, ClaimId, MarkerMentionId};

/// Whether an assertion affirms, negates, or is otherwise uncertain about
/// its content (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// The claim holds as stated.
    Affirmed,
    /// The claim is explicitly negated.
    Negated,
    /// The claim is stated with a hedge ("may", "typically").
    Hedged,
    /// The source is silent on the claim.
    Absent,
    /// Polarity could not be determined.
    Unknown,
}

/// Whether an assertion's applicability is unconstrained or parameterized
/// by an applicability axis (spec §3, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Unconstrained; applies universally within the document's context.
    General,
    /// Parameterized by one or more applicability axis values.
    Constrained,
    /// Scope could not be determined.
    Unknown,
}

/// The full attachment carried on an `EXTRACTED_FROM` edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionAttachment {
    /// This attachment's identity.
    pub id: AssertionId,
    /// The claim this assertion is attached to.
    pub claim_id: ClaimId,
    /// Affirmed/negated/hedged/absent/unknown.
    pub polarity: Polarity,
    /// General/constrained/unknown.
    pub scope: Scope,
    /// Canonical markers this assertion is scoped under.
    pub markers: Vec<MarkerMentionId>,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f32,
    /// Free-text evidence snippet supporting the extraction.
    pub evidence: String,
}
