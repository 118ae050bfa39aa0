//! Claim and its tagged ClaimForm (spec §3, §4.7).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::identifiers::{ClaimId, DocId, TenantId};

/// An inferred source credibility level, controlling comparison tolerance
/// (spec §4.7 authority inference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Authority {
    /// Marketing copy, slides — widest tolerance.
    Low,
    /// Anything not classified as high or low.
    Medium,
    /// Contracts, SLAs, specifications — narrowest tolerance.
    High,
}

/// How firmly a claim's source commits to it (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruthRegime {
    /// Stated as an unconditional fact.
    Factual,
    /// Stated as a goal, target, or aspiration.
    Aspirational,
    /// Stated conditionally.
    Conditional,
}

/// The tagged shape of a claim's value (spec §3). Dynamic dispatch on
/// extraction/comparison strategy is replaced by an exhaustive match over
/// this enum rather than runtime type selection (spec §9 design notes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClaimForm {
    /// A single number with an optional unit.
    NumericValue {
        /// The numeric value.
        value: f64,
        /// Unit of measure, if any (e.g. `"%"`, `"ms"`).
        unit: Option<String>,
    },
    /// An inclusive numeric range with an optional unit.
    Range {
        /// Lower bound, inclusive.
        low: f64,
        /// Upper bound, inclusive.
        high: f64,
        /// Unit of measure, if any.
        unit: Option<String>,
    },
    /// A set of allowed discrete values.
    Enum {
        /// The allowed values.
        allowed_values: Vec<String>,
    },
    /// A true/false claim.
    Boolean(bool),
    /// Unstructured text — compared by LLM fallback, never structurally
    /// (spec §4.7 step 2).
    TextValue(String),
}

impl ClaimForm {
    /// True for forms that must be routed to LLM-fallback comparison rather
    /// than structural comparison (spec §4.7 step 2).
    pub fn requires_llm_fallback(&self) -> bool {
        matches!(self, ClaimForm::TextValue(_))
    }
}

/// Per-form metadata shared by every `ClaimForm` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimFormContext {
    /// Inferred source credibility.
    pub authority: Authority,
    /// How firmly the source commits to the claim.
    pub truth_regime: TruthRegime,
    /// Strength of hedging language, `0` (none) to `1` (fully hedged).
    pub hedge_strength: f32,
    /// Applicability-axis values this claim is scoped to, if any.
    pub scope_dims: BTreeMap<String, String>,
}

/// A structured claim extracted from a document (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// This claim's identity.
    pub claim_id: ClaimId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Normalized claim text.
    pub text: String,
    /// The exact quoted source text.
    pub verbatim_quote: String,
    /// Caller-supplied claim category.
    pub claim_type: String,
    /// Owning document.
    pub doc_id: DocId,
    /// Extraction confidence in `[0, 1]`.
    pub confidence: f32,
    /// The claim's typed value.
    pub form: ClaimForm,
    /// Context shared across all forms.
    pub context: ClaimFormContext,
}
