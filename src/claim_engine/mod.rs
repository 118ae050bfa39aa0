//! C7 ClaimEngine — deterministic claim comparison, authority inference, and
//! aggregation across documents (spec §4.7).

use std::collections::{BTreeMap, HashSet};

use crate::identifiers::ClaimId;
use crate::model::claim::{Authority, Claim, ClaimForm, TruthRegime};

/// Outcome of comparing two claims' forms (spec §4.7 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonResult {
    /// Both claims agree within tolerance.
    Same,
    /// Both claims are of the same comparable form but disagree — for a
    /// numeric value falling outside a claimed range, this is a
    /// contradiction (SPEC_FULL §11 evidence traceability feeds the caller
    /// what to cite).
    Different,
    /// One side names a non-empty, proper subset of what the other allows —
    /// e.g. an assertion confirms one of two claimed alternatives but is
    /// silent on the rest (spec §8 partial-match scenario).
    Partial,
    /// The forms cannot be compared structurally (mismatched variant, unit
    /// mismatch, or either side is free text — spec §4.7 step 2: routed to
    /// LLM fallback rather than this engine).
    Incomparable,
}

/// Whether `value` falls within `[low, high]` widened by `tolerance` on each
/// side (spec §4.7/§8 "range vs. single-value" comparison).
fn value_in_range(low: f64, high: f64, value: f64, tolerance: f64) -> bool {
    value >= low - tolerance && value <= high + tolerance
}

/// Compare a claim's allowed values against an assertion's (spec §4.7 step
/// 4, directional): the assertion must cover every value the claim allows to
/// count as `Same` (SUPPORTS); an assertion naming only some of the claimed
/// values is `Partial`; anything else is `Different`.
fn compare_enum_values(claim_values: &[String], assertion_values: &[String]) -> ComparisonResult {
    let claim_set: HashSet<&String> = claim_values.iter().collect();
    let assertion_set: HashSet<&String> = assertion_values.iter().collect();

    if claim_set.is_subset(&assertion_set) {
        ComparisonResult::Same
    } else if !assertion_set.is_empty() && assertion_set.is_subset(&claim_set) {
        ComparisonResult::Partial
    } else {
        ComparisonResult::Different
    }
}

/// Compare two claim forms deterministically, never invoking an LLM (spec
/// §4.7 steps 1-6). `a` is the claim being checked, `b` the assertion being
/// compared against it; `tolerance` bounds numeric/range agreement.
pub fn compare_forms(a: &ClaimForm, b: &ClaimForm, tolerance: f64) -> ComparisonResult {
    match (a, b) {
        (ClaimForm::NumericValue { value: v1, unit: u1 }, ClaimForm::NumericValue { value: v2, unit: u2 }) => {
            if u1 != u2 {
                ComparisonResult::Incomparable
            } else if (v1 - v2).abs() <= tolerance {
                ComparisonResult::Same
            } else {
                ComparisonResult::Different
            }
        }
        (
            ClaimForm::Range { low: l1, high: h1, unit: u1 },
            ClaimForm::Range { low: l2, high: h2, unit: u2 },
        ) => {
            if u1 != u2 {
                ComparisonResult::Incomparable
            } else if (l1 - l2).abs() <= tolerance && (h1 - h2).abs() <= tolerance {
                ComparisonResult::Same
            } else {
                ComparisonResult::Different
            }
        }
        (ClaimForm::Range { low, high, unit: ru }, ClaimForm::NumericValue { value, unit: nu })
        | (ClaimForm::NumericValue { value, unit: nu }, ClaimForm::Range { low, high, unit: ru }) => {
            if ru != nu {
                ComparisonResult::Incomparable
            } else if value_in_range(*low, *high, *value, tolerance) {
                ComparisonResult::Same
            } else {
                ComparisonResult::Different
            }
        }
        (ClaimForm::Enum { allowed_values: v1 }, ClaimForm::Enum { allowed_values: v2 }) => {
            compare_enum_values(v1, v2)
        }
        (ClaimForm::Boolean(b1), ClaimForm::Boolean(b2)) => {
            if b1 == b2 {
                ComparisonResult::Same
            } else {
                ComparisonResult::Different
            }
        }
        (ClaimForm::TextValue(_), ClaimForm::TextValue(_)) => ComparisonResult::Incomparable,
        _ => ComparisonResult::Incomparable,
    }
}

/// Infer a source's [`Authority`] from a caller-supplied provenance label
/// (spec §4.7 "authority inference"). Unrecognized labels are `Medium`.
pub fn infer_authority(source_type: &str) -> Authority {
    let normalized = source_type.to_lowercase();
    const HIGH: &[&str] = &["contract", "sla", "specification", "spec", "agreement"];
    const LOW: &[&str] = &["marketing", "slide", "deck", "blog", "press-release"];
    if HIGH.iter().any(|s| normalized.contains(s)) {
        Authority::High
    } else if LOW.iter().any(|s| normalized.contains(s)) {
        Authority::Low
    } else {
        Authority::Medium
    }
}

/// The tolerance applied when comparing two numeric/range claims under a
/// given authority and hedge strength (spec §4.7 "tolerance policy table"):
/// higher authority and firmer (less hedged) claims get tighter tolerance.
pub fn tolerance_for(authority: Authority, truth_regime: &TruthRegime, hedge_strength: f32) -> f64 {
    let base: f64 = match authority {
        Authority::High => 0.01,
        Authority::Medium => 0.05,
        Authority::Low => 0.15,
    };
    let regime_factor: f64 = match truth_regime {
        TruthRegime::Factual => 1.0,
        TruthRegime::Conditional => 1.5,
        TruthRegime::Aspirational => 2.0,
    };
    let hedge_factor = 1.0 + hedge_strength as f64;
    base * regime_factor * hedge_factor
}

/// True when `claim_scope` names a dimension the `assertion_scope` is silent
/// on — the assertion was made under a different applicability axis than the
/// claim it's being checked against (spec §4.7 step 5).
fn scope_mismatch(claim_scope: &BTreeMap<String, String>, assertion_scope: &BTreeMap<String, String>) -> bool {
    claim_scope.keys().any(|dim| !assertion_scope.contains_key(dim))
}

/// A reasoned comparison between a claim and a piece of evidence asserted
/// against it (spec §4.7 steps 5-6).
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonExplanation {
    /// The structural comparison result, after scope-mismatch override.
    pub result: ComparisonResult,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Machine-stable reason tag, e.g. `"out_of_range"`, `"scope_mismatch"`.
    pub reason_code: String,
    /// Human-readable explanation of `reason_code`.
    pub reason_message: String,
}

/// Compare a `claim` against a piece of `assertion` evidence, producing a
/// reasoned explanation rather than a bare enum (spec §4.7 steps 2, 5-6):
/// free-text forms route to the LLM fallback reason; a scope mismatch
/// overrides the structural result to `Partial`; otherwise the structural
/// comparison stands, tolerance-adjusted by the claim's authority and hedge.
pub fn compare_claims(claim: &Claim, assertion: &Claim) -> ComparisonExplanation {
    if claim.form.requires_llm_fallback() || assertion.form.requires_llm_fallback() {
        return ComparisonExplanation {
            result: ComparisonResult::Incomparable,
            confidence: 0.0,
            reason_code: "llm_fallback".to_string(),
            reason_message: "free-text form requires LLM-assisted comparison".to_string(),
        };
    }

    let tolerance = tolerance_for(claim.context.authority, &claim.context.truth_regime, claim.context.hedge_strength);
    let structural = compare_forms(&claim.form, &assertion.form, tolerance);
    let confidence = ((claim.confidence + assertion.confidence) / 2.0).clamp(0.0, 1.0);

    if scope_mismatch(&claim.context.scope_dims, &assertion.context.scope_dims) {
        return ComparisonExplanation {
            result: ComparisonResult::Partial,
            confidence,
            reason_code: "scope_mismatch".to_string(),
            reason_message: "assertion is silent on a dimension the claim is scoped to".to_string(),
        };
    }

    let (reason_code, reason_message) = match structural {
        ComparisonResult::Same => ("supports", "assertion covers every value the claim allows"),
        ComparisonResult::Different => ("out_of_range", "assertion falls outside what the claim allows"),
        ComparisonResult::Partial => ("partial_coverage", "assertion covers only some of what the claim allows"),
        ComparisonResult::Incomparable => ("incomparable", "forms cannot be compared structurally"),
    };

    ComparisonExplanation {
        result: structural,
        confidence,
        reason_code: reason_code.to_string(),
        reason_message: reason_message.to_string(),
    }
}

/// The aggregation-level conclusion a body of evidence supports for a claim
/// (spec §4.7 aggregation rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStatus {
    /// A HIGH-authority contradiction dominates regardless of other votes.
    Contradicted,
    /// Every comparable piece of evidence supports the claim, drawn from at
    /// least two independent documents.
    Confirmed,
    /// The evidence is mixed, or too thin to confirm or contradict outright.
    Partial,
    /// No evidence was structurally comparable; an LLM judgment would be
    /// needed, and any confidence reported here is capped at 0.7.
    LlmFallback,
}

/// The result of aggregating evidence about a single claim across documents
/// (spec §4.7 aggregation rules; `supporting_claims` per SPEC_FULL §11).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedVerdict {
    /// The aggregation-level conclusion.
    pub status: AggregationStatus,
    /// The form the verdict rests on, if any evidence was given.
    pub majority_form: Option<ClaimForm>,
    /// Ids of evidence claims supporting the verdict.
    pub supporting_claims: Vec<ClaimId>,
    /// Ids of evidence claims contradicting the verdict.
    pub conflicting_claims: Vec<ClaimId>,
    /// Aggregate confidence in `[0, 1]`.
    pub confidence: f32,
}

const LLM_FALLBACK_CONFIDENCE_CAP: f32 = 0.7;

/// Aggregates evidence claims against a single subject claim (spec §4.7
/// aggregation rules).
pub struct AggregatorPolicy;

impl AggregatorPolicy {
    /// Aggregate `evidence` against `claim`: any HIGH-authority contradiction
    /// dominates, unanimous support from ≥2 distinct documents confirms, a
    /// single support/contradict split at equal authority is partial, and no
    /// structurally comparable evidence falls back to an LLM judgment capped
    /// at [`LLM_FALLBACK_CONFIDENCE_CAP`].
    pub fn aggregate(claim: &Claim, evidence: &[Claim]) -> AggregatedVerdict {
        if evidence.is_empty() {
            return AggregatedVerdict {
                status: AggregationStatus::LlmFallback,
                majority_form: None,
                supporting_claims: vec![],
                conflicting_claims: vec![],
                confidence: 0.0,
            };
        }

        let mut supports: Vec<&Claim> = Vec::new();
        let mut contradicts: Vec<&Claim> = Vec::new();
        let mut partials: Vec<&Claim> = Vec::new();

        for item in evidence {
            let explanation = compare_claims(claim, item);
            match explanation.result {
                ComparisonResult::Same => supports.push(item),
                ComparisonResult::Different => contradicts.push(item),
                ComparisonResult::Partial => partials.push(item),
                ComparisonResult::Incomparable => {}
            }
        }

        if supports.is_empty() && contradicts.is_empty() && partials.is_empty() {
            return AggregatedVerdict {
                status: AggregationStatus::LlmFallback,
                majority_form: None,
                supporting_claims: vec![],
                conflicting_claims: vec![],
                confidence: claim.confidence.min(LLM_FALLBACK_CONFIDENCE_CAP),
            };
        }

        let high_authority_contradiction = !contradicts.is_empty()
            && (claim.context.authority == Authority::High
                || contradicts.iter().any(|item| item.context.authority == Authority::High));
        if high_authority_contradiction {
            let dominant = contradicts
                .iter()
                .find(|item| item.context.authority == Authority::High)
                .unwrap_or(&claim);
            return AggregatedVerdict {
                status: AggregationStatus::Contradicted,
                majority_form: Some(dominant.form.clone()),
                supporting_claims: supports.iter().map(|c| c.claim_id).collect(),
                conflicting_claims: contradicts.iter().map(|c| c.claim_id).collect(),
                confidence: dominant.confidence,
            };
        }

        let distinct_docs: HashSet<_> = supports.iter().map(|c| c.doc_id).collect();
        if contradicts.is_empty() && partials.is_empty() && distinct_docs.len() >= 2 {
            let pooled = supports.iter().map(|c| c.confidence).sum::<f32>() / supports.len() as f32;
            return AggregatedVerdict {
                status: AggregationStatus::Confirmed,
                majority_form: Some(claim.form.clone()),
                supporting_claims: supports.iter().map(|c| c.claim_id).collect(),
                conflicting_claims: vec![],
                confidence: pooled,
            };
        }

        let support_confidence = supports.iter().map(|c| c.confidence).sum::<f32>();
        let contradict_confidence = contradicts.iter().map(|c| c.confidence).sum::<f32>();
        let total = (supports.len() + contradicts.len() + partials.len()) as f32;
        let confidence = if total > 0.0 {
            (support_confidence - contradict_confidence).abs() / total.max(1.0)
        } else {
            0.0
        };

        AggregatedVerdict {
            status: AggregationStatus::Partial,
            majority_form: supports.first().map(|c| c.form.clone()).or_else(|| Some(claim.form.clone())),
            supporting_claims: supports.iter().map(|c| c.claim_id).collect(),
            conflicting_claims: contradicts.iter().map(|c| c.claim_id).collect(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
