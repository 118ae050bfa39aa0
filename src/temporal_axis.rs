//! C8 TemporalAxis — since-when/still-applicable/compare queries over
//! marker-scoped claims (spec §4.8).

use std::cmp::Ordering;
use std::collections::HashSet;

use regex::Regex;

use crate::identifiers::{ClaimId, DocId};
use crate::model::assertion::Polarity;

/// How confidently an ordering between two markers could be established
/// (spec §4.8; `Partial` is this crate's supplement for "markers compared,
/// but at least one side could not be numerically parsed" — see SPEC_FULL
/// §11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingConfidence {
    /// Both markers parsed as numeric version tuples.
    Full,
    /// At least one marker fell back to lexical comparison.
    Partial,
    /// No ordering could be established at all.
    Unknown,
}

/// One claim observed under a specific marker, the unit `TemporalAxis`
/// queries operate over (spec §4.8).
#[derive(Debug, Clone)]
pub struct TemporalObservation {
    /// The canonical marker form this observation is scoped under (e.g.
    /// `"v2.3"`).
    pub marker: String,
    /// The document this observation came from.
    pub doc_id: DocId,
    /// The claim this observation is about.
    pub claim_id: ClaimId,
    /// Affirmed/negated/hedged/absent/unknown at this marker.
    pub polarity: Polarity,
    /// Free-text evidence, scanned for removal language.
    pub evidence: String,
}

/// The result of a `since_when` query (spec §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct SinceWhenResult {
    /// The earliest marker at which the claim was affirmed, if any.
    pub first_marker: Option<String>,
    /// Confidence in the ordering used to find it.
    pub confidence: OrderingConfidence,
}

/// Whether a claim still holds at the latest observed marker — distinguished
/// beyond a bare yes/no (spec §4.8 Question B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// Affirmed (or hedged) at the latest marker, with no removal evidence.
    Applicable,
    /// Removal language corroborates the claim no longer holding.
    Removed,
    /// Negated at the latest marker without explicit removal language —
    /// presumed replaced rather than dropped outright.
    Superseded,
    /// No affirmed, hedged, or negated observation at the latest marker to
    /// decide from (e.g. only `Absent`/`Unknown` polarity).
    Uncertain,
}

/// The result of a `still_applicable` query (spec §4.8 Question B).
#[derive(Debug, Clone, PartialEq)]
pub struct StillApplicableResult {
    /// Applicability of the claim at the latest observed marker.
    pub applicability: Applicability,
    /// Confidence in the marker ordering used.
    pub confidence: OrderingConfidence,
    /// The latest marker considered, if any observations were given.
    pub latest_marker: Option<String>,
}

/// The result of a `compare` query between two markers.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareResult {
    /// How the first marker orders against the second.
    pub ordering: Ordering,
    /// Confidence in that ordering.
    pub confidence: OrderingConfidence,
}

/// The result of a Question C `compare_contexts` query: which claims were
/// observed under one marker context but not the other (spec §4.8 Question
/// C), modeled on [`crate::assertion_store::AssertionDiff`]'s shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextComparison {
    /// Claims observed under the first context only.
    pub only_in_a: Vec<ClaimId>,
    /// Claims observed under the second context only.
    pub only_in_b: Vec<ClaimId>,
    /// Claims observed under both contexts.
    pub in_both: Vec<ClaimId>,
}

/// Parse a marker into a numeric version tuple, e.g. `"v2.3"` -> `[2, 3]`.
/// Non-numeric markers (`"GA"`, `"beta"`) return `None`.
fn parse_marker_order(marker: &str) -> Option<Vec<u32>> {
    let trimmed = marker.trim_start_matches(|c: char| !c.is_ascii_digit());
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split(|c: char| !c.is_ascii_digit()).filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        return None;
    }
    parts.iter().map(|p| p.parse::<u32>().ok()).collect()
}

/// Compare two markers, preferring numeric ordering and falling back to
/// lexical comparison when either side does not parse (spec §4.8).
pub fn compare_markers(a: &str, b: &str) -> CompareResult {
    match (parse_marker_order(a), parse_marker_order(b)) {
        (Some(pa), Some(pb)) => CompareResult {
            ordering: pa.cmp(&pb),
            confidence: OrderingConfidence::Full,
        },
        (None, None) if a == b => CompareResult {
            ordering: Ordering::Equal,
            confidence: OrderingConfidence::Unknown,
        },
        (None, None) => CompareResult {
            ordering: Ordering::Equal,
            confidence: OrderingConfidence::Unknown,
        },
        _ => CompareResult {
            ordering: a.cmp(b),
            confidence: OrderingConfidence::Partial,
        },
    }
}

/// Regex recognizing removal/deprecation language in assertion evidence
/// (spec §4.8 "removal evidence"), used to corroborate a `Negated` polarity
/// at the latest marker.
fn removal_evidence_regex() -> Regex {
    Regex::new(r"(?i)\b(removed|deprecated|discontinued|replaced by|no longer|sunset)\b")
        .expect("removal evidence pattern is valid")
}

/// The result of a guarded `since_when` query that first checks whether the
/// marker key itself is allowed to support temporal queries (spec §4.8/§7:
/// an unvalidated applicability-axis key is a refusal, never a `CoreError`).
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedSinceWhenResult {
    /// True if the query was refused before ever inspecting `observations`.
    pub refused: bool,
    /// Human-readable refusal reason, set only when `refused` is true.
    pub reason: Option<String>,
    /// The underlying query result, set only when not refused.
    pub result: Option<SinceWhenResult>,
}

/// Run `since_when`, but refuse outright when the caller has not validated
/// that `marker` is a legitimate applicability-axis key for this capability,
/// or when the axis itself doesn't have enough variation to order (spec
/// §4.8 "applicability-axis validation", §7 refusal semantics).
pub fn since_when_guarded(
    is_validated_claimkey: bool,
    observations: &[TemporalObservation],
) -> GuardedSinceWhenResult {
    if !is_validated_claimkey {
        return GuardedSinceWhenResult {
            refused: true,
            reason: Some("applicability axis marker key is not validated".to_string()),
            result: None,
        };
    }
    if !validate_axis(observations) {
        return GuardedSinceWhenResult {
            refused: true,
            reason: Some("axis lacks enough distinct documents/markers to order".to_string()),
            result: None,
        };
    }
    GuardedSinceWhenResult {
        refused: false,
        reason: None,
        result: Some(since_when(observations)),
    }
}

/// An axis is only meaningful once it has enough variation to order by
/// (spec §4.8 "applicability-axis validation"): at least two distinct
/// documents and at least two distinct marker values.
pub fn validate_axis(observations: &[TemporalObservation]) -> bool {
    let mut docs: Vec<DocId> = observations.iter().map(|o| o.doc_id).collect();
    docs.sort_by_key(|d| d.to_string());
    docs.dedup();
    let mut markers: Vec<&str> = observations.iter().map(|o| o.marker.as_str()).collect();
    markers.sort_unstable();
    markers.dedup();
    docs.len() >= 2 && markers.len() >= 2
}

/// Find the earliest marker at which the claim was affirmed (spec §4.8
/// `since_when`).
pub fn since_when(observations: &[TemporalObservation]) -> SinceWhenResult {
    let affirmed: Vec<&TemporalObservation> = observations
        .iter()
        .filter(|o| matches!(o.polarity, Polarity::Affirmed | Polarity::Hedged))
        .collect();

    if affirmed.is_empty() {
        return SinceWhenResult {
            first_marker: None,
            confidence: OrderingConfidence::Unknown,
        };
    }

    let mut overall_confidence = OrderingConfidence::Full;
    let mut earliest = affirmed[0];
    for candidate in &affirmed[1..] {
        let result = compare_markers(&candidate.marker, &earliest.marker);
        if result.confidence != OrderingConfidence::Full {
            overall_confidence = OrderingConfidence::Partial;
        }
        if result.ordering == Ordering::Less {
            earliest = candidate;
        }
    }

    SinceWhenResult {
        first_marker: Some(earliest.marker.clone()),
        confidence: overall_confidence,
    }
}

/// Decides which of several tied observations counts as "latest" when
/// marker ordering alone cannot break the tie (spec §4.8). A seam so
/// callers can plug in document-ingestion-time tie-breaking without this
/// module depending on document storage.
pub trait LatestPolicy: Send + Sync {
    /// Pick the latest observation from a non-empty slice.
    fn pick_latest<'a>(&self, observations: &'a [TemporalObservation]) -> Option<&'a TemporalObservation>;
}

/// Default policy: numeric marker order, ties broken by input order
/// (earliest-listed wins, assuming callers list observations in ingestion
/// order).
pub struct NumericMarkerLatest;

impl LatestPolicy for NumericMarkerLatest {
    fn pick_latest<'a>(&self, observations: &'a [TemporalObservation]) -> Option<&'a TemporalObservation> {
        observations.iter().fold(None, |best, candidate| match best {
            None => Some(candidate),
            Some(current) => {
                if compare_markers(&candidate.marker, &current.marker).ordering == Ordering::Greater {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        })
    }
}

/// Whether the claim still holds at the latest observed marker, as selected
/// by `policy` (spec §4.8 Question B). Ordering confidence reflects the
/// comparisons made while establishing which observation is latest.
pub fn still_applicable(observations: &[TemporalObservation], policy: &dyn LatestPolicy) -> StillApplicableResult {
    let Some(latest) = policy.pick_latest(observations) else {
        return StillApplicableResult {
            applicability: Applicability::Uncertain,
            confidence: OrderingConfidence::Unknown,
            latest_marker: None,
        };
    };

    let mut overall_confidence = OrderingConfidence::Full;
    for candidate in observations {
        let result = compare_markers(&candidate.marker, &latest.marker);
        if result.confidence != OrderingConfidence::Full {
            overall_confidence = OrderingConfidence::Partial;
        }
    }

    let removal_pattern = removal_evidence_regex();
    let removed_by_evidence = removal_pattern.is_match(&latest.evidence);

    let applicability = if matches!(latest.polarity, Polarity::Affirmed | Polarity::Hedged) && !removed_by_evidence {
        Applicability::Applicable
    } else if removed_by_evidence {
        Applicability::Removed
    } else if latest.polarity == Polarity::Negated {
        Applicability::Superseded
    } else {
        Applicability::Uncertain
    };

    StillApplicableResult {
        applicability,
        confidence: overall_confidence,
        latest_marker: Some(latest.marker.clone()),
    }
}

/// Set-diff of claims observed under two marker contexts (spec §4.8
/// Question C): which claims were only asserted under `context_a`, only
/// under `context_b`, or under both.
pub fn compare_contexts(observations: &[TemporalObservation], context_a: &str, context_b: &str) -> ContextComparison {
    let claims_a: HashSet<ClaimId> =
        observations.iter().filter(|o| o.marker == context_a).map(|o| o.claim_id).collect();
    let claims_b: HashSet<ClaimId> =
        observations.iter().filter(|o| o.marker == context_b).map(|o| o.claim_id).collect();

    let mut only_in_a: Vec<ClaimId> = claims_a.difference(&claims_b).copied().collect();
    let mut only_in_b: Vec<ClaimId> = claims_b.difference(&claims_a).copied().collect();
    let mut in_both: Vec<ClaimId> = claims_a.intersection(&claims_b).copied().collect();

    only_in_a.sort();
    only_in_b.sort();
    in_both.sort();

    ContextComparison { only_in_a, only_in_b, in_both }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{ClaimId, DocId};

    fn obs(marker: &str, doc_id: DocId, polarity: Polarity, evidence: &str) -> TemporalObservation {
        TemporalObservation {
            marker: marker.to_string(),
            doc_id,
            claim_id: ClaimId::new(),
            polarity,
            evidence: evidence.to_string(),
        }
    }

    fn obs_with_claim(marker: &str, doc_id: DocId, claim_id: ClaimId, polarity: Polarity) -> TemporalObservation {
        TemporalObservation { marker: marker.to_string(), doc_id, claim_id, polarity, evidence: String::new() }
    }

    #[test]
    fn numeric_markers_compare_by_version_tuple_not_lexically() {
        let result = compare_markers("v2.10", "v2.9");
        assert_eq!(result.ordering, Ordering::Greater);
        assert_eq!(result.confidence, OrderingConfidence::Full);
    }

    #[test]
    fn non_numeric_marker_falls_back_to_lexical_with_partial_confidence() {
        let result = compare_markers("GA", "v2.9");
        assert_eq!(result.confidence, OrderingConfidence::Partial);
    }

    #[test]
    fn axis_requires_at_least_two_docs_and_two_markers() {
        let doc_a = DocId::new();
        let single_doc = vec![
            obs("v1", doc_a, Polarity::Affirmed, ""),
            obs("v2", doc_a, Polarity::Affirmed, ""),
        ];
        assert!(!validate_axis(&single_doc));

        let doc_b = DocId::new();
        let two_docs_two_markers = vec![
            obs("v1", doc_a, Polarity::Affirmed, ""),
            obs("v2", doc_b, Polarity::Affirmed, ""),
        ];
        assert!(validate_axis(&two_docs_two_markers));
    }

    #[test]
    fn since_when_finds_earliest_affirmed_marker() {
        let doc = DocId::new();
        let observations = vec![
            obs("v3", doc, Polarity::Affirmed, ""),
            obs("v1", doc, Polarity::Affirmed, ""),
            obs("v2", doc, Polarity::Negated, ""),
        ];
        let result = since_when(&observations);
        assert_eq!(result.first_marker, Some("v1".to_string()));
        assert_eq!(result.confidence, OrderingConfidence::Full);
    }

    #[test]
    fn still_applicable_is_removed_when_latest_marker_carries_removal_language() {
        let doc = DocId::new();
        let observations = vec![
            obs("v1", doc, Polarity::Affirmed, ""),
            obs("v2", doc, Polarity::Negated, "removed in this release"),
        ];
        let result = still_applicable(&observations, &NumericMarkerLatest);
        assert_eq!(result.applicability, Applicability::Removed);
        assert_eq!(result.latest_marker, Some("v2".to_string()));
    }

    #[test]
    fn still_applicable_is_superseded_when_negated_without_removal_language() {
        let doc = DocId::new();
        let observations = vec![
            obs("v1", doc, Polarity::Affirmed, ""),
            obs("v2", doc, Polarity::Negated, "handled differently now"),
        ];
        let result = still_applicable(&observations, &NumericMarkerLatest);
        assert_eq!(result.applicability, Applicability::Superseded);
    }

    #[test]
    fn still_applicable_is_uncertain_when_latest_polarity_is_absent_or_unknown() {
        let doc = DocId::new();
        let absent = vec![obs("v1", doc, Polarity::Absent, "")];
        assert_eq!(still_applicable(&absent, &NumericMarkerLatest).applicability, Applicability::Uncertain);

        let unknown = vec![obs("v1", doc, Polarity::Unknown, "")];
        assert_eq!(still_applicable(&unknown, &NumericMarkerLatest).applicability, Applicability::Uncertain);
    }

    #[test]
    fn still_applicable_is_applicable_when_latest_marker_affirms_without_removal_language() {
        let doc = DocId::new();
        let observations = vec![
            obs("v1", doc, Polarity::Negated, ""),
            obs("v2", doc, Polarity::Affirmed, "still fully supported"),
        ];
        let result = still_applicable(&observations, &NumericMarkerLatest);
        assert_eq!(result.applicability, Applicability::Applicable);
    }

    #[test]
    fn removal_language_overrides_an_affirmed_polarity() {
        let doc = DocId::new();
        let observations = vec![obs("v1", doc, Polarity::Affirmed, "this feature was deprecated")];
        let result = still_applicable(&observations, &NumericMarkerLatest);
        assert_eq!(result.applicability, Applicability::Removed);
    }

    #[test]
    fn removal_vocabulary_recognizes_replaced_by_and_bare_no_longer() {
        let doc = DocId::new();
        let replaced = vec![obs("v1", doc, Polarity::Affirmed, "replaced by the new dashboard")];
        assert_eq!(still_applicable(&replaced, &NumericMarkerLatest).applicability, Applicability::Removed);

        let no_longer = vec![obs("v1", doc, Polarity::Affirmed, "no longer part of the offering")];
        assert_eq!(still_applicable(&no_longer, &NumericMarkerLatest).applicability, Applicability::Removed);
    }

    #[test]
    fn still_applicable_on_empty_input_is_uncertain() {
        let result = still_applicable(&[], &NumericMarkerLatest);
        assert_eq!(result.applicability, Applicability::Uncertain);
        assert_eq!(result.latest_marker, None);
    }

    #[test]
    fn since_when_guarded_refuses_an_unvalidated_claimkey() {
        let doc = DocId::new();
        let observations = vec![obs("v1", doc, Polarity::Affirmed, "")];
        let result = since_when_guarded(false, &observations);
        assert!(result.refused);
        assert!(result.reason.unwrap().contains("not validated"));
        assert!(result.result.is_none());
    }

    #[test]
    fn since_when_guarded_answers_once_validated() {
        let doc_a = DocId::new();
        let doc_b = DocId::new();
        let observations = vec![
            obs("v1", doc_a, Polarity::Affirmed, ""),
            obs("v2", doc_b, Polarity::Affirmed, ""),
        ];
        let result = since_when_guarded(true, &observations);
        assert!(!result.refused);
        assert_eq!(result.result.unwrap().first_marker, Some("v1".to_string()));
    }

    #[test]
    fn numeric_marker_latest_picks_highest_version() {
        let doc = DocId::new();
        let observations = vec![
            obs("v1.0", doc, Polarity::Affirmed, ""),
            obs("v1.9", doc, Polarity::Affirmed, ""),
            obs("v1.2", doc, Polarity::Affirmed, ""),
        ];
        let policy = NumericMarkerLatest;
        let latest = policy.pick_latest(&observations).unwrap();
        assert_eq!(latest.marker, "v1.9");
    }

    #[test]
    fn compare_contexts_partitions_claims_by_presence_in_each_marker() {
        let doc = DocId::new();
        let shared = ClaimId::new();
        let only_a = ClaimId::new();
        let only_b = ClaimId::new();
        let observations = vec![
            obs_with_claim("v1", doc, shared, Polarity::Affirmed),
            obs_with_claim("v2", doc, shared, Polarity::Affirmed),
            obs_with_claim("v1", doc, only_a, Polarity::Affirmed),
            obs_with_claim("v2", doc, only_b, Polarity::Affirmed),
        ];
        let diff = compare_contexts(&observations, "v1", "v2");
        assert_eq!(diff.only_in_a, vec![only_a]);
        assert_eq!(diff.only_in_b, vec![only_b]);
        assert_eq!(diff.in_both, vec![shared]);
    }
}
