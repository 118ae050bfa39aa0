//! MarkerMention and CanonicalMarker (spec §3, §4.4).

use serde::{Deserialize, Serialize};

use crate::identifiers::{DocId, MarkerMentionId, RuleId};

/// A raw occurrence of a marker surface form in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerMention {
    /// This mention's identity.
    pub id: MarkerMentionId,
    /// Owning document.
    pub doc_id: DocId,
    /// The surface text as it appeared.
    pub raw_text: String,
    /// Character offset where the mention starts.
    pub position: usize,
    /// Resolution status.
    pub status: MentionStatus,
}

/// Resolution state of a [`MarkerMention`] (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MentionStatus {
    /// Resolved to a canonical marker.
    Resolved,
    /// No rule, alias, or blacklist entry matched.
    Unresolved,
    /// Matched a tenant blacklist entry; never produces a canonical marker.
    Blacklisted,
}

/// What resolved a mention to its canonical marker (spec §3
/// `created_by`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolvedBy {
    /// An exact alias table hit.
    AliasExact,
    /// A pattern rule, by id.
    Rule(RuleId),
    /// Manually curated by an operator.
    Manual,
}

/// The tenant-unique marker a [`MarkerMention`] normalizes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMarker {
    /// Normalized display form, e.g. `"v2.3"`.
    pub canonical_form: String,
    /// The resolved entity this marker is anchored to, if any.
    pub entity_anchor: Option<String>,
    /// Marker category (e.g. `"version"`, `"release"`, `"edition"`).
    pub marker_type: String,
    /// What resolved this marker.
    pub created_by: ResolvedBy,
    /// Resolution confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Link attributes carried on a `MarkerMention -[:INSTANCE_OF]->
/// CanonicalMarker` edge — the rule that fired and its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionResolution {
    /// The rule responsible, if resolution came from a rule.
    pub rule_id: Option<RuleId>,
    /// Resolution confidence in `[0, 1]`.
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_status_variants_are_distinguishable() {
        assert_ne!(MentionStatus::Resolved, MentionStatus::Unresolved);
        assert_ne!(MentionStatus::Unresolved, MentionStatus::Blacklisted);
    }

    #[test]
    fn resolved_by_rule_carries_rule_id() {
        let rule = RuleId::new();
        let resolved = ResolvedBy::Rule(rule);
        match resolved {
            ResolvedBy::Rule(id) => assert_eq!(id, rule),
            _ => panic!("expected Rule variant"),
        }
    }

    #[test]
    fn canonical_marker_serde_roundtrip() {
        let marker = CanonicalMarker {
            canonical_form: "v2.3".to_string(),
            entity_anchor: Some("SAP S/4HANA".to_string()),
            marker_type: "version".to_string(),
            created_by: ResolvedBy::AliasExact,
            confidence: 0.95,
        };
        let json = serde_json::to_string(&marker).unwrap();
        let restored: CanonicalMarker = serde_json::from_str(&json).unwrap();
        assert_eq!(marker, restored);
    }
}
