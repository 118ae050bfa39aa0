//! Typed identifiers for the documents, structural nodes, and concepts that
//! flow through the core.
//!
//! Every id here is a thin `Uuid` newtype (the pattern used throughout the
//! teacher's `identifiers.rs`), except [`CanonicalId`] and [`TopicId`], which
//! are derived deterministically from their content rather than generated
//! randomly — see their `derive` constructors.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID (e.g. one recovered from storage).
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Borrow the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(DocId, "Identifies a `Document` across all of its versions.");
uuid_id!(DocVersionId, "Identifies one immutable version of a `Document`.");
uuid_id!(SectionId, "Identifies a `Section` within a document version.");
uuid_id!(ItemId, "Identifies an atomic parsed `DocItem`.");
uuid_id!(ChunkId, "Identifies a `TypeAwareChunk` retrieval unit.");
uuid_id!(ConceptId, "Identifies a `ProtoConcept` prior to canonicalization.");
uuid_id!(ClaimId, "Identifies an extracted `Claim`.");
uuid_id!(
    MarkerMentionId,
    "Identifies a raw marker mention found in a document."
);
uuid_id!(RuleId, "Identifies a marker-normalization rule.");
uuid_id!(AssertionId, "Identifies an `EXTRACTED_FROM` assertion attachment.");

impl RuleId {
    /// Derive a rule id from its configured `rule_id` string, so the same
    /// tenant rule always yields the same id across processes without
    /// needing to persist a random one.
    pub fn derive(rule_id: &str) -> Self {
        Self(derive_uuid(&format!("rule:{rule_id}")))
    }
}

fn derive_uuid(key: &str) -> Uuid {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

/// A tenant boundary. Every read and write in the core is scoped by one
/// (spec §5, "Tenant isolation"); this id is an opaque string so callers can
/// reuse whatever tenant identifiers their surrounding platform assigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    /// Wrap a raw tenant identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// The globally unique id of a promoted [`crate::model::concept::CanonicalConcept`].
///
/// Canonical ids are content-derived from `(tenant_id, canonical_name)` so
/// two workers racing to promote the same surface form converge on the same
/// id even before either has observed the other's write (spec §5:
/// "CanonicalConcept creation is serialized ... under lock loss, the winner
/// is resolved by read-after-write detection").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalId(Uuid);

impl CanonicalId {
    /// Derive the id for a `(tenant_id, canonical_name)` pair.
    ///
    /// Deterministic: the same pair always yields the same id, which is what
    /// lets concurrent promotions of the same canonical name converge
    /// without coordination beyond the lock described in spec §4.3.
    pub fn derive(tenant_id: &TenantId, canonical_name: &str) -> Self {
        Self(derive_uuid(&format!(
            "canonical:{}:{}",
            tenant_id.as_str(),
            canonical_name
        )))
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The id of a structural [`crate::model::concept::Topic`].
///
/// `topic_id(doc, level, title) == topic_id(doc, level, title')` whenever
/// `normalize(title) == normalize(title')` (spec §8, invariant 6), so this is
/// derived from the already-normalized title, never from a random seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicId(Uuid);

impl TopicId {
    /// Derive a topic id from `(doc_id, level, normalized_title)`.
    pub fn derive(doc_id: DocId, level: u8, normalized_title: &str) -> Self {
        Self(derive_uuid(&format!(
            "topic:{doc_id}:{level}:{normalized_title}"
        )))
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_unique() {
        assert_ne!(ChunkId::new(), ChunkId::new());
    }

    #[test]
    fn chunk_id_serde_roundtrip() {
        let original = ChunkId::new();
        let json = serde_json::to_string(&original).unwrap();
        let restored: ChunkId = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn canonical_id_is_deterministic() {
        let tenant = TenantId::new("acme");
        let a = CanonicalId::derive(&tenant, "SAP S/4HANA Cloud");
        let b = CanonicalId::derive(&tenant, "SAP S/4HANA Cloud");
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_id_differs_by_tenant() {
        let a = CanonicalId::derive(&TenantId::new("acme"), "SAP");
        let b = CanonicalId::derive(&TenantId::new("globex"), "SAP");
        assert_ne!(a, b);
    }

    #[test]
    fn topic_id_stable_across_equivalent_titles() {
        let doc = DocId::new();
        let a = TopicId::derive(doc, 1, "release notes");
        let b = TopicId::derive(doc, 1, "release notes");
        assert_eq!(a, b);
    }

    #[test]
    fn topic_id_differs_by_level() {
        let doc = DocId::new();
        let a = TopicId::derive(doc, 1, "overview");
        let b = TopicId::derive(doc, 2, "overview");
        assert_ne!(a, b);
    }

    #[test]
    fn topic_id_differs_by_document() {
        let a = TopicId::derive(DocId::new(), 1, "overview");
        let b = TopicId::derive(DocId::new(), 1, "overview");
        assert_ne!(a, b);
    }
}
