//! C5 ConsolidationStore — the tenant-unique concept store backing
//! canonicalization and concept-concept merging (spec §4.5).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::canonicalize::ConceptRepository;
use crate::entity::AggregateRoot;
use crate::errors::{CoreError, CoreResult};
use crate::identifiers::{CanonicalId, TenantId};
use crate::model::concept::CanonicalConcept;

/// Key identifying a concept-concept `RELATED_TO` edge, order-independent
/// (spec §4.5: the edge is undirected in effect — `(a, b)` and `(b, a)`
/// merge into the same edge).
fn edge_key(a: CanonicalId, b: CanonicalId) -> (CanonicalId, CanonicalId) {
    if a.as_uuid() <= b.as_uuid() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Merged attributes of a `RELATED_TO` edge (spec §4.5 "upsert-with-merge").
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedToEdge {
    /// Endpoint ids, order-normalized (see [`edge_key`]).
    pub endpoints: (CanonicalId, CanonicalId),
    /// Number of times this relation has been independently observed.
    pub observation_count: u32,
    /// Strongest confidence seen across all observations.
    pub max_confidence: f32,
}

/// In-memory reference implementation of the consolidation store (spec
/// §4.5). A production deployment backs this with a real graph store; this
/// type exists so the rest of the core has something concrete to run
/// against in tests.
#[derive(Default)]
pub struct InMemoryConsolidationStore {
    concepts: RwLock<HashMap<CanonicalId, CanonicalConcept>>,
    names: RwLock<HashMap<(String, String), CanonicalId>>,
    promotions: RwLock<HashMap<crate::identifiers::ConceptId, CanonicalId>>,
    edges: RwLock<HashMap<(CanonicalId, CanonicalId), RelatedToEdge>>,
}

impl InMemoryConsolidationStore {
    /// Construct an empty store. Mirrors the teacher's in-memory stores,
    /// which expose a schema no-op for parity with real backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// No-op placeholder matching a real store's migration entry point
    /// (SPEC_FULL §11): a backing graph/vector store would create indices
    /// here; the in-memory store has nothing to provision.
    pub fn ensure_schema(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Record that `proto_id` was promoted to `canonical_id`, enforcing the
    /// 1:1 `PROMOTED_TO` invariant (spec §8 invariant 3).
    pub fn record_promotion(
        &self,
        proto_id: crate::identifiers::ConceptId,
        canonical_id: CanonicalId,
    ) -> CoreResult<()> {
        let mut promotions = self.promotions.write().expect("promotions lock poisoned");
        if let Some(existing) = promotions.get(&proto_id) {
            if *existing != canonical_id {
                return Err(CoreError::Conflict(format!(
                    "proto concept {proto_id} already promoted to a different canonical concept"
                )));
            }
            return Ok(());
        }
        promotions.insert(proto_id, canonical_id);
        Ok(())
    }

    /// Upsert-with-merge a `RELATED_TO` observation between two canonical
    /// concepts (spec §4.5): repeated observations accumulate a count and
    /// keep the strongest confidence rather than overwriting.
    pub fn upsert_related_to(&self, a: CanonicalId, b: CanonicalId, confidence: f32) -> RelatedToEdge {
        let key = edge_key(a, b);
        let mut edges = self.edges.write().expect("edges lock poisoned");
        let edge = edges.entry(key).or_insert_with(|| RelatedToEdge {
            endpoints: key,
            observation_count: 0,
            max_confidence: 0.0,
        });
        edge.observation_count += 1;
        edge.max_confidence = edge.max_confidence.max(confidence);
        edge.clone()
    }

    /// Fetch a `RELATED_TO` edge between two concepts, if one has been
    /// observed.
    pub fn related_to(&self, a: CanonicalId, b: CanonicalId) -> Option<RelatedToEdge> {
        self.edges.read().expect("edges lock poisoned").get(&edge_key(a, b)).cloned()
    }

    fn name_key(tenant_id: &TenantId, canonical_name: &str) -> (String, String) {
        (tenant_id.as_str().to_string(), canonical_name.to_string())
    }
}

#[async_trait]
impl ConceptRepository for InMemoryConsolidationStore {
    async fn find_by_canonical_name(
        &self,
        tenant_id: &TenantId,
        canonical_name: &str,
    ) -> CoreResult<Option<CanonicalConcept>> {
        let names = self.names.read().expect("names lock poisoned");
        let key = Self::name_key(tenant_id, canonical_name);
        match names.get(&key) {
            Some(canonical_id) => {
                let concepts = self.concepts.read().expect("concepts lock poisoned");
                Ok(concepts.get(canonical_id).cloned())
            }
            None => Ok(None),
        }
    }

    /// Upsert a canonical concept, enforcing `(tenant_id, canonical_name)`
    /// uniqueness (spec §4.5, §8 invariant 5) and optimistic concurrency via
    /// `version` (spec §4.5 "upsert-with-merge"): a write against a stale
    /// version is rejected rather than silently clobbering a concurrent
    /// mutation.
    async fn upsert(&self, concept: CanonicalConcept) -> CoreResult<CanonicalConcept> {
        let key = Self::name_key(&concept.tenant_id, &concept.canonical_name);
        let mut names = self.names.write().expect("names lock poisoned");
        let mut concepts = self.concepts.write().expect("concepts lock poisoned");

        if let Some(existing_id) = names.get(&key) {
            if *existing_id != concept.canonical_id {
                return Err(CoreError::Conflict(format!(
                    "canonical name '{}' already belongs to a different concept",
                    concept.canonical_name
                )));
            }
        }

        if let Some(existing) = concepts.get(&concept.canonical_id) {
            if concept.version < existing.version {
                return Err(CoreError::Conflict(format!(
                    "stale write to canonical concept {}: version {} behind stored version {}",
                    concept.canonical_id, concept.version, existing.version
                )));
            }
        }

        names.insert(key, concept.canonical_id);
        concepts.insert(concept.canonical_id, concept.clone());
        Ok(concept)
    }
}
