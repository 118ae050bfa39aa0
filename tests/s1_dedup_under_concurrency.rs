//! Two workers promoting spelling variants of the same product concurrently
//! must converge on one `CanonicalConcept` rather than racing to create two.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stratakg_core::{
    CanonicalConcept, Canonicalizer, CircuitBreakerConfig, ConceptRepository, CoreResult, DistributedLock,
    LlmFallback, LlmSuggestion, LockConfig, OntologyContext,
};
use stratakg_core::ontology_quality::{ConceptVector, EmbeddingDimension, EmbeddingSchema};
use stratakg_core::identifiers::{ChunkId, ConceptId, DocId, TenantId};
use stratakg_core::model::concept::ProtoConcept;

/// Always resolves every spelling variant of this product to the same
/// canonical name, the way an LLM fallback would once it recognizes both
/// surface forms name the same entity.
struct FixedNameLlm;

#[async_trait]
impl LlmFallback for FixedNameLlm {
    async fn suggest(&self, proto: &ProtoConcept) -> CoreResult<LlmSuggestion> {
        Ok(LlmSuggestion {
            concept_type: proto.concept_type.clone(),
            canonical_name: "SAP S/4HANA Cloud".to_string(),
            confidence: 0.93,
        })
    }
}

struct NoopLock;

#[async_trait]
impl DistributedLock for NoopLock {
    async fn try_acquire(&self, _key: &str, _ttl: Duration) -> CoreResult<bool> {
        Ok(true)
    }
    async fn release(&self, _key: &str) -> CoreResult<()> {
        Ok(())
    }
}

fn proto(tenant: &TenantId, concept_name: &str, chunk_id: ChunkId) -> ProtoConcept {
    ProtoConcept {
        concept_id: ConceptId::new(),
        tenant_id: tenant.clone(),
        concept_name: concept_name.to_string(),
        concept_type: "PRODUCT".to_string(),
        extraction_method: "ner".to_string(),
        confidence: 0.8,
        segment_id: None,
        document_id: DocId::new(),
        chunk_ids: vec![chunk_id],
        metadata_json: serde_json::json!({}),
    }
}

#[tokio::test]
async fn two_spelling_variants_promote_into_one_canonical_concept() {
    let repo = Arc::new(stratakg_core::InMemoryConsolidationStore::new());
    let canonicalizer = Arc::new(Canonicalizer::new(
        CircuitBreakerConfig::default(),
        LockConfig::default(),
        Arc::new(FixedNameLlm),
        Arc::new(NoopLock),
        repo.clone(),
    ));

    let tenant = TenantId::new("acme");
    let schema = EmbeddingSchema::new(vec![EmbeddingDimension { id: "d0".into(), name: "D0".into() }]);
    let empty_features = std::collections::BTreeMap::new();
    let empty_candidates = std::collections::BTreeMap::<String, ConceptVector>::new();

    let chunk_a = ChunkId::new();
    let chunk_b = ChunkId::new();
    let proto_a = proto(&tenant, "S/4HANA Cloud's", chunk_a);
    let proto_b = proto(&tenant, "SAP S/4HANA Cloud", chunk_b);

    let canonicalizer_a = canonicalizer.clone();
    let canonicalizer_b = canonicalizer.clone();
    let schema_a = schema.clone();
    let schema_b = schema.clone();

    let (result_a, result_b) = tokio::join!(
        async move {
            let ontology = OntologyContext {
                schema: &schema_a,
                entity_features: &empty_features,
                candidates: &empty_candidates,
            };
            canonicalizer_a.promote_one(&proto_a, &ontology).await
        },
        async move {
            let empty_features = std::collections::BTreeMap::new();
            let empty_candidates = std::collections::BTreeMap::<String, ConceptVector>::new();
            let ontology = OntologyContext {
                schema: &schema_b,
                entity_features: &empty_features,
                candidates: &empty_candidates,
            };
            canonicalizer_b.promote_one(&proto_b, &ontology).await
        },
    );

    let concept_a = result_a.expect("first promotion should succeed");
    let concept_b = result_b.expect("second promotion should succeed");

    assert_eq!(concept_a.canonical_id, concept_b.canonical_id);
    assert_eq!(concept_a.canonical_name, "SAP S/4HANA Cloud");

    let stored: CanonicalConcept = repo
        .find_by_canonical_name(&tenant, "SAP S/4HANA Cloud")
        .await
        .unwrap()
        .expect("the concept must have been persisted");

    assert_eq!(stored.support, 2);
    let mut chunk_ids = stored.chunk_ids.clone();
    chunk_ids.sort_by_key(|id| id.to_string());
    let mut expected = vec![chunk_a, chunk_b];
    expected.sort_by_key(|id| id.to_string());
    assert_eq!(chunk_ids, expected, "chunk_ids must be a deduplicated union");
}
