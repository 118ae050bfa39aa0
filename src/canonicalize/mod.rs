//! C3 Canonicalizer — ontology lookup, LLM fallback behind a circuit
//! breaker, and lock-guarded promotion into a `CanonicalConcept` (spec
//! §4.3).

pub mod circuit_breaker;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use circuit_breaker::CircuitBreaker;

use crate::config::{CircuitBreakerConfig, LockConfig};
use crate::concept_naming::rank_candidates_by_similarity;
use crate::entity::AggregateRoot;
use crate::errors::CoreResult;
use crate::identifiers::{CanonicalId, ChunkId, TenantId};
use crate::model::concept::{CanonicalConcept, ProtoConcept};
use crate::ontology_quality::{ConceptVector, EmbeddingSchema};

/// Similarity at or above which an ontology match is accepted outright,
/// skipping the LLM fallback entirely (spec §4.3 step 1).
pub const ONTOLOGY_MATCH_THRESHOLD: f64 = 0.85;

/// A second candidate within this distance of the winner triggers an
/// `ambiguity_warning` in the decision trace (spec §4.3, SPEC_FULL §11/§12).
pub const AMBIGUITY_MARGIN: f64 = 0.05;

/// What the LLM fallback returned for a proto-concept it was asked to
/// classify.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSuggestion {
    /// Suggested concept type.
    pub concept_type: String,
    /// Suggested canonical name.
    pub canonical_name: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// The external LLM collaborator used only when ontology lookup does not
/// produce a confident match (spec §4.3 step 2).
#[async_trait]
pub trait LlmFallback: Send + Sync {
    /// Classify a proto-concept. Errors here count toward the circuit
    /// breaker; they do not abort promotion (spec §4.3/§7: degrade to a
    /// title-case fallback instead).
    async fn suggest(&self, proto: &ProtoConcept) -> CoreResult<LlmSuggestion>;
}

/// A distributed lock keyed by `(tenant_id, canonical_name)`, serializing
/// concurrent promotions of the same name (spec §4.3/§5).
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Attempt to acquire the lock for `key`, returning `false` if already
    /// held. Never errors on contention — only on transport failure.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> CoreResult<bool>;

    /// Release a previously acquired lock. Idempotent.
    async fn release(&self, key: &str) -> CoreResult<()>;
}

/// Storage seam the canonicalizer promotes into — implemented by the
/// consolidation store (spec §4.5), kept as its own trait so the
/// canonicalizer does not depend on the store's full surface.
#[async_trait]
pub trait ConceptRepository: Send + Sync {
    /// Look up an existing canonical concept by its uniqueness key.
    async fn find_by_canonical_name(
        &self,
        tenant_id: &TenantId,
        canonical_name: &str,
    ) -> CoreResult<Option<CanonicalConcept>>;

    /// Create or overwrite a canonical concept.
    async fn upsert(&self, concept: CanonicalConcept) -> CoreResult<CanonicalConcept>;
}

/// Everything the canonicalizer needs to classify one proto-concept against
/// the tenant's existing ontology (spec §4.3 step 1). An embedding model is
/// an external collaborator (spec §1); this crate only ranks vectors it is
/// handed.
pub struct OntologyContext<'a> {
    /// The embedding dimension schema the vectors below are expressed in.
    pub schema: &'a EmbeddingSchema,
    /// The proto-concept's feature vector, dimension-id-keyed.
    pub entity_features: &'a BTreeMap<String, f64>,
    /// Existing canonical concept vectors, keyed by canonical name.
    pub candidates: &'a BTreeMap<String, ConceptVector>,
}

/// Ontology lookup, LLM fallback, and lock-guarded promotion (spec §4.3).
pub struct Canonicalizer {
    lock_config: LockConfig,
    llm: Arc<dyn LlmFallback>,
    lock: Arc<dyn DistributedLock>,
    repo: Arc<dyn ConceptRepository>,
    breaker: CircuitBreaker,
}

impl Canonicalizer {
    /// Build a canonicalizer with the given collaborators.
    pub fn new(
        circuit_config: CircuitBreakerConfig,
        lock_config: LockConfig,
        llm: Arc<dyn LlmFallback>,
        lock: Arc<dyn DistributedLock>,
        repo: Arc<dyn ConceptRepository>,
    ) -> Self {
        Self {
            lock_config,
            llm,
            lock,
            repo,
            breaker: CircuitBreaker::new(circuit_config),
        }
    }

    /// Promote one proto-concept, merging into an existing canonical concept
    /// of the same name if one exists (spec §4.3 full pipeline).
    pub async fn promote_one(
        &self,
        proto: &ProtoConcept,
        ontology: &OntologyContext<'_>,
    ) -> CoreResult<CanonicalConcept> {
        let (canonical_name, concept_type, decision_trace) =
            self.classify(proto, ontology).await;

        let lock_key = format!("{}:{}", proto.tenant_id, canonical_name);
        let acquired = match self.lock.try_acquire(&lock_key, Duration::from_secs(self.lock_config.ttl_secs)).await {
            Ok(acquired) => acquired,
            Err(_) => false,
        };

        let result = self
            .merge_or_create(proto, &canonical_name, &concept_type, decision_trace)
            .await;

        if acquired {
            let _ = self.lock.release(&lock_key).await;
        }

        result
    }

    /// Promote every proto-concept independently; one failure does not
    /// abort the rest of the batch (spec §4.3 "batch API").
    pub async fn promote_batch(
        &self,
        protos: &[ProtoConcept],
        ontology: &OntologyContext<'_>,
    ) -> Vec<CoreResult<CanonicalConcept>> {
        let mut results = Vec::with_capacity(protos.len());
        for proto in protos {
            results.push(self.promote_one(proto, ontology).await);
        }
        results
    }

    async fn classify(
        &self,
        proto: &ProtoConcept,
        ontology: &OntologyContext<'_>,
    ) -> (String, String, serde_json::Value) {
        let ranked = rank_candidates_by_similarity(
            ontology.schema,
            ontology.entity_features,
            ontology.candidates,
            2,
        );

        if let Some((top_name, top_score)) = ranked.first() {
            if *top_score >= ONTOLOGY_MATCH_THRESHOLD {
                let ambiguity_warning = ranked
                    .get(1)
                    .map(|(_, second_score)| top_score - second_score <= AMBIGUITY_MARGIN)
                    .unwrap_or(false);
                let trace = serde_json::json!({
                    "method": "ontology_match",
                    "candidate": top_name,
                    "score": top_score,
                    "ambiguity_warning": ambiguity_warning,
                });
                return (top_name.clone(), proto.concept_type.clone(), trace);
            }
        }

        match self.breaker.call(|| self.llm.suggest(proto)).await {
            Ok(suggestion) => {
                let trace = serde_json::json!({
                    "method": "llm_fallback",
                    "confidence": suggestion.confidence,
                });
                (suggestion.canonical_name, suggestion.concept_type, trace)
            }
            Err(_) => {
                let trace = serde_json::json!({
                    "method": "title_case_fallback",
                    "confidence": 0.5,
                });
                (title_case(&proto.concept_name), proto.concept_type.clone(), trace)
            }
        }
    }

    async fn merge_or_create(
        &self,
        proto: &ProtoConcept,
        canonical_name: &str,
        concept_type: &str,
        decision_trace: serde_json::Value,
    ) -> CoreResult<CanonicalConcept> {
        let existing = self
            .repo
            .find_by_canonical_name(&proto.tenant_id, canonical_name)
            .await?;

        let mut concept = match existing {
            Some(existing) => existing,
            None => CanonicalConcept {
                canonical_id: CanonicalId::derive(&proto.tenant_id, canonical_name),
                tenant_id: proto.tenant_id.clone(),
                canonical_name: canonical_name.to_string(),
                surface_form: Some(proto.concept_name.clone()),
                concept_type: concept_type.to_string(),
                unified_definition: None,
                quality_score: proto.confidence,
                chunk_ids: vec![],
                support: 0,
                document_ids: vec![],
                promoted_at: Utc::now(),
                decision_trace_json: decision_trace.clone(),
                version: 0,
            },
        };

        let incoming_chunk_ids: Vec<ChunkId> = proto.chunk_ids.clone();
        concept.merge_chunk_ids(&incoming_chunk_ids);
        concept.observe_document(proto.document_id);
        concept.support += 1;
        concept.decision_trace_json = decision_trace;
        concept.increment_version();

        self.repo.upsert(concept).await
    }
}

/// Ad-hoc title-case used only when both ontology lookup and the LLM
/// fallback fail (spec §4.3/§7: "falls back to title-case + confidence
/// 0.5").
fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::DocId;
    use crate::ontology_quality::EmbeddingDimension;
    use std::sync::Mutex;

    fn schema() -> EmbeddingSchema {
        EmbeddingSchema::new(vec![EmbeddingDimension {
            id: "d0".into(),
            name: "D0".into(),
        }])
    }

    fn proto(name: &str, tenant: &str) -> ProtoConcept {
        ProtoConcept {
            concept_id: crate::identifiers::ConceptId::new(),
            tenant_id: TenantId::new(tenant),
            concept_name: name.to_string(),
            concept_type: "PRODUCT".to_string(),
            extraction_method: "ner".to_string(),
            confidence: 0.7,
            segment_id: None,
            document_id: DocId::new(),
            chunk_ids: vec![ChunkId::new()],
            metadata_json: serde_json::json!({}),
        }
    }

    struct AlwaysErrLlm;
    #[async_trait]
    impl LlmFallback for AlwaysErrLlm {
        async fn suggest(&self, _proto: &ProtoConcept) -> CoreResult<LlmSuggestion> {
            Err(crate::errors::CoreError::LlmUnavailable("down".into()))
        }
    }

    struct AlwaysOkLlm;
    #[async_trait]
    impl LlmFallback for AlwaysOkLlm {
        async fn suggest(&self, proto: &ProtoConcept) -> CoreResult<LlmSuggestion> {
            Ok(LlmSuggestion {
                concept_type: proto.concept_type.clone(),
                canonical_name: proto.concept_name.clone(),
                confidence: 0.9,
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

    #[derive(Default)]
    struct InMemoryRepo {
        concepts: Mutex<BTreeMap<(String, String), CanonicalConcept>>,
    }

    #[async_trait]
    impl ConceptRepository for InMemoryRepo {
        async fn find_by_canonical_name(
            &self,
            tenant_id: &TenantId,
            canonical_name: &str,
        ) -> CoreResult<Option<CanonicalConcept>> {
            let key = (tenant_id.as_str().to_string(), canonical_name.to_string());
            Ok(self.concepts.lock().unwrap().get(&key).cloned())
        }

        async fn upsert(&self, concept: CanonicalConcept) -> CoreResult<CanonicalConcept> {
            let key = (
                concept.tenant_id.as_str().to_string(),
                concept.canonical_name.clone(),
            );
            self.concepts.lock().unwrap().insert(key, concept.clone());
            Ok(concept)
        }
    }

    fn empty_ontology<'a>(schema: &'a EmbeddingSchema, features: &'a BTreeMap<String, f64>, candidates: &'a BTreeMap<String, ConceptVector>) -> OntologyContext<'a> {
        OntologyContext {
            schema,
            entity_features: features,
            candidates,
        }
    }

    #[tokio::test]
    async fn promotes_new_concept_via_llm_when_no_ontology_match() {
        let repo = Arc::new(InMemoryRepo::default());
        let canonicalizer = Canonicalizer::new(
            CircuitBreakerConfig::default(),
            LockConfig::default(),
            Arc::new(AlwaysOkLlm),
            Arc::new(NoopLock),
            repo,
        );
        let schema = schema();
        let features = BTreeMap::new();
        let candidates = BTreeMap::new();
        let ontology = empty_ontology(&schema, &features, &candidates);
        let result = canonicalizer
            .promote_one(&proto("SAP S/4HANA", "acme"), &ontology)
            .await
            .unwrap();
        assert_eq!(result.canonical_name, "SAP S/4HANA");
        assert_eq!(result.support, 1);
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_title_case_fallback() {
        let repo = Arc::new(InMemoryRepo::default());
        let canonicalizer = Canonicalizer::new(
            CircuitBreakerConfig::default(),
            LockConfig::default(),
            Arc::new(AlwaysErrLlm),
            Arc::new(NoopLock),
            repo,
        );
        let schema = schema();
        let features = BTreeMap::new();
        let candidates = BTreeMap::new();
        let ontology = empty_ontology(&schema, &features, &candidates);
        let result = canonicalizer
            .promote_one(&proto("sap s/4hana cloud", "acme"), &ontology)
            .await
            .unwrap();
        assert_eq!(result.canonical_name, "Sap S/4hana Cloud");
    }

    #[tokio::test]
    async fn repromoting_the_same_name_merges_rather_than_duplicates() {
        let repo = Arc::new(InMemoryRepo::default());
        let canonicalizer = Canonicalizer::new(
            CircuitBreakerConfig::default(),
            LockConfig::default(),
            Arc::new(AlwaysOkLlm),
            Arc::new(NoopLock),
            repo,
        );
        let schema = schema();
        let features = BTreeMap::new();
        let candidates = BTreeMap::new();
        let ontology = empty_ontology(&schema, &features, &candidates);
        let first = canonicalizer
            .promote_one(&proto("SAP S/4HANA", "acme"), &ontology)
            .await
            .unwrap();
        let second = canonicalizer
            .promote_one(&proto("SAP S/4HANA", "acme"), &ontology)
            .await
            .unwrap();
        assert_eq!(first.canonical_id, second.canonical_id);
        assert_eq!(second.support, 2);
        assert_eq!(second.version, 1);
    }

    #[tokio::test]
    async fn ontology_match_above_threshold_skips_llm_entirely() {
        let repo = Arc::new(InMemoryRepo::default());
        let canonicalizer = Canonicalizer::new(
            CircuitBreakerConfig::default(),
            LockConfig::default(),
            Arc::new(AlwaysErrLlm),
            Arc::new(NoopLock),
            repo,
        );
        let schema = schema();
        let mut features = BTreeMap::new();
        features.insert("d0".to_string(), 1.0);
        let mut candidates = BTreeMap::new();
        candidates.insert(
            "SAP S/4HANA".to_string(),
            ConceptVector { values: vec![1.0] },
        );
        let ontology = empty_ontology(&schema, &features, &candidates);
        let result = canonicalizer
            .promote_one(&proto("s4 hana", "acme"), &ontology)
            .await
            .unwrap();
        assert_eq!(result.canonical_name, "SAP S/4HANA");
        assert_eq!(
            result.decision_trace_json["method"],
            serde_json::json!("ontology_match")
        );
    }
}
