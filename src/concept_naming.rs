// Copyright 2025 Cowboy AI, LLC.

//! Candidate ranking for the canonicalizer's ontology-lookup step.
//!
//! Before falling back to an LLM, the canonicalizer (spec §4.3) compares a
//! proto-concept's feature vector against the tenant's existing canonical
//! concepts and offers the closest ones as `possible_matches`. This module
//! is the last mile of that: given a feature vector and a set of named
//! candidate vectors, rank the candidates by cosine similarity.

use std::collections::BTreeMap;

use crate::ontology_quality::{cosine_similarity, ConceptVector, EmbeddingSchema};

/// Rank candidate canonical concepts by similarity to `entity_features`,
/// most similar first, truncated to `top_k`.
pub fn rank_candidates_by_similarity(
    schema: &EmbeddingSchema,
    entity_features: &BTreeMap<String, f64>,
    candidates: &BTreeMap<String, ConceptVector>,
    top_k: usize,
) -> Vec<(String, f64)> {
    let query = ConceptVector::from_features(schema, entity_features);
    let mut scored: Vec<(String, f64)> = candidates
        .iter()
        .map(|(canonical_name, vector)| (canonical_name.clone(), cosine_similarity(&query, vector)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}
