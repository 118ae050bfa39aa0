// Copyright 2025 Cowboy AI, LLC.

//! Concept embedding space (pure, library-level).
//!
//! The canonicalizer's ontology-lookup step (spec §4.3) ranks a proto-concept
//! against the tenant's existing canonical concepts before falling back to an
//! LLM. This module is the pure vector-space half of that: a schema
//! describing the dimensions a concept embedding lives in, and a value
//! vector over that schema. It does not produce embeddings itself — an
//! embedding model is an external collaborator per spec §1 — it only gives
//! the canonicalizer somewhere to put the numbers and a way to compare them.

use std::collections::BTreeMap;

/// One dimension of a concept embedding space.
#[derive(Debug, Clone)]
pub struct EmbeddingDimension {
    /// Stable identifier for the dimension.
    pub id: String,
    /// Human-readable name, for diagnostics.
    pub name: String,
}

/// A schema of embedding dimensions, with a deterministic id → index map.
#[derive(Debug, Clone)]
pub struct EmbeddingSchema {
    dims: Vec<EmbeddingDimension>,
    index: BTreeMap<String, usize>,
}

impl EmbeddingSchema {
    /// Build a schema, indexing dimensions in the order given.
    pub fn new(dims: Vec<EmbeddingDimension>) -> Self {
        let index = dims
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        Self { dims, index }
    }

    /// Number of dimensions in the schema.
    pub fn len(&self) -> usize {
        self.dims.len()
    }

    /// Whether the schema defines zero dimensions.
    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    /// Position of a dimension by id, if present.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }
}

/// A concept's coordinates in an [`EmbeddingSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptVector {
    /// Coordinates, ordered per the schema that produced this vector.
    pub values: Vec<f64>,
}

impl ConceptVector {
    /// A zero vector with the schema's dimensionality.
    pub fn zero(schema: &EmbeddingSchema) -> Self {
        Self {
            values: vec![0.0; schema.len()],
        }
    }

    /// The coordinate at `idx` (caller ensures bounds via the schema).
    pub fn get(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    /// Build a vector from sparse, dimension-id-keyed features — the shape a
    /// caller typically has on hand (term/feature counts) before consulting
    /// the schema's index.
    pub fn from_features(schema: &EmbeddingSchema, features: &BTreeMap<String, f64>) -> Self {
        let mut v = Self::zero(schema);
        for (id, value) in features {
            if let Some(i) = schema.index_of(id) {
                v.values[i] = *value;
            }
        }
        v
    }
}

/// Cosine similarity in `[-1, 1]`, or `0.0` for mismatched or zero vectors.
///
/// Used by the canonicalizer to rank existing canonical concepts against a
/// proto-concept's feature vector before falling back to the LLM (spec
/// §4.3's `possible_matches`).
pub fn cosine_similarity(a: &ConceptVector, b: &ConceptVector) -> f64 {
    if a.values.len() != b.values.len() || a.values.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.values.iter().zip(b.values.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
    }
}
