// Copyright 2025 Cowboy AI, LLC.

//! Tenant marker configuration and the per-component default knobs named
//! throughout the spec.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One tenant-declared rule governing how a raw marker mention resolves to a
/// canonical marker (spec §4.4). Rules are sorted by `priority` descending;
/// `output_template` may reference `{entity}`, `{base_version}`, and capture
/// groups (`{$1}`…`{$N}`) from `pattern`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRule {
    /// Stable rule identity, used to break ties deterministically.
    pub rule_id: String,
    /// Regex matched against a mention's surface form.
    pub pattern: String,
    /// Template interpolated on match to produce the canonical marker name.
    pub output_template: String,
    /// Requires a resolved entity anchor to fire at all.
    pub requires_entity: bool,
    /// Requires the resolved entity anchor to pass the "strong" test (spec
    /// §4.4: ≥3 mentions or a primary/subject role).
    pub requires_strong_entity: bool,
    /// Requires a known base version to fire at all.
    pub requires_base_version: bool,
    /// Higher priority wins when multiple rules match the same mention.
    pub priority: i32,
    /// Resolution confidence this rule reports when it fires.
    pub confidence: f32,
    /// Disabled rules are skipped entirely during resolution.
    pub enabled: bool,
}

/// Tenant-wide constraints governing marker resolution (spec §4.4/§6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerConstraints {
    /// Require an entity anchor before an ambiguous rule is allowed to fire.
    pub require_entity_for_ambiguous: bool,
    /// Minimum confidence at which a resolution is auto-applied rather than
    /// queued for review.
    pub auto_apply_threshold: f32,
    /// Maximum number of aliases a tenant may declare.
    pub max_aliases: u32,
    /// When true, a tie at the top mention count during entity-anchor
    /// selection yields no anchor rather than an arbitrary pick (spec §4.4
    /// "Entity Anchor selection").
    pub single_entity_required: bool,
}

impl Default for MarkerConstraints {
    fn default() -> Self {
        Self {
            require_entity_for_ambiguous: false,
            auto_apply_threshold: 0.8,
            max_aliases: 50,
            single_entity_required: false,
        }
    }
}

/// Tenant-scoped marker normalization configuration (spec §4.4/§6): the
/// blacklist, alias table, priority-ordered rule set, and constraints that
/// `MarkerNormalizer` consults before falling back to the raw surface form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantMarkerConfig {
    /// Owning tenant.
    pub tenant_id: String,
    /// Configuration document version, bumped whenever a tenant edits rules.
    pub version: u32,
    /// Surface forms to discard outright (never produce a `CanonicalMarker`).
    pub blacklist: Vec<String>,
    /// Exact-match aliases from surface form to canonical marker name.
    pub aliases: HashMap<String, String>,
    /// Pattern-based resolution rules, tried in descending priority order.
    pub rules: Vec<MarkerRule>,
    /// Tenant-wide resolution constraints.
    pub constraints: MarkerConstraints,
}

/// Defaults for [`crate::chunking::ChunkingEngine`] (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens.
    pub chunk_size_tokens: u32,
    /// Token overlap between adjacent chunks.
    pub overlap_tokens: u32,
    /// Minimum token count before a trailing chunk is merged into its
    /// predecessor instead of standing alone.
    pub minimum_chunk_tokens: u32,
    /// Minimum character overlap used by the orphan-chunk check (spec §4.1,
    /// §7 fail-fast invariant).
    pub orphan_overlap_min_chars: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size_tokens: 256,
            overlap_tokens: 64,
            minimum_chunk_tokens: 50,
            orphan_overlap_min_chars: 20,
        }
    }
}

/// Defaults for the canonicalizer's circuit breaker guarding the LLM
/// fallback path (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing a trial request.
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
        }
    }
}

/// Defaults for the distributed lock guarding canonical-concept promotion
/// (spec §4.3/§5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Lease duration before a lock is considered abandoned.
    pub ttl_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { ttl_secs: 5 }
    }
}

/// Defaults for [`crate::topic`] extraction and `COVERS` edge construction
/// (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Maximum number of topics per document.
    pub max_topics: u32,
    /// Maximum `SUBTOPIC_OF` nesting depth.
    pub max_level: u8,
    /// Maximum number of concepts a single topic covers.
    pub top_k_concepts: u32,
    /// Concepts below this doc-local salience are dropped as noise.
    pub salience_floor: f32,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            max_topics: 30,
            max_level: 2,
            top_k_concepts: 15,
            salience_floor: 0.25,
        }
    }
}
