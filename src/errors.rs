// Copyright 2025 Cowboy AI, LLC.

//! Error types for core operations.
//!
//! Per spec §7, most "failure modes" are not errors at all — an unvalidated
//! applicability axis, an unresolved marker, a lock loss — those are typed
//! results the caller matches on (`SinceWhenResult`, `NormalizationStatus`,
//! `LockOutcome`, ...). [`CoreError`] is reserved for the handful of kinds
//! that really do abort an operation: transient I/O, schema violations,
//! invariant breaches, and not-found/conflict conditions.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// A required node, document, or concept could not be found.
    #[error("not found: {entity_type} {id}")]
    NotFound {
        /// Kind of entity that was searched for.
        entity_type: String,
        /// The id that was searched for.
        id: String,
    },

    /// A write would violate a uniqueness or cardinality constraint (spec
    /// §4.5: `(tenant_id, canonical_name)` uniqueness, `PROMOTED_TO` 1:1).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A payload crossed a component boundary carrying data the contract
    /// forbids — e.g. an anchor payload field outside
    /// `{concept_id, label, role, span}` (spec §4.2, §7). Rejected before
    /// persistence, never silently dropped.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// A hard architectural invariant was broken — an atomic region got cut,
    /// or fail-fast orphan checking found an orphan chunk (spec §4.1, §7).
    /// Callers must abort the whole document, not just the offending chunk.
    #[error("invariant breach: {0}")]
    InvariantBreach(String),

    /// Transient failure talking to the graph store, vector store, or
    /// embedding model. Retryable; feeds a circuit breaker where one is in
    /// front of the call (spec §7).
    #[error("transient I/O failure in {operation}: {reason}")]
    Transient {
        /// The operation that failed (e.g. "graph_write", "vector_upsert").
        operation: String,
        /// Underlying failure description.
        reason: String,
    },

    /// The LLM transport is unavailable or returned output that could not be
    /// parsed into the expected shape. Per spec §4.3/§7 this is recoverable
    /// by falling back (title-case + confidence 0.5) rather than aborting.
    #[error("LLM unavailable or malformed output: {0}")]
    LlmUnavailable(String),

    /// The distributed lock service could not be reached. Per spec §4.3/§7
    /// this degrades to a read-after-write path rather than failing the
    /// promotion outright — callers that see this should log a dedup risk
    /// and continue, not abort.
    #[error("lock service unavailable: {0}")]
    LockUnavailable(String),

    /// A JSON (de)serialization failure, usually at a store boundary.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The archiver was asked to operate on a label spec §4.10/§6 declares
    /// preserved (`Document`, `DocumentVersion`, `SectionContext`,
    /// `ProtoConcept`/`CanonicalConcept`, vector chunks).
    #[error("refused to archive preserved label: {0}")]
    PreservedLabel(String),

    /// A cache or archive payload carries a schema version this build does
    /// not understand (spec §6, `CacheLoadResult`).
    #[error("unsupported schema version: {0}")]
    UnsupportedSchemaVersion(String),

    /// Catch-all for conditions not covered above.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl CoreError {
    /// Construct an [`CoreError::Internal`] from any displayable message.
    pub fn internal(msg: impl Into<String>) -> Self {
        CoreError::Internal(msg.into())
    }

    /// True for the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }

    /// True for errors that should trip a circuit breaker on repetition.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Transient { .. } | CoreError::LlmUnavailable(_))
    }

    /// True for errors that should abort the whole document (not just the
    /// current chunk/item) per spec §7 propagation policy.
    pub fn is_invariant_breach(&self) -> bool {
        matches!(self, CoreError::InvariantBreach(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = CoreError::NotFound {
            entity_type: "CanonicalConcept".into(),
            id: "abc".into(),
        };
        assert_eq!(err.to_string(), "not found: CanonicalConcept abc");

        let err = CoreError::Transient {
            operation: "graph_write".into(),
            reason: "timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "transient I/O failure in graph_write: timeout"
        );
    }

    #[test]
    fn classifier_helpers_are_exclusive() {
        let not_found = CoreError::NotFound {
            entity_type: "Document".into(),
            id: "x".into(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_transient());
        assert!(!not_found.is_invariant_breach());

        let transient = CoreError::Transient {
            operation: "vector_upsert".into(),
            reason: "connection reset".into(),
        };
        assert!(transient.is_transient());
        assert!(!transient.is_not_found());

        let breach = CoreError::InvariantBreach("table region split".into());
        assert!(breach.is_invariant_breach());
        assert!(!breach.is_transient());
    }

    #[test]
    fn llm_unavailable_counts_as_transient() {
        let err = CoreError::LlmUnavailable("malformed JSON".into());
        assert!(err.is_transient());
    }

    #[test]
    fn serde_json_conversion() {
        let bad = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
        let converted: CoreError = bad.into();
        assert!(matches!(converted, CoreError::Serialization(_)));
    }

    #[test]
    fn internal_constructor() {
        let err = CoreError::internal("unexpected state");
        assert_eq!(err.to_string(), "internal error: unexpected state");
    }
}
