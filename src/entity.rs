//! Lifecycle timestamps and the aggregate-root contract shared by the
//! mutable nodes in the core (`Document`, `CanonicalConcept`, ...).
//!
//! Structural and concept nodes each carry their own typed id from
//! [`crate::identifiers`] rather than a generic `EntityId<T>` — ids here are
//! content- or randomly-derived per type, never uniform — but they share the
//! same two concerns: "when was this touched" and "what version is this, for
//! optimistic concurrency". Those two concerns live here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation/update timestamps shared by every mutable node in the graph.
///
/// Mirrors the teacher's `Entity<T>` timestamp pair, but stores
/// `DateTime<Utc>` rather than `SystemTime` so it round-trips through JSON
/// the way the rest of this crate's wire types do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    /// When the node was first created.
    pub created_at: DateTime<Utc>,
    /// When the node was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Lifecycle {
    /// Start a new lifecycle with both timestamps set to now.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at` to now, leaving `created_at` untouched.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Contract for nodes that are mutated under optimistic concurrency.
///
/// Per the consolidation store's upsert-with-merge semantics (spec §4.5) and
/// the lock-loss convergence path for `CanonicalConcept` promotion (spec
/// §4.3/§5), a writer must be able to tell whether the version it read is
/// still current before committing a merge. This trait is the uniform way
/// every such node exposes that check.
pub trait AggregateRoot: Sized {
    /// The type of id for this aggregate.
    type Id: Copy + Eq + Send + Sync;

    /// The aggregate's id.
    fn id(&self) -> Self::Id;

    /// The aggregate's version, incremented on every committed mutation.
    fn version(&self) -> u64;

    /// Advance the version after a committed mutation.
    fn increment_version(&mut self);
}
