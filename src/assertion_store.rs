//! C9 AssertionStore — per-claim assertion attachments, marker-keyed diffing,
//! and polarity conflict detection (spec §4.9).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::errors::CoreResult;
use crate::identifiers::{ClaimId, MarkerMentionId};
use crate::model::assertion::{AssertionAttachment, Polarity};

/// Stable key for "which markers this assertion is scoped under",
/// independent of marker list ordering (spec §4.9 "diff by marker").
fn marker_key(markers: &[MarkerMentionId]) -> Vec<MarkerMentionId> {
    let mut sorted = markers.to_vec();
    sorted.sort();
    sorted
}

/// Result of comparing two snapshots of a claim's assertions, grouped by
/// marker key (spec §4.9).
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionDiff {
    /// Marker-scoped assertions present only in the first snapshot.
    pub only_in_a: Vec<AssertionAttachment>,
    /// Marker-scoped assertions present only in the second snapshot.
    pub only_in_b: Vec<AssertionAttachment>,
    /// Assertions present in both snapshots with identical polarity/scope.
    pub in_both: Vec<(AssertionAttachment, AssertionAttachment)>,
    /// Assertions present in both snapshots whose polarity or scope changed.
    pub changed: Vec<(AssertionAttachment, AssertionAttachment)>,
}

/// Diff two assertion snapshots by marker key (spec §4.9).
pub fn diff_by_marker(a: &[AssertionAttachment], b: &[AssertionAttachment]) -> AssertionDiff {
    let mut by_key_b: HashMap<Vec<MarkerMentionId>, &AssertionAttachment> = HashMap::new();
    for assertion in b {
        by_key_b.insert(marker_key(&assertion.markers), assertion);
    }

    let mut only_in_a = Vec::new();
    let mut in_both = Vec::new();
    let mut changed = Vec::new();
    let mut matched_keys = std::collections::HashSet::new();

    for assertion in a {
        let key = marker_key(&assertion.markers);
        match by_key_b.get(&key) {
            Some(counterpart) => {
                matched_keys.insert(key);
                if assertion.polarity == counterpart.polarity && assertion.scope == counterpart.scope {
                    in_both.push((assertion.clone(), (*counterpart).clone()));
                } else {
                    changed.push((assertion.clone(), (*counterpart).clone()));
                }
            }
            None => only_in_a.push(assertion.clone()),
        }
    }

    let only_in_b = b
        .iter()
        .filter(|assertion| !matched_keys.contains(&marker_key(&assertion.markers)))
        .cloned()
        .collect();

    AssertionDiff {
        only_in_a,
        only_in_b,
        in_both,
        changed,
    }
}

/// True if the given assertions contain contradictory polarities
/// (`Affirmed` vs `Negated`) under the *same* marker key (spec §4.9
/// "conflict flag").
pub fn has_polarity_conflict(assertions: &[AssertionAttachment]) -> bool {
    let mut seen: HashMap<Vec<MarkerMentionId>, Polarity> = HashMap::new();
    for assertion in assertions {
        let key = marker_key(&assertion.markers);
        match seen.get(&key) {
            Some(existing) => {
                let contradictory = matches!(
                    (existing, assertion.polarity),
                    (Polarity::Affirmed, Polarity::Negated) | (Polarity::Negated, Polarity::Affirmed)
                );
                if contradictory {
                    return true;
                }
            }
            None => {
                seen.insert(key, assertion.polarity);
            }
        }
    }
    false
}

/// Storage seam for per-claim assertion attachments (spec §4.9).
#[async_trait]
pub trait AssertionStore: Send + Sync {
    /// Record an assertion attachment for a claim.
    async fn record(&self, attachment: AssertionAttachment) -> CoreResult<()>;

    /// All assertions recorded for a claim, in insertion order.
    async fn for_claim(&self, claim_id: ClaimId) -> CoreResult<Vec<AssertionAttachment>>;
}

/// In-memory reference implementation.
#[derive(Default)]
pub struct InMemoryAssertionStore {
    by_claim: RwLock<HashMap<ClaimId, Vec<AssertionAttachment>>>,
}

impl InMemoryAssertionStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssertionStore for InMemoryAssertionStore {
    async fn record(&self, attachment: AssertionAttachment) -> CoreResult<()> {
        self.by_claim
            .write()
            .expect("assertion store lock poisoned")
            .entry(attachment.claim_id)
            .or_default()
            .push(attachment);
        Ok(())
    }

    async fn for_claim(&self, claim_id: ClaimId) -> CoreResult<Vec<AssertionAttachment>> {
        Ok(self
            .by_claim
            .read()
            .expect("assertion store lock poisoned")
            .get(&claim_id)
            .cloned()
            .unwrap_or_default())
    }
}
