//! C10 StructuralArchiver — eligibility-gated structural archival with a
//! digest-verified manifest and ordered, batched deletes (spec §4.10).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{CoreError, CoreResult};
use crate::identifiers::DocId;
use crate::model::document::Document;
use crate::node_types::NodeLabel;

/// One archived payload's location and integrity digest (spec §4.10
/// "manifest" — digest per SPEC_FULL §11).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifestEntry {
    /// The node label this payload holds.
    pub label: NodeLabel,
    /// Blob-store path the payload was written to.
    pub path: String,
    /// Hex-encoded SHA-256 digest of the payload, verified on restore.
    pub sha256: String,
}

/// The manifest produced by one archive operation (spec §4.10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    /// The document this archive belongs to.
    pub doc_id: DocId,
    /// When the archive completed.
    pub archived_at: DateTime<Utc>,
    /// One entry per archived payload.
    pub entries: Vec<ArchiveManifestEntry>,
}

/// The external blob store an archive writes to and restores from (spec
/// §1 external collaborators).
#[async_trait]
pub trait ArchiveBlobStore: Send + Sync {
    /// Write `bytes` to `path`, overwriting any existing content.
    async fn write(&self, path: &str, bytes: &[u8]) -> CoreResult<()>;

    /// Read the bytes previously written to `path`.
    async fn read(&self, path: &str) -> CoreResult<Vec<u8>>;
}

/// One node payload queued for archival: its label (checked against the
/// preserved-label list), a caller-chosen blob path, and its serialized
/// bytes.
pub struct ArchivePayload {
    /// The node label this payload represents.
    pub label: NodeLabel,
    /// Where to write this payload in the blob store.
    pub path: String,
    /// The serialized node content.
    pub bytes: Vec<u8>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Archives structural nodes for a document once it is eligible, and
/// restores them back with digest verification (spec §4.10).
pub struct StructuralArchiver {
    blob_store: Arc<dyn ArchiveBlobStore>,
    /// Maximum node deletions per transaction (spec §4.10 "ordered delete
    /// batched at 1000/transaction").
    delete_batch_size: usize,
}

impl StructuralArchiver {
    /// Build an archiver writing to `blob_store`, batching deletes at
    /// `delete_batch_size` per transaction.
    pub fn new(blob_store: Arc<dyn ArchiveBlobStore>, delete_batch_size: usize) -> Self {
        Self {
            blob_store,
            delete_batch_size,
        }
    }

    /// Archive `payloads` for `document`, refusing preserved labels and
    /// documents that are not archive-eligible (spec §4.10, §8 invariant 9).
    /// On success, marks `document` as archived.
    pub async fn archive(
        &self,
        document: &mut Document,
        payloads: Vec<ArchivePayload>,
    ) -> CoreResult<ArchiveManifest> {
        if !document.lifecycle.is_archive_eligible() {
            return Err(CoreError::InvariantBreach(format!(
                "document {} is not archive-eligible",
                document.doc_id
            )));
        }

        for payload in &payloads {
            if payload.label.is_archive_preserved() {
                return Err(CoreError::PreservedLabel(payload.label.display_name().to_string()));
            }
        }

        let mut entries = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let sha256 = sha256_hex(&payload.bytes);
            self.blob_store.write(&payload.path, &payload.bytes).await?;
            entries.push(ArchiveManifestEntry {
                label: payload.label,
                path: payload.path,
                sha256,
            });
        }

        let manifest = ArchiveManifest {
            doc_id: document.doc_id,
            archived_at: Utc::now(),
            entries,
        };

        document.structural_archived = true;
        document.structural_archived_at = Some(manifest.archived_at);
        document.structural_archive_path = Some(format!("{}/manifest.json", document.doc_id));

        Ok(manifest)
    }

    /// Restore every payload in `manifest`, refusing the whole restore if
    /// any entry's content no longer matches its recorded digest (spec
    /// §4.10 "restore refuses on digest mismatch").
    pub async fn restore(&self, manifest: &ArchiveManifest) -> CoreResult<Vec<(NodeLabel, Vec<u8>)>> {
        let mut restored = Vec::with_capacity(manifest.entries.len());
        for entry in &manifest.entries {
            let bytes = self.blob_store.read(&entry.path).await?;
            let actual = sha256_hex(&bytes);
            if actual != entry.sha256 {
                return Err(CoreError::SchemaViolation(format!(
                    "archive entry at {} failed digest verification",
                    entry.path
                )));
            }
            restored.push((entry.label, bytes));
        }
        Ok(restored)
    }

    /// Split `node_ids` into ordered batches of at most `delete_batch_size`,
    /// preserving input order within and across batches (spec §4.10).
    pub fn delete_batches<T: Clone>(&self, node_ids: &[T]) -> Vec<Vec<T>> {
        node_ids
            .chunks(self.delete_batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}
