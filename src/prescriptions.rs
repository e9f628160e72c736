//! Prescription records and attachment linking.
//!
//! Prescriptions are append-only: each submission mints a fresh entry id
//! via the store's `append`, so concurrent submissions for the same
//! patient can never overwrite each other. The attachment upload and the
//! metadata write are not transactional — a crash between them orphans a
//! blob, which is accepted: the metadata record is the source of truth for
//! what a reader sees.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::LedgerError;
use crate::identity::DoctorKey;
use crate::models::{self, Prescription};
use crate::store::LedgerStore;

/// A store-minted prescription entry id.
pub type EntryId = String;

/// Failure reported by the external blob store.
#[derive(Debug, thiserror::Error)]
#[error("blob store: {0}")]
pub struct BlobError(pub String);

/// The external blob store: raw bytes in, opaque reference out. This core
/// never interprets the bytes or the reference format.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` at a caller-chosen path and returns an opaque
    /// reference that [`resolve`](Self::resolve) accepts later.
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError>;

    /// Resolves a stored reference to a retrievable URL.
    fn resolve(&self, reference: &str) -> Result<String, BlobError>;
}

/// Links uploaded files to prescription records.
pub struct PrescriptionLinker {
    store: Arc<LedgerStore>,
    blobs: Arc<dyn BlobStore>,
}

impl PrescriptionLinker {
    pub fn new(store: Arc<LedgerStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Records a prescription for `(doctor, patient)`.
    ///
    /// Mints the entry id first, then uploads the attachment (if any) to a
    /// path derived from the id, then writes the metadata record. An upload
    /// failure is reported as a warning and the record is written without a
    /// reference — deliberately, not as an omission.
    pub fn record(
        &self,
        doctor: &DoctorKey,
        patient_id: &str,
        text: &str,
        attachment: Option<&[u8]>,
    ) -> Result<(EntryId, Prescription), LedgerError> {
        let partition = Prescription::partition(doctor, patient_id);
        let entry_path = self.store.append(&partition)?;
        let entry_id = entry_path
            .leaf()
            .expect("appended path has a leaf segment")
            .to_string();

        let attachment_ref = match attachment {
            Some(bytes) => {
                let blob_path = entry_path.to_string();
                match self.blobs.upload(&blob_path, bytes) {
                    Ok(reference) => Some(reference),
                    Err(err) => {
                        tracing::warn!(
                            %err,
                            path = %blob_path,
                            "attachment upload failed, saving prescription without it"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let record = Prescription {
            text: text.to_string(),
            attachment_ref,
            created_at: Utc::now(),
        };
        self.store
            .put(&entry_path, models::encode(&entry_path, &record)?)?;
        tracing::info!(doctor = %doctor, patient = %patient_id, entry = %entry_id, "prescription recorded");
        Ok((entry_id, record))
    }

    /// All prescriptions for `(doctor, patient)`, entry id ascending.
    /// Entry ids mint in lexicographic order, so this is creation order.
    pub fn list(
        &self,
        doctor: &DoctorKey,
        patient_id: &str,
    ) -> Result<Vec<(EntryId, Prescription)>, LedgerError> {
        let partition = Prescription::partition(doctor, patient_id);
        let Some(snapshot) = self.store.get(&partition)? else {
            return Ok(Vec::new());
        };
        let entries = snapshot.as_object().ok_or_else(|| LedgerError::Schema {
            at: partition.to_string(),
            detail: "expected an object of prescription entries".into(),
        })?;

        let mut listed = Vec::with_capacity(entries.len());
        for (entry_id, raw) in entries {
            let path = partition.child(entry_id);
            listed.push((entry_id.clone(), models::decode(&path, raw.clone())?));
        }
        listed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(listed)
    }

    /// Resolves an attachment reference to a retrievable URL.
    pub fn resolve_attachment(&self, reference: &str) -> Result<String, LedgerError> {
        Ok(self.blobs.resolve(reference)?)
    }
}

/// In-memory [`BlobStore`] for tests and deployments without external
/// storage. References are `mem://{path}`.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let reference = format!("mem://{path}");
        self.blobs
            .lock()
            .map_err(|_| BlobError("blob lock poisoned".into()))?
            .insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    fn resolve(&self, reference: &str) -> Result<String, BlobError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| BlobError("blob lock poisoned".into()))?;
        if blobs.contains_key(reference) {
            Ok(reference.to_string())
        } else {
            Err(BlobError(format!("unknown reference '{reference}'")))
        }
    }
}
