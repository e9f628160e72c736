//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the ledger core returns [`LedgerError`].
//! Identity normalization and workflow transitions fail fast with a typed
//! variant and never retry internally; partial-failure tolerance (e.g. a
//! lost attachment upload) is handled at the call site, not here.

use crate::models::enums::AppointmentStatus;
use crate::prescriptions::BlobError;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The string handed in as a doctor identity is not email-shaped.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// A referenced appointment, prescription or user record is absent.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// A workflow precondition was violated; stored state is unchanged.
    #[error("invalid transition: appointment is {current}, cannot move to {target}")]
    InvalidTransition {
        current: AppointmentStatus,
        target: AppointmentStatus,
    },

    /// A conditional write observed a concurrent change and was rejected.
    #[error("conflict at {path}: concurrent write detected")]
    Conflict { path: String },

    /// A stored record did not match its expected shape.
    #[error("schema violation at {at}: {detail}")]
    Schema { at: String, detail: String },

    /// An external collaborator (blob store) failed.
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] BlobError),

    /// Caller-supplied input rejected before touching storage.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A ledger lock was poisoned by a panicking writer.
    #[error("ledger lock poisoned")]
    LockPoisoned,
}
