//! Typed records stored in the ledger tree.
//!
//! One file per entity, plus the string-mapped enums. Records (de)serialize
//! with the exact field names the persisted tree uses, and every read goes
//! through [`decode`] so absent or partial data fails with a schema error
//! at the store boundary instead of flowing onward.

pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod patient;
pub mod prescription;

pub use appointment::Appointment;
pub use doctor::DoctorProfile;
pub use enums::{ActorRole, AppointmentStatus};
pub use patient::PatientProfile;
pub use prescription::Prescription;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::LedgerError;
use crate::store::TreePath;

/// Schema-validating deserialization of a tree value read at `path`.
pub fn decode<T: DeserializeOwned>(path: &TreePath, value: Value) -> Result<T, LedgerError> {
    serde_json::from_value(value).map_err(|err| LedgerError::Schema {
        at: path.to_string(),
        detail: err.to_string(),
    })
}

/// Serializes a record for writing at `path`.
pub fn encode<T: Serialize>(path: &TreePath, record: &T) -> Result<Value, LedgerError> {
    serde_json::to_value(record).map_err(|err| LedgerError::Schema {
        at: path.to_string(),
        detail: err.to_string(),
    })
}
