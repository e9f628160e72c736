use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::DoctorKey;
use crate::store::TreePath;

/// A prescription entry at `prescriptions/{doctorId}/{patientId}/{entryId}`.
///
/// Immutable once written; there is no update or delete. The entry id is a
/// store-minted push key, so listing a partition in key order is creation
/// order. `fileUrl` is an opaque blob-store reference and is written as an
/// explicit `null` when no attachment was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    #[serde(rename = "prescription")]
    pub text: String,
    #[serde(rename = "fileUrl")]
    pub attachment_ref: Option<String>,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
}

impl Prescription {
    pub const COLLECTION: &'static str = "prescriptions";

    pub fn collection() -> TreePath {
        TreePath::from_segments([Self::COLLECTION])
    }

    /// `prescriptions/{doctorId}/{patientId}` — one pair's entries.
    pub fn partition(doctor: &DoctorKey, patient_id: &str) -> TreePath {
        Self::collection().child(doctor.as_str()).child(patient_id)
    }

    /// `prescriptions/{doctorId}/{patientId}/{entryId}`.
    pub fn path(doctor: &DoctorKey, patient_id: &str, entry_id: &str) -> TreePath {
        Self::partition(doctor, patient_id).child(entry_id)
    }
}
