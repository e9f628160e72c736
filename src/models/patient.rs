use serde::{Deserialize, Serialize};

use crate::store::TreePath;

/// Registration-time patient record at `users/{patientId}`.
///
/// The patient id is the identity provider's stable identifier, trusted
/// as-is. Read-only to this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub age: u32,
    #[serde(rename = "healthNumber")]
    pub health_number: String,
}

impl PatientProfile {
    pub const COLLECTION: &'static str = "users";

    pub fn collection() -> TreePath {
        TreePath::from_segments([Self::COLLECTION])
    }

    /// `users/{patientId}`.
    pub fn path(patient_id: &str) -> TreePath {
        Self::collection().child(patient_id)
    }
}
