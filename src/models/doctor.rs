use serde::{Deserialize, Serialize};

use crate::identity::DoctorKey;
use crate::store::TreePath;

/// Registration-time doctor profile at `doctors/{doctorId}`.
///
/// Written by the registration flow, read-only to this core. Specialty and
/// image may be absent on older records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    #[serde(rename = "Name")]
    pub display_name: String,
    #[serde(rename = "Spl", default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl DoctorProfile {
    pub const COLLECTION: &'static str = "doctors";

    pub fn collection() -> TreePath {
        TreePath::from_segments([Self::COLLECTION])
    }

    /// `doctors/{doctorId}`.
    pub fn path(doctor: &DoctorKey) -> TreePath {
        Self::collection().child(doctor.as_str())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_persisted_field_names() {
        let profile: DoctorProfile = serde_json::from_value(json!({
            "Name": "Dr. Grey",
            "Spl": "Cardiology",
            "image": "gs://pics/grey.png",
        }))
        .unwrap();
        assert_eq!(profile.display_name, "Dr. Grey");
        assert_eq!(profile.specialty.as_deref(), Some("Cardiology"));
    }

    #[test]
    fn specialty_and_image_are_optional() {
        let profile: DoctorProfile =
            serde_json::from_value(json!({ "Name": "Dr. Grey" })).unwrap();
        assert_eq!(profile.specialty, None);
        assert_eq!(profile.image_ref, None);
    }

    #[test]
    fn name_is_required() {
        assert!(serde_json::from_value::<DoctorProfile>(json!({ "Spl": "ENT" })).is_err());
    }
}
