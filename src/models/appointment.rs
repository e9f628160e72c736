use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;
use crate::identity::DoctorKey;
use crate::store::TreePath;

/// One appointment slot, stored at `appointments/{doctorId}/{patientId}`.
///
/// The doctor id is the partition path, not a record field. One slot exists
/// per doctor–patient pair; how re-booking an occupied slot behaves is the
/// workflow's `BookingPolicy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "PatientID")]
    pub patient_id: String,
    #[serde(rename = "PatientName")]
    pub patient_name: String,
    #[serde(rename = "Date", with = "wire_date")]
    pub date: NaiveDate,
    /// Display time, e.g. "10:30 AM". Opaque to the ledger.
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Status")]
    pub status: AppointmentStatus,
}

impl Appointment {
    pub const COLLECTION: &'static str = "appointments";

    /// `appointments` — every doctor partition.
    pub fn collection() -> TreePath {
        TreePath::from_segments([Self::COLLECTION])
    }

    /// `appointments/{doctorId}` — one doctor's slots.
    pub fn partition(doctor: &DoctorKey) -> TreePath {
        Self::collection().child(doctor.as_str())
    }

    /// `appointments/{doctorId}/{patientId}` — one slot.
    pub fn path(doctor: &DoctorKey, patient_id: &str) -> TreePath {
        Self::partition(doctor).child(patient_id)
    }
}

/// Appointment dates are persisted as unpadded `M/D/YYYY`.
pub(crate) mod wire_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%-m/%-d/%Y").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, "%m/%d/%Y").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::identity;

    fn sample() -> Appointment {
        Appointment {
            patient_id: "p1".into(),
            patient_name: "Ada".into(),
            date: NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
            time: "10:30 AM".into(),
            status: AppointmentStatus::Pending,
        }
    }

    #[test]
    fn serializes_with_persisted_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "PatientID": "p1",
                "PatientName": "Ada",
                "Date": "7/5/2024",
                "Time": "10:30 AM",
                "Status": "Pending",
            })
        );
    }

    #[test]
    fn date_round_trips_unpadded() {
        let value = serde_json::to_value(sample()).unwrap();
        let back: Appointment = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn slot_path_is_doctor_partitioned() {
        let doctor = identity::normalize("DrA@x.com").unwrap();
        assert_eq!(
            Appointment::path(&doctor, "p1").to_string(),
            "appointments/dra@x/p1"
        );
    }
}
