//! Patient-keyed secondary index over doctor-partitioned appointments.
//!
//! Primary storage partitions appointments by doctor, so "my appointments"
//! has no direct lookup: the index scans every doctor partition, filters on
//! the patient id, and joins the doctor's display name in. Cost is O(total
//! appointments across all doctors) per refresh — acceptable at small fleet
//! scale. A [`PatientFeed`] re-runs the scan on every (coalesced) store
//! notification under `appointments`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LedgerError;
use crate::models::{self, Appointment, AppointmentStatus, DoctorProfile};
use crate::store::{LedgerStore, Subscription};

/// An appointment annotated with its doctor partition and display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAppointment {
    pub doctor_id: String,
    pub doctor_name: String,
    #[serde(flatten)]
    pub appointment: Appointment,
}

#[derive(Clone)]
pub struct PatientIndex {
    store: Arc<LedgerStore>,
}

impl PatientIndex {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Every appointment for `patient_id`, across all doctors. Ordering is
    /// unspecified; use [`sort_by_schedule`](Self::sort_by_schedule) for a
    /// deterministic view.
    pub fn appointments_for(
        &self,
        patient_id: &str,
    ) -> Result<Vec<PatientAppointment>, LedgerError> {
        let snapshot = self
            .store
            .get(&Appointment::collection())?
            .unwrap_or(Value::Null);
        self.scan(patient_id, &snapshot, None)
    }

    /// The Confirmed subset — what the patient's history view shows, and
    /// the context prescriptions are read in.
    pub fn confirmed_for(
        &self,
        patient_id: &str,
    ) -> Result<Vec<PatientAppointment>, LedgerError> {
        let snapshot = self
            .store
            .get(&Appointment::collection())?
            .unwrap_or(Value::Null);
        self.scan(patient_id, &snapshot, Some(AppointmentStatus::Confirmed))
    }

    /// Deterministic client-side ordering: date, then display time.
    pub fn sort_by_schedule(entries: &mut [PatientAppointment]) {
        entries.sort_by(|a, b| {
            (a.appointment.date, &a.appointment.time)
                .cmp(&(b.appointment.date, &b.appointment.time))
        });
    }

    /// A live view: re-scans for `patient_id` on every appointments write.
    pub fn watch(&self, patient_id: &str) -> Result<PatientFeed, LedgerError> {
        Ok(PatientFeed {
            index: self.clone(),
            patient_id: patient_id.to_string(),
            subscription: self.store.subscribe(&Appointment::collection())?,
        })
    }

    fn scan(
        &self,
        patient_id: &str,
        snapshot: &Value,
        only: Option<AppointmentStatus>,
    ) -> Result<Vec<PatientAppointment>, LedgerError> {
        let partitions = match snapshot {
            Value::Null => return Ok(Vec::new()),
            Value::Object(map) => map,
            other => {
                return Err(LedgerError::Schema {
                    at: Appointment::COLLECTION.into(),
                    detail: format!("expected an object of doctor partitions, got {other}"),
                })
            }
        };

        let mut entries = Vec::new();
        for (doctor_id, partition) in partitions {
            let slots = match partition {
                Value::Null => continue,
                Value::Object(map) => map,
                other => {
                    return Err(LedgerError::Schema {
                        at: format!("{}/{doctor_id}", Appointment::COLLECTION),
                        detail: format!("expected an object of slots, got {other}"),
                    })
                }
            };
            for (slot_id, raw) in slots {
                let path = Appointment::collection().child(doctor_id).child(slot_id);
                let appointment: Appointment = models::decode(&path, raw.clone())?;
                if appointment.patient_id != patient_id {
                    continue;
                }
                if let Some(status) = only {
                    if appointment.status != status {
                        continue;
                    }
                }
                entries.push(PatientAppointment {
                    doctor_id: doctor_id.clone(),
                    doctor_name: self.doctor_name(doctor_id)?,
                    appointment,
                });
            }
        }
        Ok(entries)
    }

    /// Joins the doctor's display name; a missing or undecodable profile
    /// falls back to the id rather than failing the listing.
    fn doctor_name(&self, doctor_id: &str) -> Result<String, LedgerError> {
        let path = DoctorProfile::collection().child(doctor_id);
        match self.store.get(&path)? {
            Some(raw) => match models::decode::<DoctorProfile>(&path, raw) {
                Ok(profile) => Ok(profile.display_name),
                Err(err) => {
                    tracing::debug!(doctor = %doctor_id, %err, "undecodable doctor profile, using id");
                    Ok(doctor_id.to_string())
                }
            },
            None => {
                tracing::debug!(doctor = %doctor_id, "no doctor profile, using id");
                Ok(doctor_id.to_string())
            }
        }
    }
}

/// A subscription-driven patient view over the appointments tree.
pub struct PatientFeed {
    index: PatientIndex,
    patient_id: String,
    subscription: Subscription,
}

impl PatientFeed {
    /// The next index state: resolves immediately with the current scan,
    /// then once per coalesced appointments notification. `None` when the
    /// feed is disconnected.
    pub async fn recv(&mut self) -> Option<Result<Vec<PatientAppointment>, LedgerError>> {
        let snapshot = self.subscription.recv().await?;
        Some(self.index.scan(&self.patient_id, &snapshot, None))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::identity::{self, DoctorKey};
    use crate::models::AppointmentStatus;
    use crate::workflow::{AppointmentBook, BookingRequest};

    fn seed_doctor(store: &LedgerStore, key: &DoctorKey, name: &str) {
        store
            .put(&DoctorProfile::path(key), json!({ "Name": name }))
            .unwrap();
    }

    fn book(store: &Arc<LedgerStore>, doctor: &DoctorKey, patient: &str, date: (i32, u32, u32)) {
        AppointmentBook::new(Arc::clone(store))
            .book(
                doctor,
                BookingRequest {
                    patient_id: patient.into(),
                    patient_name: "Ada".into(),
                    date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
                    time: "9:00 AM".into(),
                },
            )
            .unwrap();
    }

    #[test]
    fn empty_store_lists_nothing() {
        let index = PatientIndex::new(Arc::new(LedgerStore::new()));
        assert!(index.appointments_for("p1").unwrap().is_empty());
    }

    #[test]
    fn filters_to_the_querying_patient_and_joins_names() {
        let store = Arc::new(LedgerStore::new());
        let d1 = identity::normalize("d1@x.com").unwrap();
        let d2 = identity::normalize("d2@x.com").unwrap();
        seed_doctor(&store, &d1, "Dr. Grey");
        seed_doctor(&store, &d2, "Dr. House");
        book(&store, &d1, "p1", (2024, 7, 5));
        book(&store, &d2, "p2", (2024, 7, 6));

        let entries = PatientIndex::new(store).appointments_for("p1").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].doctor_id, "d1@x");
        assert_eq!(entries[0].doctor_name, "Dr. Grey");
        assert_eq!(entries[0].appointment.patient_id, "p1");
    }

    #[test]
    fn missing_doctor_profile_falls_back_to_the_id() {
        let store = Arc::new(LedgerStore::new());
        let d1 = identity::normalize("d1@x.com").unwrap();
        book(&store, &d1, "p1", (2024, 7, 5));

        let entries = PatientIndex::new(store).appointments_for("p1").unwrap();
        assert_eq!(entries[0].doctor_name, "d1@x");
    }

    #[test]
    fn confirmed_view_excludes_pending_and_cancelled() {
        let store = Arc::new(LedgerStore::new());
        let d1 = identity::normalize("d1@x.com").unwrap();
        let d2 = identity::normalize("d2@x.com").unwrap();
        let d3 = identity::normalize("d3@x.com").unwrap();
        for doctor in [&d1, &d2, &d3] {
            book(&store, doctor, "p1", (2024, 7, 5));
        }
        let book_engine = AppointmentBook::new(Arc::clone(&store));
        book_engine
            .transition(&d1, "p1", AppointmentStatus::Confirmed)
            .unwrap();
        book_engine
            .transition(&d2, "p1", AppointmentStatus::Cancelled)
            .unwrap();

        let index = PatientIndex::new(store);
        let confirmed = index.confirmed_for("p1").unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].doctor_id, "d1@x");
        // The full listing still carries all three, Cancelled included.
        assert_eq!(index.appointments_for("p1").unwrap().len(), 3);
    }

    #[test]
    fn schedule_sort_orders_by_date_then_time() {
        let entry = |doctor: &str, date: NaiveDate, time: &str| PatientAppointment {
            doctor_id: doctor.into(),
            doctor_name: doctor.into(),
            appointment: Appointment {
                patient_id: "p1".into(),
                patient_name: "Ada".into(),
                date,
                time: time.into(),
                status: AppointmentStatus::Pending,
            },
        };
        let july = |day| NaiveDate::from_ymd_opt(2024, 7, day).unwrap();
        let mut entries = vec![
            entry("d3", july(6), "09:00"),
            entry("d1", july(5), "14:00"),
            entry("d2", july(5), "09:00"),
        ];
        PatientIndex::sort_by_schedule(&mut entries);
        let order: Vec<_> = entries.iter().map(|e| e.doctor_id.as_str()).collect();
        assert_eq!(order, ["d2", "d1", "d3"]);
    }

    #[test]
    fn malformed_slot_fails_the_listing() {
        let store = Arc::new(LedgerStore::new());
        store
            .put(
                &Appointment::collection().child("d1@x").child("p1"),
                json!({ "PatientID": "p1" }),
            )
            .unwrap();

        assert!(matches!(
            PatientIndex::new(store).appointments_for("p1"),
            Err(LedgerError::Schema { .. })
        ));
    }

    #[tokio::test]
    async fn feed_rescans_on_every_notification() {
        let store = Arc::new(LedgerStore::new());
        let d1 = identity::normalize("d1@x.com").unwrap();
        seed_doctor(&store, &d1, "Dr. Grey");

        let index = PatientIndex::new(Arc::clone(&store));
        let mut feed = index.watch("p1").unwrap();
        assert!(feed.recv().await.unwrap().unwrap().is_empty());

        book(&store, &d1, "p1", (2024, 7, 5));
        let entries = feed.recv().await.unwrap().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].appointment.status, AppointmentStatus::Pending);

        AppointmentBook::new(Arc::clone(&store))
            .transition(&d1, "p1", AppointmentStatus::Confirmed)
            .unwrap();
        let entries = feed.recv().await.unwrap().unwrap();
        assert_eq!(entries[0].appointment.status, AppointmentStatus::Confirmed);
    }
}
