//! Appointment lifecycle: booking and status transitions.
//!
//! States: `Pending → {Confirmed, Cancelled}`; the terminal states are
//! frozen. A transition rewrites the full appointment record under the
//! doctor's partition through a conditional write, so two racing writers
//! cannot both win — the loser gets `Conflict` instead of silently
//! overwriting.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::BookingPolicy;
use crate::error::LedgerError;
use crate::identity::DoctorKey;
use crate::models::{self, Appointment, AppointmentStatus};
use crate::store::LedgerStore;

/// A patient-initiated booking.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub patient_id: String,
    pub patient_name: String,
    pub date: NaiveDate,
    pub time: String,
}

/// The status workflow engine over one shared store.
pub struct AppointmentBook {
    store: Arc<LedgerStore>,
    policy: BookingPolicy,
}

impl AppointmentBook {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self::with_policy(store, BookingPolicy::default())
    }

    pub fn with_policy(store: Arc<LedgerStore>, policy: BookingPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> BookingPolicy {
        self.policy
    }

    /// Books the `(doctor, patient)` slot with initial status `Pending`.
    ///
    /// Under `LatestWins` this is a plain upsert; under `DenyWhileActive`
    /// a Pending or Confirmed slot rejects the booking with `Conflict`,
    /// and the write is conditional on the slot state that was checked.
    pub fn book(
        &self,
        doctor: &DoctorKey,
        request: BookingRequest,
    ) -> Result<Appointment, LedgerError> {
        let path = Appointment::path(doctor, &request.patient_id);
        let record = Appointment {
            patient_id: request.patient_id,
            patient_name: request.patient_name,
            date: request.date,
            time: request.time,
            status: AppointmentStatus::initial(),
        };
        let value = models::encode(&path, &record)?;

        match self.policy {
            BookingPolicy::LatestWins => {
                self.store.put(&path, value)?;
            }
            BookingPolicy::DenyWhileActive => {
                let existing = self.store.get(&path)?;
                if let Some(raw) = &existing {
                    let current: Appointment = models::decode(&path, raw.clone())?;
                    if current.status != AppointmentStatus::Cancelled {
                        return Err(LedgerError::Conflict {
                            path: path.to_string(),
                        });
                    }
                }
                self.store.compare_and_swap(&path, existing.as_ref(), value)?;
            }
        }

        tracing::info!(doctor = %doctor, patient = %record.patient_id, "appointment booked");
        Ok(record)
    }

    /// Moves a `Pending` appointment to `Confirmed` or `Cancelled`,
    /// writing the full record back.
    ///
    /// Fails `NotFound` when the slot is absent, `InvalidTransition` when
    /// the current status is terminal or the target is not, and `Conflict`
    /// when a concurrent writer changed the record between read and write.
    /// On every failure the stored state is untouched.
    pub fn transition(
        &self,
        doctor: &DoctorKey,
        patient_id: &str,
        target: AppointmentStatus,
    ) -> Result<Appointment, LedgerError> {
        let path = Appointment::path(doctor, patient_id);
        let raw = self.store.get(&path)?.ok_or_else(|| LedgerError::NotFound {
            path: path.to_string(),
        })?;
        let current: Appointment = models::decode(&path, raw.clone())?;

        if !current.status.can_transition_to(target) {
            return Err(LedgerError::InvalidTransition {
                current: current.status,
                target,
            });
        }

        let updated = Appointment {
            status: target,
            ..current
        };
        self.store
            .compare_and_swap(&path, Some(&raw), models::encode(&path, &updated)?)?;

        tracing::info!(
            doctor = %doctor,
            patient = %patient_id,
            status = %target,
            "appointment status changed"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;

    fn setup() -> (Arc<LedgerStore>, DoctorKey) {
        let store = Arc::new(LedgerStore::new());
        let doctor = identity::normalize("drA@x.com").unwrap();
        (store, doctor)
    }

    fn request(patient_id: &str) -> BookingRequest {
        BookingRequest {
            patient_id: patient_id.into(),
            patient_name: "Ada".into(),
            date: NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
            time: "10:30 AM".into(),
        }
    }

    fn stored_status(store: &LedgerStore, doctor: &DoctorKey, patient: &str) -> AppointmentStatus {
        let path = Appointment::path(doctor, patient);
        let record: Appointment =
            models::decode(&path, store.get(&path).unwrap().unwrap()).unwrap();
        record.status
    }

    #[test]
    fn booking_starts_pending() {
        let (store, doctor) = setup();
        let book = AppointmentBook::new(Arc::clone(&store));
        let record = book.book(&doctor, request("p1")).unwrap();
        assert_eq!(record.status, AppointmentStatus::Pending);
        assert_eq!(stored_status(&store, &doctor, "p1"), AppointmentStatus::Pending);
    }

    #[test]
    fn latest_wins_overwrites_existing_slot() {
        let (store, doctor) = setup();
        let book = AppointmentBook::new(Arc::clone(&store));
        book.book(&doctor, request("p1")).unwrap();
        book.transition(&doctor, "p1", AppointmentStatus::Confirmed)
            .unwrap();

        let mut second = request("p1");
        second.time = "2:00 PM".into();
        let record = book.book(&doctor, second).unwrap();
        assert_eq!(record.status, AppointmentStatus::Pending);
        assert_eq!(stored_status(&store, &doctor, "p1"), AppointmentStatus::Pending);
    }

    #[test]
    fn deny_while_active_rejects_live_slot() {
        let (store, doctor) = setup();
        let book = AppointmentBook::with_policy(Arc::clone(&store), BookingPolicy::DenyWhileActive);
        book.book(&doctor, request("p1")).unwrap();

        assert!(matches!(
            book.book(&doctor, request("p1")),
            Err(LedgerError::Conflict { .. })
        ));
        book.transition(&doctor, "p1", AppointmentStatus::Confirmed)
            .unwrap();
        assert!(matches!(
            book.book(&doctor, request("p1")),
            Err(LedgerError::Conflict { .. })
        ));
    }

    #[test]
    fn deny_while_active_allows_rebooking_a_cancelled_slot() {
        let (store, doctor) = setup();
        let book = AppointmentBook::with_policy(Arc::clone(&store), BookingPolicy::DenyWhileActive);
        book.book(&doctor, request("p1")).unwrap();
        book.transition(&doctor, "p1", AppointmentStatus::Cancelled)
            .unwrap();

        book.book(&doctor, request("p1")).unwrap();
        assert_eq!(stored_status(&store, &doctor, "p1"), AppointmentStatus::Pending);
    }

    #[test]
    fn pending_confirms_and_stays_confirmed() {
        let (store, doctor) = setup();
        let book = AppointmentBook::new(Arc::clone(&store));
        book.book(&doctor, request("p1")).unwrap();

        let record = book
            .transition(&doctor, "p1", AppointmentStatus::Confirmed)
            .unwrap();
        assert_eq!(record.status, AppointmentStatus::Confirmed);
        assert_eq!(record.patient_name, "Ada");

        let err = book
            .transition(&doctor, "p1", AppointmentStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(
            stored_status(&store, &doctor, "p1"),
            AppointmentStatus::Confirmed
        );
    }

    #[test]
    fn cancelled_rejects_confirmation() {
        let (store, doctor) = setup();
        let book = AppointmentBook::new(Arc::clone(&store));
        book.book(&doctor, request("p1")).unwrap();
        book.transition(&doctor, "p1", AppointmentStatus::Cancelled)
            .unwrap();

        assert!(matches!(
            book.transition(&doctor, "p1", AppointmentStatus::Confirmed),
            Err(LedgerError::InvalidTransition { .. })
        ));
        assert_eq!(
            stored_status(&store, &doctor, "p1"),
            AppointmentStatus::Cancelled
        );
    }

    #[test]
    fn pending_is_not_a_transition_target() {
        let (store, doctor) = setup();
        let book = AppointmentBook::new(Arc::clone(&store));
        book.book(&doctor, request("p1")).unwrap();

        assert!(matches!(
            book.transition(&doctor, "p1", AppointmentStatus::Pending),
            Err(LedgerError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn transition_on_missing_slot_is_not_found() {
        let (store, doctor) = setup();
        let book = AppointmentBook::new(store);
        assert!(matches!(
            book.transition(&doctor, "ghost", AppointmentStatus::Confirmed),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn status_trace_never_leaves_a_terminal_state() {
        let (store, doctor) = setup();
        let book = AppointmentBook::new(Arc::clone(&store));
        book.book(&doctor, request("p1")).unwrap();
        book.transition(&doctor, "p1", AppointmentStatus::Confirmed)
            .unwrap();

        for target in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
        ] {
            let _ = book.transition(&doctor, "p1", target);
            assert_eq!(
                stored_status(&store, &doctor, "p1"),
                AppointmentStatus::Confirmed
            );
        }
    }

    #[test]
    fn undecodable_slot_is_a_schema_error() {
        let (store, doctor) = setup();
        let path = Appointment::path(&doctor, "p1");
        store
            .put(&path, serde_json::json!({ "Status": "Pending" }))
            .unwrap();

        let book = AppointmentBook::new(store);
        assert!(matches!(
            book.transition(&doctor, "p1", AppointmentStatus::Confirmed),
            Err(LedgerError::Schema { .. })
        ));
    }
}
