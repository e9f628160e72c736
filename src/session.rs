//! Per-role operation facades.
//!
//! The external identity provider authenticates an actor and hands over a
//! role plus a stable identifier; sessions trust both as-is and expose the
//! operations each role performs against the ledger. Input validation
//! happens here, before anything touches storage.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::BookingPolicy;
use crate::error::LedgerError;
use crate::identity::{self, DoctorKey};
use crate::index::{PatientAppointment, PatientFeed, PatientIndex};
use crate::models::{
    self, ActorRole, Appointment, AppointmentStatus, DoctorProfile, PatientProfile, Prescription,
};
use crate::prescriptions::{BlobStore, EntryId, PrescriptionLinker};
use crate::store::LedgerStore;
use crate::workflow::{AppointmentBook, BookingRequest};

/// What the identity provider yields after authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedActor {
    pub role: ActorRole,
    /// Stable identifier: the login email for doctors, the provider uid
    /// for patients.
    pub id: String,
}

impl AuthenticatedActor {
    pub fn doctor(id: impl Into<String>) -> Self {
        Self {
            role: ActorRole::Doctor,
            id: id.into(),
        }
    }

    pub fn patient(id: impl Into<String>) -> Self {
        Self {
            role: ActorRole::Patient,
            id: id.into(),
        }
    }
}

/// A confirmed patient joined with their registration record — the list a
/// doctor picks from when entering a prescription.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RosterEntry {
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    pub health_number: String,
    pub last_visit: NaiveDate,
}

// ═══════════════════════════════════════════════════════════
// DoctorSession
// ═══════════════════════════════════════════════════════════

pub struct DoctorSession {
    key: DoctorKey,
    profile: Option<DoctorProfile>,
    store: Arc<LedgerStore>,
    book: AppointmentBook,
    linker: PrescriptionLinker,
}

impl DoctorSession {
    /// Opens a session for an authenticated doctor. The login identity is
    /// normalized exactly once, here; a missing or partial profile record
    /// is tolerated.
    pub fn open(
        store: Arc<LedgerStore>,
        blobs: Arc<dyn BlobStore>,
        actor: &AuthenticatedActor,
    ) -> Result<Self, LedgerError> {
        if actor.role != ActorRole::Doctor {
            return Err(LedgerError::InvalidRequest(
                "doctor session requires a doctor identity".into(),
            ));
        }
        let key = identity::normalize(&actor.id)?;

        let profile_path = DoctorProfile::path(&key);
        let profile = match store.get(&profile_path)? {
            Some(raw) => match models::decode(&profile_path, raw) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    tracing::debug!(doctor = %key, %err, "doctor profile undecodable at login");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            key,
            profile,
            book: AppointmentBook::new(Arc::clone(&store)),
            linker: PrescriptionLinker::new(Arc::clone(&store), blobs),
            store,
        })
    }

    pub fn key(&self) -> &DoctorKey {
        &self.key
    }

    pub fn profile(&self) -> Option<&DoctorProfile> {
        self.profile.as_ref()
    }

    /// The doctor's schedule for one calendar day.
    pub fn upcoming_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, LedgerError> {
        Ok(self
            .partition_appointments()?
            .into_iter()
            .filter(|appointment| appointment.date == date)
            .collect())
    }

    pub fn confirm(&self, patient_id: &str) -> Result<Appointment, LedgerError> {
        self.book
            .transition(&self.key, patient_id, AppointmentStatus::Confirmed)
    }

    pub fn cancel(&self, patient_id: &str) -> Result<Appointment, LedgerError> {
        self.book
            .transition(&self.key, patient_id, AppointmentStatus::Cancelled)
    }

    /// Confirmed patients joined with `users/{patientId}`. Patients whose
    /// registration record is missing are skipped.
    pub fn roster(&self) -> Result<Vec<RosterEntry>, LedgerError> {
        let mut entries = Vec::new();
        for appointment in self.partition_appointments()? {
            if appointment.status != AppointmentStatus::Confirmed {
                continue;
            }
            let path = PatientProfile::path(&appointment.patient_id);
            let Some(raw) = self.store.get(&path)? else {
                tracing::debug!(patient = %appointment.patient_id, "no user record, skipping roster entry");
                continue;
            };
            let profile: PatientProfile = models::decode(&path, raw)?;
            entries.push(RosterEntry {
                patient_id: appointment.patient_id,
                name: profile.name,
                age: profile.age,
                health_number: profile.health_number,
                last_visit: appointment.date,
            });
        }
        Ok(entries)
    }

    /// Records a prescription for one of this doctor's patients.
    pub fn write_prescription(
        &self,
        patient_id: &str,
        text: &str,
        attachment: Option<&[u8]>,
    ) -> Result<(EntryId, Prescription), LedgerError> {
        if text.trim().is_empty() {
            return Err(LedgerError::InvalidRequest(
                "prescription text is required".into(),
            ));
        }
        self.linker.record(&self.key, patient_id, text, attachment)
    }

    pub fn prescriptions_for(
        &self,
        patient_id: &str,
    ) -> Result<Vec<(EntryId, Prescription)>, LedgerError> {
        self.linker.list(&self.key, patient_id)
    }

    fn partition_appointments(&self) -> Result<Vec<Appointment>, LedgerError> {
        let partition = Appointment::partition(&self.key);
        let Some(snapshot) = self.store.get(&partition)? else {
            return Ok(Vec::new());
        };
        let slots = snapshot.as_object().ok_or_else(|| LedgerError::Schema {
            at: partition.to_string(),
            detail: "expected an object of slots".into(),
        })?;
        slots
            .iter()
            .map(|(slot_id, raw)| models::decode(&partition.child(slot_id), raw.clone()))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════
// PatientSession
// ═══════════════════════════════════════════════════════════

pub struct PatientSession {
    patient_id: String,
    store: Arc<LedgerStore>,
    index: PatientIndex,
    book: AppointmentBook,
    linker: PrescriptionLinker,
}

impl PatientSession {
    pub fn open(
        store: Arc<LedgerStore>,
        blobs: Arc<dyn BlobStore>,
        actor: &AuthenticatedActor,
    ) -> Result<Self, LedgerError> {
        Self::open_with_policy(store, blobs, actor, BookingPolicy::default())
    }

    pub fn open_with_policy(
        store: Arc<LedgerStore>,
        blobs: Arc<dyn BlobStore>,
        actor: &AuthenticatedActor,
        policy: BookingPolicy,
    ) -> Result<Self, LedgerError> {
        if actor.role != ActorRole::Patient {
            return Err(LedgerError::InvalidRequest(
                "patient session requires a patient identity".into(),
            ));
        }
        Ok(Self {
            patient_id: actor.id.clone(),
            index: PatientIndex::new(Arc::clone(&store)),
            book: AppointmentBook::with_policy(Arc::clone(&store), policy),
            linker: PrescriptionLinker::new(Arc::clone(&store), blobs),
            store,
        })
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Requests an appointment with a doctor, identified by raw email.
    /// The patient's display name comes from their registration record.
    pub fn book(
        &self,
        raw_doctor_email: &str,
        date: NaiveDate,
        time: &str,
    ) -> Result<Appointment, LedgerError> {
        let doctor = identity::normalize(raw_doctor_email)?;
        let profile_path = PatientProfile::path(&self.patient_id);
        let raw = self
            .store
            .get(&profile_path)?
            .ok_or_else(|| LedgerError::NotFound {
                path: profile_path.to_string(),
            })?;
        let profile: PatientProfile = models::decode(&profile_path, raw)?;

        self.book.book(
            &doctor,
            BookingRequest {
                patient_id: self.patient_id.clone(),
                patient_name: profile.name,
                date,
                time: time.to_string(),
            },
        )
    }

    /// Every appointment across all doctors, any status.
    pub fn records(&self) -> Result<Vec<PatientAppointment>, LedgerError> {
        self.index.appointments_for(&self.patient_id)
    }

    /// Confirmed appointments only — the entries prescriptions hang off.
    pub fn medical_history(&self) -> Result<Vec<PatientAppointment>, LedgerError> {
        self.index.confirmed_for(&self.patient_id)
    }

    /// Prescriptions this doctor wrote for the patient. Only readable in
    /// the context of a confirmed appointment with that doctor — the
    /// storage layer does not enforce this, the read side does.
    pub fn prescriptions_with(
        &self,
        doctor_id: &str,
    ) -> Result<Vec<(EntryId, Prescription)>, LedgerError> {
        let doctor = identity::normalize(doctor_id)?;
        let confirmed = self.medical_history()?;
        if !confirmed
            .iter()
            .any(|entry| entry.doctor_id == doctor.as_str())
        {
            return Err(LedgerError::NotFound {
                path: Appointment::path(&doctor, &self.patient_id).to_string(),
            });
        }
        self.linker.list(&doctor, &self.patient_id)
    }

    /// Resolves a prescription attachment reference to a retrievable URL.
    pub fn attachment_url(&self, reference: &str) -> Result<String, LedgerError> {
        self.linker.resolve_attachment(reference)
    }

    /// A live view over this patient's appointments.
    pub fn watch_records(&self) -> Result<PatientFeed, LedgerError> {
        self.index.watch(&self.patient_id)
    }
}
