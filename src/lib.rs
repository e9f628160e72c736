//! Caresync — a realtime appointment & prescription ledger for a two-role
//! clinical workflow (patient, doctor) over a shared subscription store.
//!
//! The core pieces, leaves first:
//! - [`identity`] — canonical doctor partition keys
//! - [`store`] — the realtime tree: put / get / subscribe / append, plus
//!   conditional writes
//! - [`models`] — typed records validated at the store boundary
//! - [`index`] — the patient-keyed view over doctor-partitioned data
//! - [`workflow`] — the appointment status machine
//! - [`prescriptions`] — append-only prescriptions with blob attachments
//! - [`session`] — per-role facades mirroring what the clients do
//!
//! Presentation, authentication and blob transport stay outside; the crate
//! takes an authenticated actor and a [`prescriptions::BlobStore`] and owns
//! everything between them and the tree.

pub mod config;
pub mod error;
pub mod identity;
pub mod index;
pub mod models;
pub mod prescriptions;
pub mod session;
pub mod store;
pub mod workflow;

pub use config::BookingPolicy;
pub use error::LedgerError;
pub use identity::DoctorKey;
pub use index::{PatientAppointment, PatientFeed, PatientIndex};
pub use models::{ActorRole, Appointment, AppointmentStatus, DoctorProfile, PatientProfile, Prescription};
pub use prescriptions::{BlobStore, MemoryBlobStore, PrescriptionLinker};
pub use session::{AuthenticatedActor, DoctorSession, PatientSession, RosterEntry};
pub use store::{LedgerStore, Subscription, TreePath};
pub use workflow::{AppointmentBook, BookingRequest};

use tracing_subscriber::EnvFilter;

/// Initialize tracing. `RUST_LOG` wins when set; otherwise the crate logs
/// at `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
