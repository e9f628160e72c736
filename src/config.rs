/// Application-level constants
pub const APP_NAME: &str = "Caresync";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// What booking does when the `(doctor, patient)` slot is already occupied.
///
/// The ledger keeps one slot per pair. Whether a new booking should
/// replace a live slot or be refused is an open product question, so both
/// behaviours are selectable instead of hard-coded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookingPolicy {
    /// A new booking overwrites the existing slot.
    #[default]
    LatestWins,
    /// Booking over a Pending or Confirmed slot fails with `Conflict`;
    /// a Cancelled slot may be re-booked.
    DenyWhileActive,
}
