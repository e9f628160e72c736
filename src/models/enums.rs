use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Macro to generate enum with as_str + Display + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(LedgerError::Schema {
                        at: stringify!($name).into(),
                        detail: format!("unknown value '{s}'"),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Pending => "Pending",
    Confirmed => "Confirmed",
    Cancelled => "Cancelled",
});

str_enum!(ActorRole {
    Doctor => "doctor",
    Patient => "patient",
});

impl AppointmentStatus {
    /// Initial state of every booking.
    pub fn initial() -> Self {
        Self::Pending
    }

    /// Confirmed and Cancelled are terminal; nothing leaves them.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The workflow table: Pending may move to either terminal state,
    /// nothing else moves anywhere.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Confirmed) | (Self::Pending, Self::Cancelled)
        )
    }
}
