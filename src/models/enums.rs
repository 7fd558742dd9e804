use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
});

str_enum!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Completed => "completed",
});

impl AppointmentStatus {
    /// `cancelled` and `completed` accept no further changes.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Transition graph:
    /// pending → {confirmed, cancelled, completed},
    /// confirmed → {cancelled, completed}.
    /// Writing the current status again is always accepted.
    pub fn can_transition_to(self, target: Self) -> bool {
        if self == target {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match self {
            Self::Pending => target != Self::Pending,
            _ => target.is_terminal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for (variant, s) in [(Role::Patient, "patient"), (Role::Doctor, "doctor")] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Role::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&AppointmentStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
        let parsed: AppointmentStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Cancelled);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Role::from_str("admin").is_err());
        assert!(AppointmentStatus::from_str("Pending").is_err());
        assert!(AppointmentStatus::from_str("").is_err());
    }

    #[test]
    fn pending_moves_anywhere() {
        use AppointmentStatus::*;
        for target in [Pending, Confirmed, Cancelled, Completed] {
            assert!(Pending.can_transition_to(target));
        }
    }

    #[test]
    fn confirmed_cannot_return_to_pending() {
        use AppointmentStatus::*;
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
    }

    #[test]
    fn terminal_states_are_final() {
        use AppointmentStatus::*;
        assert!(Cancelled.is_terminal());
        assert!(Completed.is_terminal());
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(Cancelled.can_transition_to(Cancelled));
        for from in [Cancelled, Completed] {
            for target in [Pending, Confirmed, Cancelled, Completed] {
                assert_eq!(from.can_transition_to(target), from == target);
            }
        }
    }
}
