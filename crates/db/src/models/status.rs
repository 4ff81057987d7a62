//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Name as seeded in the lookup table and shown to API clients.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Diagnosis lifecycle status. Transitions only move forward from
    /// `Processing` to one of the terminal states.
    DiagnosisStatus {
        Processing = 1 => "processing",
        Completed = 2 => "completed",
        Failed = 3 => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnosis_status_ids_match_seed_data() {
        assert_eq!(DiagnosisStatus::Processing.id(), 1);
        assert_eq!(DiagnosisStatus::Completed.id(), 2);
        assert_eq!(DiagnosisStatus::Failed.id(), 3);
    }

    #[test]
    fn status_round_trips_through_id() {
        for status in [
            DiagnosisStatus::Processing,
            DiagnosisStatus::Completed,
            DiagnosisStatus::Failed,
        ] {
            assert_eq!(DiagnosisStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(DiagnosisStatus::from_id(0), None);
        assert_eq!(DiagnosisStatus::from_id(4), None);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = DiagnosisStatus::Failed.into();
        assert_eq!(id, 3);
        assert_eq!(DiagnosisStatus::Failed.as_str(), "failed");
    }
}
