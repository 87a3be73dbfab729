//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding lookup table. Output statuses live in
//! `animagen_core::generation::OutputStatus` because the worker checks
//! transitions without a database.

pub use animagen_core::generation::{OutputStatus, StatusId};

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( x if x == $val => Some($name::$variant), )+
                    _ => None,
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
    /// Queue-side state of a generation job (`job_states` table).
    ///
    /// A job waiting for its backoff to elapse is `Waiting` with a future
    /// `run_at`; it is reported as "delayed" in queue counts.
    JobState {
        Waiting = 1,
        Active = 2,
        Completed = 3,
        Failed = 4,
    }
}
