//! Identifiers for actors and executions.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrganizeError;

/// Declares a UUID-backed identifier with parsing and display.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh time-ordered (v7) id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = OrganizeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    OrganizeError::validation(format!("{} '{s}': {e}", stringify!($name)))
                })
            }
        }
    };
}

uuid_id!(
    /// A player, keyed by account UUID.
    ActorId
);

uuid_id!(
    /// One executor run. Scopes audit dedup keys, so a retried run must
    /// reuse its id.
    ExecutionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_id_parses_its_display_form() {
        let id = ActorId::new();
        let parsed: ActorId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_actor_id_is_a_validation_error() {
        let err = "not-a-uuid".parse::<ActorId>().unwrap_err();
        assert!(matches!(err, OrganizeError::Validation(msg) if msg.starts_with("ActorId")));
    }
}
