//! Strongly-typed identifiers
//!
//! Newtype wrappers around UUIDs keep billing-entity keys and batch ids from
//! being mixed up with each other or with raw strings coming from the order
//! and contract records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            ///
            /// Batch ids use this so dead-lettered batches replay in creation order.
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new_v7()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Billing entity owning a correlation counter (provider organization)
define_id!(OrganizationId, "ORG");

// One dispatched batch of charge detail records
define_id!(BatchId, "CDRB");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_id_display() {
        let id = OrganizationId::new();
        assert!(id.to_string().starts_with("ORG-"));
    }

    #[test]
    fn test_batch_id_parsing_with_and_without_prefix() {
        let original = BatchId::new_v7();
        let parsed: BatchId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: BatchId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }
}
