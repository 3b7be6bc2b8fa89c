//! Identity types for Covenant entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behavior for strongly-typed entity IDs.
pub trait EntityIdType: Copy + Eq + fmt::Display {
    /// Wrap an existing UUID.
    fn new(uuid: Uuid) -> Self;

    /// Access the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh timestamp-sortable ID.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// Generate a fresh random ID.
    ///
    /// Use for IDs whose leading characters are shown to people, such as
    /// SOW payment links: v7 IDs created hours apart share their prefix.
    fn random() -> Self {
        Self::new(Uuid::new_v4())
    }

    /// The nil ID, useful as a placeholder in tests.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a [`crate::Client`].
    ClientId
);
define_entity_id!(
    /// Identifier of a [`crate::PaymentLink`].
    LinkId
);
define_entity_id!(
    /// Identifier of a [`crate::Transaction`].
    TransactionId
);

/// Identifier of a stored SOW template.
///
/// Templates are keyed by an admin-chosen string; `"default"` is reserved
/// for the built-in generators and never resolves to a stored record.
pub type TemplateId = String;

/// Reserved template key selecting the built-in SOW generator.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

/// Build the deterministic SOW identifier for a tier and its payment link.
///
/// Format: `SOW-<TIER>-<first 6 chars of link id, uppercased>`.
pub fn sow_id_for(tier: crate::Tier, link_id: LinkId) -> String {
    let link = link_id.to_string();
    let prefix: String = link.chars().take(6).collect();
    format!("SOW-{}-{}", tier.as_db_str(), prefix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tier;

    #[test]
    fn test_typed_ids_roundtrip_through_strings() {
        let id = ClientId::now_v7();
        let parsed: ClientId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(parsed.as_uuid(), id.as_uuid());
    }

    #[test]
    fn test_sow_id_format() {
        let link_id = LinkId::new(Uuid::parse_str("abcdef12-0000-7000-8000-000000000000").unwrap());
        assert_eq!(sow_id_for(Tier::Tier1, link_id), "SOW-TIER_1-ABCDEF");
        assert_eq!(sow_id_for(Tier::Tier3, link_id), "SOW-TIER_3-ABCDEF");
    }

    #[test]
    fn test_random_ids_vary_in_prefix() {
        let a = LinkId::random();
        let b = LinkId::random();
        assert_eq!(a.as_uuid().get_version_num(), 4);
        assert_ne!(sow_id_for(Tier::Tier1, a), sow_id_for(Tier::Tier1, b));
    }
}
