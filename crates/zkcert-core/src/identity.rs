//! # Identifier Newtypes
//!
//! Principal and domain identifiers for the registry and its replication
//! topology.
//!
//! An [`AccountId`] names one on-domain principal: a guardian, one of a
//! guardian's delegated issuer accounts, the relayer submitting `apply`
//! calls, or the transport mailbox delivering replication messages. All
//! of these share a single address space — an account can hold at most
//! one of those roles at a time, which is what makes issuer-account
//! exclusivity checkable.
//!
//! A [`DomainId`] identifies a chain/domain; the replica validates that
//! inbound messages originate from its configured source domain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for an on-domain principal (guardian, issuer
/// account, relayer, or transport mailbox).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Create a new random account identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an account identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AccountId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

/// A chain/domain identifier in the replication topology.
///
/// Matches the 32-bit domain identifiers used by cross-domain mailbox
/// transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainId(u32);

impl DomainId {
    /// Create a domain identifier from its numeric value.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The numeric domain value.
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DomainId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "domain-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn account_ids_are_unique() {
        let a = AccountId::new();
        let b = AccountId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn account_id_display_parse_roundtrip() {
        let id = AccountId::new();
        let parsed = AccountId::from_str(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn account_id_from_uuid() {
        let raw = Uuid::new_v4();
        let id = AccountId::from_uuid(raw);
        assert_eq!(id.as_uuid(), &raw);
    }

    #[test]
    fn domain_id_value_and_display() {
        let d = DomainId::new(418);
        assert_eq!(d.value(), 418);
        assert_eq!(format!("{d}"), "domain-418");
    }

    #[test]
    fn domain_id_serde_roundtrip() {
        let d = DomainId::new(7);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "7");
        let back: DomainId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
