//! # zkcert-core — Domain Primitives for the zkCertificate Registry
//!
//! This crate provides the identifier and digest newtypes shared by every
//! other crate in the workspace:
//!
//! - **Digests** ([`digest`]): [`LeafHash`], [`TreeRoot`], [`IdentityHash`],
//!   and [`IdentityCommitment`] — 32-byte values with hex encoding.
//! - **Identifiers** ([`identity`]): [`AccountId`] (on-domain principals:
//!   guardians, issuer accounts, relayers, transport mailboxes) and
//!   [`DomainId`] (a chain/domain in the replication topology).
//!
//! Each identifier is a distinct type — you cannot pass a [`LeafHash`]
//! where a [`TreeRoot`] is expected, even though both are 32 bytes.

pub mod digest;
pub mod error;
pub mod identity;

// Re-export primary types.
pub use digest::{IdentityCommitment, IdentityHash, LeafHash, TreeRoot, bytes_to_hex, hex_to_bytes32};
pub use error::ValidationError;
pub use identity::{AccountId, DomainId};
