//! # zkcert-registry — Certificate Registry State Machine
//!
//! The source-of-truth side of the zkCertificate system:
//!
//! - **Guardians** ([`guardian`]): the admin-gated whitelist of
//!   authorized issuers. Guardians delegate to issuer accounts; revoking
//!   a guardian revokes all of its accounts transitively through a
//!   parent-pointer check at authorization time.
//! - **Salt locks** ([`salt`]): per-identity exclusivity — one live
//!   certificate per identity hash, enforced at enqueue time.
//! - **Registry** ([`registry`]): the FIFO operation queue applied
//!   strictly in order against the sparse Merkle tree, producing the
//!   append-only root history and the advancing validity window that
//!   replication mirrors onto other domains.
//!
//! Every mutating call is all-or-nothing: admission, ordering, and
//! proof checks all run before the first write, so no error leaves the
//! root history, validity window, or queue pointer partially updated.

pub mod guardian;
pub mod operation;
pub mod registry;
pub mod salt;

// Re-export primary types.
pub use guardian::{GuardianError, GuardianMetadata, GuardianRecord, GuardianRegistry};
pub use operation::{
    CertificateState, OperationKind, OperationRecord, QueueEntry, RegistryEvent,
};
pub use registry::{CertificateRegistry, RegistryError, RegistryHandle};
pub use salt::{IdentitySaltRegistry, SaltError};
