//! # Identity Salt Locks
//!
//! A per-identity exclusivity guard: an identity hash may be referenced
//! by at most one live certificate at a time. The lock is acquired when
//! an issuance is enqueued (so two queued issuances for one identity
//! cannot coexist either) and released when the referencing
//! certificate's revocation is applied.

use std::collections::HashMap;

use thiserror::Error;

use zkcert_core::{IdentityHash, LeafHash};

/// Errors from identity salt lock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaltError {
    /// The identity already has a live (queued or issued) certificate.
    #[error("identity {identity} is already locked to certificate {holder}")]
    SaltAlreadyLocked {
        /// The contested identity hash.
        identity: IdentityHash,
        /// The certificate currently holding the lock.
        holder: LeafHash,
    },

    /// No lock exists for this identity.
    #[error("identity {0} holds no salt lock")]
    UnknownLock(IdentityHash),

    /// The lock exists but is held by a different certificate.
    #[error("salt lock for {identity} is held by {holder}, not {given}")]
    LockHolderMismatch {
        /// The identity hash named in the unlock.
        identity: IdentityHash,
        /// The certificate actually holding the lock.
        holder: LeafHash,
        /// The certificate named in the unlock.
        given: LeafHash,
    },
}

/// The side-index of identity salt locks for one registry.
#[derive(Debug, Clone, Default)]
pub struct IdentitySaltRegistry {
    locks: HashMap<IdentityHash, LeafHash>,
}

impl IdentitySaltRegistry {
    /// Create an empty lock index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `identity` to `cert_hash`. Re-locking with the same
    /// certificate is a no-op; any other holder is a conflict.
    pub fn lock(
        &mut self,
        identity: IdentityHash,
        cert_hash: LeafHash,
    ) -> Result<(), SaltError> {
        match self.locks.get(&identity) {
            Some(holder) if *holder == cert_hash => Ok(()),
            Some(holder) => Err(SaltError::SaltAlreadyLocked {
                identity,
                holder: *holder,
            }),
            None => {
                self.locks.insert(identity, cert_hash);
                Ok(())
            }
        }
    }

    /// Release the lock `cert_hash` holds on `identity`.
    pub fn unlock(
        &mut self,
        identity: &IdentityHash,
        cert_hash: &LeafHash,
    ) -> Result<(), SaltError> {
        match self.locks.get(identity) {
            None => Err(SaltError::UnknownLock(*identity)),
            Some(holder) if holder != cert_hash => Err(SaltError::LockHolderMismatch {
                identity: *identity,
                holder: *holder,
                given: *cert_hash,
            }),
            Some(_) => {
                self.locks.remove(identity);
                Ok(())
            }
        }
    }

    /// The certificate currently locking `identity`, if any.
    pub fn holder(&self, identity: &IdentityHash) -> Option<&LeafHash> {
        self.locks.get(identity)
    }

    /// The number of live locks.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no locks are held.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
