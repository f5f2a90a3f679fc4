//! # Operation Records and Events
//!
//! Per-certificate lifecycle state, the queue entry shape, and the
//! registry's ordered event log. A certificate hash moves through
//! exactly one chain of states:
//!
//! ```text
//! Unknown → IssuanceQueued → Issued → RevocationQueued → Revoked
//! ```
//!
//! No skipping, and no re-issuance of a hash that is not `Revoked`
//! first. Queue indices are assigned densely in enqueue order and never
//! reused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zkcert_core::{AccountId, IdentityCommitment, IdentityHash, LeafHash, TreeRoot};

/// The two operation kinds a guardian can enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Insert the certificate commitment into the tree.
    Issuance,
    /// Overwrite the certificate's slot with the empty-leaf sentinel.
    Revocation,
}

impl OperationKind {
    /// The canonical string name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issuance => "ISSUANCE",
            Self::Revocation => "REVOCATION",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one certificate hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificateState {
    /// Never enqueued.
    Unknown,
    /// Issuance enqueued, not yet applied.
    IssuanceQueued,
    /// Commitment present in the tree.
    Issued,
    /// Revocation enqueued, commitment still in the tree.
    RevocationQueued,
    /// Commitment removed from the tree. Terminal state.
    Revoked,
}

impl CertificateState {
    /// The canonical string name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::IssuanceQueued => "ISSUANCE_QUEUED",
            Self::Issued => "ISSUED",
            Self::RevocationQueued => "REVOCATION_QUEUED",
            Self::Revoked => "REVOKED",
        }
    }

    /// Whether this state holds a salt lock on its identity hash.
    pub fn holds_salt_lock(&self) -> bool {
        matches!(
            self,
            Self::IssuanceQueued | Self::Issued | Self::RevocationQueued
        )
    }
}

impl std::fmt::Display for CertificateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The per-certificate record kept for every hash ever enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Current lifecycle state.
    pub state: CertificateState,
    /// FIFO position of the pending (or last applied) operation.
    pub queue_index: u64,
    /// The principal that enqueued the issuance.
    pub guardian: AccountId,
    /// Salted identity hash the certificate references.
    pub identity_hash: Option<IdentityHash>,
    /// Opaque holder commitment, stored verbatim for audit.
    pub identity_commitment: Option<IdentityCommitment>,
    /// Certificate expiration, as declared at issuance enqueue.
    pub expiration: Option<DateTime<Utc>>,
    /// Tree slot the commitment occupies, assigned when the issuance
    /// is applied and reused by the revocation.
    pub leaf_index: Option<u64>,
}

/// One position in the FIFO operation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The certificate hash the operation targets.
    pub cert_hash: LeafHash,
    /// Issuance or revocation.
    pub kind: OperationKind,
}

/// An externally observable registry fact, appended in order.
///
/// Client tooling watches `OperationQueued` to learn when its turn to
/// call `apply` is coming; auditors replay the whole log against the
/// root history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// An operation was admitted to the queue.
    OperationQueued {
        /// The dense FIFO position assigned at enqueue.
        queue_index: u64,
        /// Target certificate hash.
        cert_hash: LeafHash,
        /// Issuance or revocation.
        kind: OperationKind,
        /// The enqueuing principal.
        enqueued_by: AccountId,
        /// When the operation was admitted.
        at: DateTime<Utc>,
    },
    /// A queued operation was applied against the tree.
    OperationApplied {
        /// The FIFO position that was consumed.
        queue_index: u64,
        /// Target certificate hash.
        cert_hash: LeafHash,
        /// Issuance or revocation.
        kind: OperationKind,
        /// The root appended by this application.
        new_root: TreeRoot,
        /// Index of `new_root` in the root history.
        root_index: u64,
        /// When the operation was applied.
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(OperationKind::Issuance.as_str(), "ISSUANCE");
        assert_eq!(format!("{}", OperationKind::Revocation), "REVOCATION");
    }

    #[test]
    fn state_names() {
        assert_eq!(CertificateState::Unknown.as_str(), "UNKNOWN");
        assert_eq!(CertificateState::IssuanceQueued.as_str(), "ISSUANCE_QUEUED");
        assert_eq!(CertificateState::Issued.as_str(), "ISSUED");
        assert_eq!(
            CertificateState::RevocationQueued.as_str(),
            "REVOCATION_QUEUED"
        );
        assert_eq!(CertificateState::Revoked.as_str(), "REVOKED");
    }

    #[test]
    fn salt_lock_holding_states() {
        assert!(!CertificateState::Unknown.holds_salt_lock());
        assert!(CertificateState::IssuanceQueued.holds_salt_lock());
        assert!(CertificateState::Issued.holds_salt_lock());
        assert!(CertificateState::RevocationQueued.holds_salt_lock());
        assert!(!CertificateState::Revoked.holds_salt_lock());
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = RegistryEvent::OperationQueued {
            queue_index: 3,
            cert_hash: LeafHash::from_bytes([1; 32]),
            kind: OperationKind::Issuance,
            enqueued_by: AccountId::new(),
            at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: RegistryEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
