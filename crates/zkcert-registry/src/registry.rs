//! # Certificate Registry
//!
//! The source-of-truth state machine: an ordered operation queue applied
//! strictly in FIFO order against the sparse Merkle tree. Admission
//! control (guardian authorization, salt exclusivity) happens at
//! enqueue; application is open to any caller but gated by the queue
//! pointer, so a single absent guardian can never stall the pipeline.
//!
//! Every successful application appends exactly one root to the
//! append-only history. Revocations additionally advance the validity
//! window to the new latest root, because a proof generated against any
//! older root could still reference the now-revoked leaf.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

use zkcert_core::{AccountId, IdentityCommitment, IdentityHash, LeafHash, TreeRoot};
use zkcert_merkle::{EMPTY_LEAF, MerkleError, MerkleProof, SparseMerkleTree, verify_proof};

use crate::guardian::GuardianRegistry;
use crate::operation::{
    CertificateState, OperationKind, OperationRecord, QueueEntry, RegistryEvent,
};
use crate::salt::{IdentitySaltRegistry, SaltError};

/// Errors from certificate registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The enqueuing principal is not an authorized guardian or issuer
    /// account.
    #[error("caller {0} is not an authorized guardian")]
    NotAuthorizedGuardian(AccountId),

    /// Identity salt conflict — the identity already has a live
    /// certificate. Recoverable by revoking the prior certificate first.
    #[error(transparent)]
    Salt(#[from] SaltError),

    /// No record exists for this certificate hash.
    #[error("unknown certificate {0}")]
    UnknownCertificate(LeafHash),

    /// The certificate is not in a state that admits this operation.
    #[error("certificate {cert_hash} is {from}, cannot accept {attempted}")]
    InvalidStateTransition {
        /// The certificate hash.
        cert_hash: LeafHash,
        /// Its current state.
        from: CertificateState,
        /// The operation that was attempted.
        attempted: OperationKind,
    },

    /// The operation exists but is not yet at the head of the queue.
    /// Wait for the pointer to advance and retry.
    #[error("operation at queue index {queue_index} is out of turn (pointer at {queue_pointer})")]
    OutOfTurn {
        /// The operation's assigned FIFO position.
        queue_index: u64,
        /// The current queue pointer.
        queue_pointer: u64,
    },

    /// The queue position named by the caller does not match the
    /// certificate's record.
    #[error("queue position {given} does not match recorded index {recorded}")]
    QueueIndexMismatch {
        /// Position supplied by the caller.
        given: u64,
        /// Position assigned at enqueue time.
        recorded: u64,
    },

    /// The supplied Merkle path does not match the tree's current
    /// state. Regenerate the proof against the current root.
    #[error("merkle proof mismatch: {0}")]
    ProofMismatch(String),

    /// Tree-level failure (index out of range).
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    /// A root-history range query was out of bounds.
    #[error("root range [{from}, {to}) out of bounds for history of length {len}")]
    RootRangeOutOfBounds {
        /// Inclusive start index.
        from: u64,
        /// Exclusive end index.
        to: u64,
        /// Current history length.
        len: u64,
    },
}

/// The source-of-truth registry for one certificate standard.
#[derive(Debug)]
pub struct CertificateRegistry {
    guardians: GuardianRegistry,
    salts: IdentitySaltRegistry,
    tree: SparseMerkleTree,
    queue: Vec<QueueEntry>,
    records: HashMap<LeafHash, OperationRecord>,
    /// Index of the next queued operation eligible for application.
    queue_pointer: u64,
    /// Append-only root history; index 0 is the empty-tree root.
    root_history: Vec<TreeRoot>,
    /// Root value → latest history index holding it. Re-appearing root
    /// values (a revocation can restore an earlier tree state) re-index
    /// to the newest occurrence, which is the one inside the validity
    /// window.
    root_index_of: HashMap<TreeRoot, u64>,
    /// Oldest history index still accepted as a proof anchor.
    root_valid_from: u64,
    events: Vec<RegistryEvent>,
}

impl CertificateRegistry {
    /// Create a registry over an empty tree of the given depth.
    pub fn new(depth: u32, guardians: GuardianRegistry) -> Result<Self, RegistryError> {
        let tree = SparseMerkleTree::new(depth)?;
        let genesis = tree.root();
        let mut root_index_of = HashMap::new();
        root_index_of.insert(genesis, 0);
        Ok(Self {
            guardians,
            salts: IdentitySaltRegistry::new(),
            tree,
            queue: Vec::new(),
            records: HashMap::new(),
            queue_pointer: 0,
            root_history: vec![genesis],
            root_index_of,
            root_valid_from: 0,
            events: Vec::new(),
        })
    }

    // ── Enqueue ──────────────────────────────────────────────────────

    /// Admit an issuance to the queue.
    ///
    /// The caller must be an authorized guardian or issuer account; the
    /// identity's salt lock is acquired here, so a second live issuance
    /// for the same identity is rejected before it ever reaches the
    /// queue. The tree is not touched. Returns the assigned FIFO
    /// position.
    pub fn enqueue_issuance(
        &mut self,
        caller: &AccountId,
        cert_hash: LeafHash,
        identity_hash: IdentityHash,
        identity_commitment: IdentityCommitment,
        expiration: DateTime<Utc>,
    ) -> Result<u64, RegistryError> {
        if !self.guardians.is_authorized(caller) {
            return Err(RegistryError::NotAuthorizedGuardian(*caller));
        }
        let state = self.state_of(&cert_hash);
        if !matches!(state, CertificateState::Unknown | CertificateState::Revoked) {
            return Err(RegistryError::InvalidStateTransition {
                cert_hash,
                from: state,
                attempted: OperationKind::Issuance,
            });
        }
        self.salts.lock(identity_hash, cert_hash)?;

        let queue_index = self.queue.len() as u64;
        self.queue.push(QueueEntry {
            cert_hash,
            kind: OperationKind::Issuance,
        });
        self.records.insert(
            cert_hash,
            OperationRecord {
                state: CertificateState::IssuanceQueued,
                queue_index,
                guardian: *caller,
                identity_hash: Some(identity_hash),
                identity_commitment: Some(identity_commitment),
                expiration: Some(expiration),
                leaf_index: None,
            },
        );
        self.push_queued_event(queue_index, cert_hash, OperationKind::Issuance, caller);
        Ok(queue_index)
    }

    /// Admit a revocation to the queue. Only `Issued` hashes qualify.
    /// Returns the assigned FIFO position.
    pub fn enqueue_revocation(
        &mut self,
        caller: &AccountId,
        cert_hash: LeafHash,
    ) -> Result<u64, RegistryError> {
        if !self.guardians.is_authorized(caller) {
            return Err(RegistryError::NotAuthorizedGuardian(*caller));
        }
        let state = self.state_of(&cert_hash);
        if state != CertificateState::Issued {
            return Err(RegistryError::InvalidStateTransition {
                cert_hash,
                from: state,
                attempted: OperationKind::Revocation,
            });
        }

        let queue_index = self.queue.len() as u64;
        self.queue.push(QueueEntry {
            cert_hash,
            kind: OperationKind::Revocation,
        });
        // The issuance record carries identity and slot; only the
        // pending position and state change.
        if let Some(record) = self.records.get_mut(&cert_hash) {
            record.state = CertificateState::RevocationQueued;
            record.queue_index = queue_index;
        }
        self.push_queued_event(queue_index, cert_hash, OperationKind::Revocation, caller);
        Ok(queue_index)
    }

    // ── Apply ────────────────────────────────────────────────────────

    /// Apply the operation at the head of the queue. Open to any
    /// caller — admission control already happened at enqueue.
    ///
    /// `proof` must be generated against the current root: for an
    /// issuance it proves the chosen slot (its `leaf_index`) holds the
    /// empty-leaf sentinel, for a revocation it proves the slot holds
    /// the certificate hash. Every check runs before the first write;
    /// on error no state changes.
    ///
    /// Returns the newly appended root.
    pub fn apply(
        &mut self,
        queue_position: u64,
        cert_hash: LeafHash,
        proof: &MerkleProof,
    ) -> Result<TreeRoot, RegistryError> {
        let record = self
            .records
            .get(&cert_hash)
            .ok_or(RegistryError::UnknownCertificate(cert_hash))?;
        let kind = match record.state {
            CertificateState::IssuanceQueued => OperationKind::Issuance,
            CertificateState::RevocationQueued => OperationKind::Revocation,
            from => {
                let attempted = self
                    .queue
                    .get(queue_position as usize)
                    .map(|entry| entry.kind)
                    .unwrap_or(OperationKind::Issuance);
                return Err(RegistryError::InvalidStateTransition {
                    cert_hash,
                    from,
                    attempted,
                });
            }
        };
        if record.queue_index != queue_position {
            return Err(RegistryError::QueueIndexMismatch {
                given: queue_position,
                recorded: record.queue_index,
            });
        }
        if record.queue_index != self.queue_pointer {
            return Err(RegistryError::OutOfTurn {
                queue_index: record.queue_index,
                queue_pointer: self.queue_pointer,
            });
        }

        let leaf_index = proof.leaf_index;
        match kind {
            OperationKind::Issuance => {
                if proof.leaf != EMPTY_LEAF {
                    return Err(RegistryError::ProofMismatch(format!(
                        "slot {leaf_index} is occupied"
                    )));
                }
            }
            OperationKind::Revocation => {
                if record.leaf_index != Some(leaf_index) {
                    return Err(RegistryError::ProofMismatch(format!(
                        "certificate occupies slot {:?}, proof targets {leaf_index}",
                        record.leaf_index
                    )));
                }
                if proof.leaf != cert_hash {
                    return Err(RegistryError::ProofMismatch(
                        "proof leaf is not the certificate hash".to_string(),
                    ));
                }
            }
        }
        if proof.path_elements.len() != self.tree.depth() as usize {
            return Err(RegistryError::ProofMismatch(format!(
                "path has {} elements, tree depth is {}",
                proof.path_elements.len(),
                self.tree.depth()
            )));
        }
        if proof.root != self.tree.root() {
            return Err(RegistryError::ProofMismatch(
                "proof root is stale".to_string(),
            ));
        }
        if !verify_proof(proof) {
            return Err(RegistryError::ProofMismatch(
                "path does not reproduce its root".to_string(),
            ));
        }

        // All checks passed — commit.
        let written = match kind {
            OperationKind::Issuance => cert_hash,
            OperationKind::Revocation => EMPTY_LEAF,
        };
        self.tree.insert_leaves(&[(written, leaf_index)])?;
        let new_root = self.tree.root();
        let root_index = self.root_history.len() as u64;
        self.root_history.push(new_root);
        self.root_index_of.insert(new_root, root_index);
        self.queue_pointer += 1;

        let record = self
            .records
            .get_mut(&cert_hash)
            .ok_or(RegistryError::UnknownCertificate(cert_hash))?;
        match kind {
            OperationKind::Issuance => {
                record.state = CertificateState::Issued;
                record.leaf_index = Some(leaf_index);
            }
            OperationKind::Revocation => {
                record.state = CertificateState::Revoked;
                // Any proof anchored before this root could still show
                // the revoked leaf as present.
                self.root_valid_from = root_index;
                if let Some(identity) = record.identity_hash {
                    self.salts.unlock(&identity, &cert_hash)?;
                }
            }
        }

        self.events.push(RegistryEvent::OperationApplied {
            queue_index: queue_position,
            cert_hash,
            kind,
            new_root,
            root_index,
            at: Utc::now(),
        });
        info!(
            queue_index = queue_position,
            cert = %cert_hash,
            kind = %kind,
            root = %new_root,
            root_index,
            "operation applied"
        );
        Ok(new_root)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The current Merkle root (latest entry of the history).
    pub fn merkle_root(&self) -> TreeRoot {
        self.tree.root()
    }

    /// The history index of a root, if it ever appeared.
    pub fn merkle_root_index(&self, root: &TreeRoot) -> Option<u64> {
        self.root_index_of.get(root).copied()
    }

    /// Slice the root history as `[from, to)`; `to = None` means "to
    /// the end". Reconciliation and auditing both slice this range.
    pub fn merkle_roots(
        &self,
        from: u64,
        to: Option<u64>,
    ) -> Result<&[TreeRoot], RegistryError> {
        let len = self.root_history.len() as u64;
        let to = to.unwrap_or(len);
        if from > to || to > len {
            return Err(RegistryError::RootRangeOutOfBounds { from, to, len });
        }
        Ok(&self.root_history[from as usize..to as usize])
    }

    /// The root at a history index, if present.
    pub fn root_at(&self, index: u64) -> Option<TreeRoot> {
        self.root_history.get(index as usize).copied()
    }

    /// Whether a root is an acceptable proof anchor: it must be indexed
    /// AND hold a position at or after the validity window's start.
    pub fn verify_merkle_root(&self, root: &TreeRoot) -> bool {
        self.merkle_root_index(root)
            .map(|index| index >= self.root_valid_from)
            .unwrap_or(false)
    }

    /// Index of the next operation eligible for application.
    pub fn queue_pointer(&self) -> u64 {
        self.queue_pointer
    }

    /// Total operations ever enqueued.
    pub fn queue_len(&self) -> u64 {
        self.queue.len() as u64
    }

    /// The queue entry at a FIFO position.
    pub fn queue_entry(&self, index: u64) -> Option<&QueueEntry> {
        self.queue.get(index as usize)
    }

    /// Oldest history index still accepted as a proof anchor.
    pub fn root_valid_from_index(&self) -> u64 {
        self.root_valid_from
    }

    /// Number of entries in the root history.
    pub fn root_history_len(&self) -> u64 {
        self.root_history.len() as u64
    }

    /// The lifecycle record of a certificate hash, if ever enqueued.
    pub fn record(&self, cert_hash: &LeafHash) -> Option<&OperationRecord> {
        self.records.get(cert_hash)
    }

    /// Generate an inclusion proof for a tree slot against the current
    /// root. Callers use this to build the emptiness (issuance) or
    /// membership (revocation) proof that `apply` demands.
    pub fn create_proof(&self, leaf_index: u64) -> Result<MerkleProof, RegistryError> {
        Ok(self.tree.create_proof(leaf_index)?)
    }

    /// The tree depth.
    pub fn depth(&self) -> u32 {
        self.tree.depth()
    }

    /// The ordered, externally observable event log.
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// The guardian whitelist.
    pub fn guardians(&self) -> &GuardianRegistry {
        &self.guardians
    }

    /// Mutable access to the guardian whitelist (admin operations).
    pub fn guardians_mut(&mut self) -> &mut GuardianRegistry {
        &mut self.guardians
    }

    /// The identity salt lock index.
    pub fn salts(&self) -> &IdentitySaltRegistry {
        &self.salts
    }

    fn state_of(&self, cert_hash: &LeafHash) -> CertificateState {
        self.records
            .get(cert_hash)
            .map(|record| record.state)
            .unwrap_or(CertificateState::Unknown)
    }

    fn push_queued_event(
        &mut self,
        queue_index: u64,
        cert_hash: LeafHash,
        kind: OperationKind,
        enqueued_by: &AccountId,
    ) {
        self.events.push(RegistryEvent::OperationQueued {
            queue_index,
            cert_hash,
            kind,
            enqueued_by: *enqueued_by,
            at: Utc::now(),
        });
        info!(queue_index, cert = %cert_hash, kind = %kind, "operation enqueued");
    }
}

/// A cloneable single-writer handle to a shared registry.
///
/// Replaces the on-chain execution environment's atomic-call guarantee:
/// exactly one caller commits a mutation at a time, and readers (the
/// replication sender) observe only fully applied states.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    inner: Arc<Mutex<CertificateRegistry>>,
}

impl RegistryHandle {
    /// Wrap a registry in a shared handle.
    pub fn new(registry: CertificateRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Acquire the single-writer lock.
    pub fn lock(&self) -> MutexGuard<'_, CertificateRegistry> {
        self.inner.lock()
    }
}
