//! # Replica — Reconciliation Under Message Loss
//!
//! A replica mirrors a source registry's root history, validity window,
//! and queue pointer on another domain. It is mutated only through
//! [`Replica::handle`], which authenticates the delivering transport
//! principal, the origin domain, and the sender identity before any
//! state is touched.
//!
//! Messages may arrive duplicated, out of order, or never. The splice
//! algorithm keeps the replica sound through all of it. Every applied
//! operation appends exactly one root at the source, so a message's
//! queue pointer fixes the source-side position of its root window:
//! the window covers source indices `[qp + 1 - len, qp + 1)`. Each
//! mirrored entry remembers its source index, which makes the splice
//! positional rather than value-keyed — a root value that legitimately
//! recurs (a revocation restoring an earlier tree state) cannot be
//! confused with its earlier occurrence.
//!
//! 1. If the window starts beyond the last mirrored source index plus
//!    one, a prior message was lost. The gap's contents are
//!    unrecoverable in compact form, so the message's validity anchor
//!    is appended as a single boundary marker before the window.
//!    Everything before the anchor is already unverifiable at the
//!    source, so the collapse can never make an invalid root verify.
//! 2. Window entries the replica already mirrors are skipped by source
//!    index; the remainder is appended in order.
//! 3. The validity window starts at the anchor's local index. If the
//!    anchor's source index is not mirrored at all (it lies beyond the
//!    delivered windows, or inside a collapsed gap), nothing mirrored
//!    is trustworthy yet and verification rejects every root until the
//!    anchor arrives.
//! 4. The queue pointer only moves forward; a message whose pointer is
//!    behind the replica's is dropped whole as stale.
//!
//! Gap contents are never guessed or reconstructed — the placeholder
//! is a deliberate, auditable information loss.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use zkcert_core::{AccountId, DomainId, TreeRoot};
use zkcert_merkle::{MerkleError, SparseMerkleTree};

use crate::message::{CodecError, StateSyncMessage};

/// Errors from replica message handling.
#[derive(Error, Debug)]
pub enum ReplicaError {
    /// The calling principal is not the bound transport mailbox.
    #[error("caller {0} is not the bound transport principal")]
    UnauthorizedCaller(AccountId),

    /// The message's origin domain is not the configured source.
    #[error("message origin {got} does not match source domain {expected}")]
    InvalidOrigin {
        /// The configured source domain.
        expected: DomainId,
        /// The origin claimed by the delivery.
        got: DomainId,
    },

    /// The message's sender identity is not the configured sender.
    #[error("message sender {got} does not match configured sender {expected}")]
    InvalidSender {
        /// The configured source-side sender.
        expected: AccountId,
        /// The sender claimed by the delivery.
        got: AccountId,
    },

    /// A state update was attempted by anyone other than the replica's
    /// own message handler.
    #[error("caller {0} is not the authorized updater")]
    NotAuthorizedUpdater(AccountId),

    /// The payload did not decode as a state sync message.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Invalid construction parameters (tree depth).
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

/// Outcome of a validated, decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The message advanced (or idempotently re-applied) replica state.
    Applied {
        /// Number of roots appended from the message window.
        appended: usize,
        /// Whether a gap placeholder was inserted before the window.
        placeholder_inserted: bool,
    },
    /// The message's queue pointer was behind the replica's; dropped
    /// whole without touching state.
    Stale {
        /// The pointer carried by the message.
        message_pointer: u64,
        /// The replica's current pointer.
        replica_pointer: u64,
    },
}

/// A read-only mirror of a source registry on a destination domain.
#[derive(Debug)]
pub struct Replica {
    source_domain: DomainId,
    source_sender: AccountId,
    transport_principal: AccountId,
    /// The one principal allowed to commit state updates: the replica's
    /// own handler. Never exposed.
    updater: AccountId,
    root_history: Vec<TreeRoot>,
    /// Source history index of each mirrored entry, parallel to
    /// `root_history`. Strictly increasing; collapsed gaps show up as
    /// jumps.
    source_indices: Vec<u64>,
    /// Latest local occurrence of each root value, matching the
    /// source's overwrite-on-reinsert index semantics.
    root_index_of: HashMap<TreeRoot, u64>,
    /// Local index the validity window starts at. May equal the
    /// history length, in which case nothing mirrored verifies yet.
    root_valid_from: u64,
    queue_pointer: u64,
}

impl Replica {
    /// Deploy a replica for a source registry of the given tree depth.
    ///
    /// The genesis (empty-tree) root is derived from the depth, so the
    /// replica starts with the same history index 0 as the source.
    pub fn new(
        depth: u32,
        source_domain: DomainId,
        source_sender: AccountId,
        transport_principal: AccountId,
    ) -> Result<Self, ReplicaError> {
        // Depth validation comes with building the (empty) tree.
        let genesis = SparseMerkleTree::new(depth)?.root();
        let mut root_index_of = HashMap::new();
        root_index_of.insert(genesis, 0);
        Ok(Self {
            source_domain,
            source_sender,
            transport_principal,
            updater: AccountId::new(),
            root_history: vec![genesis],
            source_indices: vec![0],
            root_index_of,
            root_valid_from: 0,
            queue_pointer: 0,
        })
    }

    /// Validate and apply one inbound delivery.
    ///
    /// `caller` is the principal invoking the handler (must be the
    /// bound transport), `origin_domain` and `sender` are the
    /// transport-attested message provenance. Validation failures drop
    /// the message; the gap is expected to be closed by a later,
    /// larger message.
    pub fn handle(
        &mut self,
        caller: &AccountId,
        origin_domain: DomainId,
        sender: &AccountId,
        payload: &[u8],
    ) -> Result<ReconcileOutcome, ReplicaError> {
        if caller != &self.transport_principal {
            return Err(ReplicaError::UnauthorizedCaller(*caller));
        }
        if origin_domain != self.source_domain {
            return Err(ReplicaError::InvalidOrigin {
                expected: self.source_domain,
                got: origin_domain,
            });
        }
        if sender != &self.source_sender {
            return Err(ReplicaError::InvalidSender {
                expected: self.source_sender,
                got: *sender,
            });
        }
        let message = StateSyncMessage::from_payload(payload)?;
        let updater = self.updater;
        self.update_state(&updater, &message)
    }

    /// The internal update primitive. Only the replica's own handler
    /// holds the updater principal; any other caller is rejected
    /// before any state is read or written.
    pub fn update_state(
        &mut self,
        caller: &AccountId,
        message: &StateSyncMessage,
    ) -> Result<ReconcileOutcome, ReplicaError> {
        if caller != &self.updater {
            return Err(ReplicaError::NotAuthorizedUpdater(*caller));
        }
        if message.queue_pointer < self.queue_pointer {
            debug!(
                message_pointer = message.queue_pointer,
                replica_pointer = self.queue_pointer,
                "dropping stale replication message"
            );
            return Ok(ReconcileOutcome::Stale {
                message_pointer: message.queue_pointer,
                replica_pointer: self.queue_pointer,
            });
        }

        let window_len = message.new_roots.len() as u64;
        let window_start = (message.queue_pointer + 1).saturating_sub(window_len);
        // History is never empty, so last() always yields.
        let last_mirrored = self.source_indices.last().copied().unwrap_or(0);

        let gap = window_start > last_mirrored + 1;
        let placeholder_inserted = gap
            && message.oldest_valid_index > last_mirrored
            && message.oldest_valid_index < window_start;
        if placeholder_inserted {
            self.push_root(message.oldest_valid_root, message.oldest_valid_index);
        }

        // Positional dedup: window entries at or before the last
        // mirrored source index were delivered already.
        let skip = (last_mirrored + 1)
            .saturating_sub(window_start)
            .min(window_len) as usize;
        let appended = message.new_roots.len() - skip;
        for (offset, root) in message.new_roots[skip..].iter().enumerate() {
            self.push_root(*root, window_start + (skip + offset) as u64);
        }

        // The anchor's local position. Not mirrored means the anchor
        // lies beyond the delivered windows or inside a collapsed gap;
        // either way nothing mirrored is trustworthy until it arrives,
        // which the one-past-the-end sentinel encodes.
        self.root_valid_from = match self
            .source_indices
            .binary_search(&message.oldest_valid_index)
        {
            Ok(local) => local as u64,
            Err(_) => self.root_history.len() as u64,
        };
        self.queue_pointer = message.queue_pointer;

        info!(
            appended,
            placeholder_inserted,
            valid_from = self.root_valid_from,
            queue_pointer = self.queue_pointer,
            "replica state reconciled"
        );
        Ok(ReconcileOutcome::Applied {
            appended,
            placeholder_inserted,
        })
    }

    // ── Queries (same semantics as the source registry) ─────────────

    /// The latest mirrored root.
    pub fn merkle_root(&self) -> TreeRoot {
        // History always holds at least the genesis root.
        self.root_history[self.root_history.len() - 1]
    }

    /// The local history index of a root, if mirrored. A re-occurring
    /// value indexes to its latest occurrence.
    pub fn merkle_root_index(&self, root: &TreeRoot) -> Option<u64> {
        self.root_index_of.get(root).copied()
    }

    /// Whether a root is an acceptable proof anchor on this replica:
    /// mirrored AND inside the validity window.
    pub fn verify_merkle_root(&self, root: &TreeRoot) -> bool {
        self.merkle_root_index(root)
            .map(|index| index >= self.root_valid_from)
            .unwrap_or(false)
    }

    /// Slice the mirrored history as `[from, to)`; `to = None` means
    /// "to the end".
    pub fn merkle_roots(
        &self,
        from: u64,
        to: Option<u64>,
    ) -> Result<&[TreeRoot], ReplicaError> {
        let len = self.root_history.len() as u64;
        let to = to.unwrap_or(len);
        if from > to || to > len {
            return Err(ReplicaError::RootRangeOutOfBounds { from, to, len });
        }
        Ok(&self.root_history[from as usize..to as usize])
    }

    /// Number of mirrored history entries.
    pub fn root_history_len(&self) -> u64 {
        self.root_history.len() as u64
    }

    /// Start of the mirrored validity window, as a local index. Equals
    /// [`root_history_len`](Self::root_history_len) while the current
    /// anchor has not been delivered yet.
    pub fn root_valid_from_index(&self) -> u64 {
        self.root_valid_from
    }

    /// The mirrored source queue pointer.
    pub fn queue_pointer(&self) -> u64 {
        self.queue_pointer
    }

    fn push_root(&mut self, root: TreeRoot, source_index: u64) {
        let local = self.root_history.len() as u64;
        self.root_history.push(root);
        self.source_indices.push(source_index);
        self.root_index_of.insert(root, local);
    }
}
