//! # zkcert-replication — Cross-Domain Root History Replication
//!
//! Mirrors a certificate registry's root history, validity window, and
//! queue pointer onto other domains:
//!
//! - **Messages** ([`message`]): the `{new_roots, oldest_valid_root,
//!   oldest_valid_index, queue_pointer}` wire shape and its canonical
//!   JSON codec.
//! - **Transport** ([`transport`]): the mailbox abstraction — delivers
//!   opaque payloads at-least-once, possibly out of order, possibly
//!   never — plus an in-memory mock for tests.
//! - **Sender** ([`sender`]): reads the registry behind its
//!   single-writer handle and relays the next unsent window of roots,
//!   never more than the configured batch bound per message.
//! - **Replica** ([`replica`]): validates inbound messages (transport
//!   principal, origin domain, sender identity) and splices its local
//!   root list against the source's, collapsing unrecoverable gaps into
//!   a single boundary root so that no invalid root ever verifies.
//!
//! Replication is push-only and fire-and-forget: the sender expects no
//! acknowledgement, and redelivered or reordered messages reconcile
//! idempotently instead of being deduplicated.

pub mod message;
pub mod replica;
pub mod sender;
pub mod transport;

// Re-export primary types.
pub use message::{CodecError, StateSyncMessage};
pub use replica::{ReconcileOutcome, Replica, ReplicaError};
pub use sender::{RelayReceipt, ReplicationSender, SenderError};
pub use transport::{MockTransport, OutboundMessage, Transport, TransportError};
