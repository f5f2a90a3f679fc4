//! # State Sync Messages
//!
//! The wire shape carried by every replication message. The transport
//! treats the payload as opaque bytes; both ends use the canonical JSON
//! codec here. The transport never corrupts payload content, so decode
//! failures indicate a mis-configured sender rather than line noise.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use zkcert_core::TreeRoot;

/// Errors from encoding or decoding a state sync payload.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The payload is not a valid state sync message.
    #[error("state sync payload codec failure: {0}")]
    Json(#[from] serde_json::Error),
}

/// One replication message: a window of new roots plus the source's
/// validity anchor and queue pointer at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSyncMessage {
    /// The next window of roots after the sender's cursor, in history
    /// order. Bounded by the sender's batch size.
    pub new_roots: Vec<TreeRoot>,
    /// The oldest root the source still considered valid at send time.
    /// Becomes the gap placeholder when the replica has to collapse a
    /// lost window.
    pub oldest_valid_root: TreeRoot,
    /// Source history index of `oldest_valid_root` at send time. The
    /// replica anchors its validity window by this position; the value
    /// alone would be ambiguous when a root value recurs in history.
    pub oldest_valid_index: u64,
    /// The source's queue pointer as of this window's last root, which
    /// places the window in the source's history (one root per applied
    /// operation). Monotone: replicas drop messages whose pointer is
    /// behind their own.
    pub queue_pointer: u64,
}

impl StateSyncMessage {
    /// Encode to the opaque transport payload.
    pub fn to_payload(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from an opaque transport payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(payload)?)
    }
}
