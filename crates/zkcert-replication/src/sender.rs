//! # Replication Sender
//!
//! Reads the bound registry behind its single-writer handle and relays
//! the next unsent window of roots — at most `max_roots_per_message`
//! per call — together with the registry's validity anchor and queue
//! pointer at send time.
//!
//! The sender keeps only a cursor over the root history. It expects no
//! acknowledgement and never learns whether a message arrived: if a
//! message is dropped, a later window's validity anchor lets the
//! replica close the gap. An external scheduler is responsible for
//! calling [`ReplicationSender::relay_state`] until the backlog drains.

use thiserror::Error;
use tracing::info;

use zkcert_core::DomainId;
use zkcert_registry::{RegistryError, RegistryHandle};

use crate::message::{CodecError, StateSyncMessage};
use crate::transport::{Transport, TransportError};

/// Errors from the replication sender.
#[derive(Error, Debug)]
pub enum SenderError {
    /// The batch bound must admit at least one root per message.
    #[error("max_roots_per_message must be at least 1")]
    InvalidBatchBound,

    /// The transport refused the message. The cursor does not advance;
    /// the same window is retried on the next call.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Payload encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Registry read failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Receipt returned for each successfully relayed window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReceipt {
    /// Number of roots carried by the message.
    pub roots_sent: usize,
    /// Fee paid to the transport.
    pub fee_paid: u64,
    /// The source queue pointer embedded in the message.
    pub queue_pointer: u64,
    /// The cursor after this send — index of the next unsent root.
    pub next_root_index: u64,
}

/// Relays a registry's root history toward one destination domain.
pub struct ReplicationSender<T: Transport> {
    registry: RegistryHandle,
    transport: T,
    destination: DomainId,
    max_roots_per_message: usize,
    /// Index of the next unsent root. Starts at 1: the genesis root is
    /// fixed by the tree depth and pre-shared at replica deployment.
    next_root_index: u64,
}

impl<T: Transport> ReplicationSender<T> {
    /// Bind a sender to a registry handle and destination.
    pub fn new(
        registry: RegistryHandle,
        transport: T,
        destination: DomainId,
        max_roots_per_message: usize,
    ) -> Result<Self, SenderError> {
        if max_roots_per_message == 0 {
            return Err(SenderError::InvalidBatchBound);
        }
        Ok(Self {
            registry,
            transport,
            destination,
            max_roots_per_message,
            next_root_index: 1,
        })
    }

    /// Number of produced roots not yet attempted.
    pub fn pending(&self) -> u64 {
        let registry = self.registry.lock();
        registry.root_history_len().saturating_sub(self.next_root_index)
    }

    /// Quote the transport fee for the message the next
    /// [`relay_state`](Self::relay_state) call would send. `None` when
    /// the sender is caught up.
    pub fn quote_fee(&self) -> Result<Option<u64>, SenderError> {
        match self.build_window()? {
            Some((_, payload, _)) => Ok(Some(self.transport.quote(self.destination, &payload)?)),
            None => Ok(None),
        }
    }

    /// Relay the next unsent window of roots. Returns `None` when the
    /// sender is caught up with the registry.
    ///
    /// The cursor advances only after the transport accepts the
    /// message, so a transport failure retries the same window.
    pub fn relay_state(&mut self) -> Result<Option<RelayReceipt>, SenderError> {
        let Some((message, payload, window_end)) = self.build_window()? else {
            return Ok(None);
        };
        let fee_paid = self.transport.send(self.destination, payload)?;
        self.next_root_index = window_end;

        info!(
            destination = %self.destination,
            roots = message.new_roots.len(),
            queue_pointer = message.queue_pointer,
            cursor = window_end,
            "relayed state window"
        );
        Ok(Some(RelayReceipt {
            roots_sent: message.new_roots.len(),
            fee_paid,
            queue_pointer: message.queue_pointer,
            next_root_index: window_end,
        }))
    }

    /// Snapshot the next unsent window under the registry lock.
    fn build_window(
        &self,
    ) -> Result<Option<(StateSyncMessage, Vec<u8>, u64)>, SenderError> {
        let registry = self.registry.lock();
        let history_len = registry.root_history_len();
        if self.next_root_index >= history_len {
            return Ok(None);
        }
        let window_end =
            history_len.min(self.next_root_index + self.max_roots_per_message as u64);
        let new_roots = registry
            .merkle_roots(self.next_root_index, Some(window_end))?
            .to_vec();
        let valid_from = registry.root_valid_from_index();
        // valid_from always indexes into the history; the genesis root
        // backs it on a fresh registry.
        let oldest_valid_root = registry
            .root_at(valid_from)
            .unwrap_or_else(|| registry.merkle_root());
        // The pointer is stamped as of the window's last root, not the
        // registry's live pointer: when several windows are needed to
        // catch up, each message must place its own window for the
        // replica (history index == operation count, one root per
        // applied operation).
        let message = StateSyncMessage {
            new_roots,
            oldest_valid_root,
            oldest_valid_index: valid_from,
            queue_pointer: window_end - 1,
        };
        let payload = message.to_payload()?;
        Ok(Some((message, payload, window_end)))
    }
}
