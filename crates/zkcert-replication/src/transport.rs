//! # Transport Abstraction
//!
//! The mailbox seam between sender and replica. A transport delivers an
//! opaque payload from a known source domain to a destination contract
//! at-least-once, possibly out of order, possibly never — but never
//! with corrupted content. Bridge consensus and signature verification
//! live behind this trait, not in this crate.
//!
//! [`MockTransport`] is the in-memory implementation used throughout
//! the test suites: sent messages land in an inspectable outbox, and
//! tests choose which to deliver, drop, duplicate, or reorder.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use zkcert_core::DomainId;

/// Errors from the message transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The destination domain is not reachable from this transport.
    #[error("destination {0} unreachable")]
    Unreachable(DomainId),

    /// The transport rejected the payload.
    #[error("transport rejected payload: {0}")]
    Rejected(String),
}

/// A cross-domain message transport.
pub trait Transport {
    /// Quote the fee for carrying `payload` to `destination`, without
    /// sending anything.
    fn quote(&self, destination: DomainId, payload: &[u8]) -> Result<u64, TransportError>;

    /// Dispatch `payload` toward `destination`. Returns the fee paid.
    /// Delivery is asynchronous and unacknowledged.
    fn send(&self, destination: DomainId, payload: Vec<u8>) -> Result<u64, TransportError>;
}

/// A message captured by the mock transport's outbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// The destination domain.
    pub destination: DomainId,
    /// The opaque payload.
    pub payload: Vec<u8>,
}

/// In-memory transport for tests.
///
/// Fees are deterministic (`base_fee + fee_per_byte * len`). Clones
/// share one outbox, so a test can hold a clone while the sender owns
/// the transport, then deliver, drop, or reorder captured messages at
/// will.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    base_fee: u64,
    fee_per_byte: u64,
    outbox: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl MockTransport {
    /// Create a mock transport with the given fee schedule.
    pub fn new(base_fee: u64, fee_per_byte: u64) -> Self {
        Self {
            base_fee,
            fee_per_byte,
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn fee(&self, payload_len: usize) -> u64 {
        self.base_fee + self.fee_per_byte * payload_len as u64
    }

    /// Number of captured messages not yet taken.
    pub fn outbox_len(&self) -> usize {
        self.outbox.lock().len()
    }

    /// Drain the outbox, returning captured messages in send order.
    pub fn take_outbox(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.outbox.lock())
    }
}

impl Transport for MockTransport {
    fn quote(&self, _destination: DomainId, payload: &[u8]) -> Result<u64, TransportError> {
        Ok(self.fee(payload.len()))
    }

    fn send(&self, destination: DomainId, payload: Vec<u8>) -> Result<u64, TransportError> {
        let fee = self.fee(payload.len());
        self.outbox.lock().push(OutboundMessage {
            destination,
            payload,
        });
        Ok(fee)
    }
}
