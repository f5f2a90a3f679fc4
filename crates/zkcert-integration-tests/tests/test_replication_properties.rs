// SPDX-License-Identifier: BUSL-1.1
//! Property-based replication tests.
//!
//! Drives a real source registry through randomized operation
//! sequences, relays with randomized batch sizes, and delivers with
//! randomized message drops, checking the reconciliation invariants
//! that hold regardless of schedule:
//!
//! - in-order delivery with nothing dropped converges to a replica
//!   byte-identical to the source
//! - with drops, the replica never validates a root the source rejects
//! - the mirrored queue pointer never moves backward
//! - replaying an entire delivery schedule is a no-op

use chrono::{Duration, Utc};
use ed25519_dalek::SigningKey;
use proptest::prelude::*;
use rand_core::OsRng;

use zkcert_core::{AccountId, DomainId, IdentityCommitment, IdentityHash, LeafHash};
use zkcert_merkle::leaf_commitment;
use zkcert_registry::{CertificateRegistry, GuardianMetadata, GuardianRegistry, RegistryHandle};
use zkcert_replication::{MockTransport, OutboundMessage, Replica, ReplicationSender};

const DEPTH: u32 = 8;

fn registry_handle() -> (RegistryHandle, AccountId) {
    let admin = AccountId::new();
    let guardian = AccountId::new();
    let mut guardians = GuardianRegistry::new(admin);
    guardians
        .grant_role(
            &admin,
            guardian,
            SigningKey::generate(&mut OsRng).verifying_key(),
            GuardianMetadata {
                name: "acme".to_string(),
                url: None,
            },
        )
        .unwrap();
    let registry = CertificateRegistry::new(DEPTH, guardians).unwrap();
    (RegistryHandle::new(registry), guardian)
}

/// Run a randomized operation sequence against a fresh registry.
/// `true` issues a new certificate in the next free slot; `false`
/// revokes the oldest live one (or issues if none is live).
fn run_ops(handle: &RegistryHandle, guardian: &AccountId, ops: &[bool]) {
    let mut registry = handle.lock();
    let mut live: Vec<LeafHash> = Vec::new();
    let mut next_slot = 0u64;
    let mut next_tag = 0u8;

    for &op in ops {
        if op || live.is_empty() {
            next_tag += 1;
            let hash = leaf_commitment(&[b"prop-cert", &[next_tag][..]].concat());
            let position = registry
                .enqueue_issuance(
                    guardian,
                    hash,
                    IdentityHash::from_bytes([next_tag; 32]),
                    IdentityCommitment::from_bytes([next_tag; 32]),
                    Utc::now() + Duration::days(30),
                )
                .unwrap();
            let proof = registry.create_proof(next_slot).unwrap();
            registry.apply(position, hash, &proof).unwrap();
            live.push(hash);
            next_slot += 1;
        } else {
            let hash = live.remove(0);
            let position = registry.enqueue_revocation(guardian, hash).unwrap();
            let slot = registry.record(&hash).unwrap().leaf_index.unwrap();
            let proof = registry.create_proof(slot).unwrap();
            registry.apply(position, hash, &proof).unwrap();
        }
    }
}

struct Wiring {
    replica: Replica,
    transport_principal: AccountId,
    source_sender: AccountId,
    source_domain: DomainId,
}

fn wire_replica() -> Wiring {
    let source_domain = DomainId::new(1);
    let transport_principal = AccountId::new();
    let source_sender = AccountId::new();
    let replica =
        Replica::new(DEPTH, source_domain, source_sender, transport_principal).unwrap();
    Wiring {
        replica,
        transport_principal,
        source_sender,
        source_domain,
    }
}

fn deliver(wiring: &mut Wiring, message: &OutboundMessage) {
    let transport = wiring.transport_principal;
    let sender = wiring.source_sender;
    wiring
        .replica
        .handle(&transport, wiring.source_domain, &sender, &message.payload)
        .unwrap();
}

/// Relay the whole history as windows of `batch` roots.
fn relay_all(
    handle: &RegistryHandle,
    batch: usize,
) -> Vec<OutboundMessage> {
    let transport = MockTransport::default();
    let mut sender = ReplicationSender::new(
        handle.clone(),
        transport.clone(),
        DomainId::new(2),
        batch,
    )
    .unwrap();
    while sender.relay_state().unwrap().is_some() {}
    transport.take_outbox()
}

proptest! {
    /// In-order, loss-free delivery reproduces the source exactly,
    /// whatever the operation mix and batch size.
    #[test]
    fn lossless_delivery_converges_byte_identically(
        ops in proptest::collection::vec(any::<bool>(), 1..16),
        batch in 1usize..5,
    ) {
        let (handle, guardian) = registry_handle();
        run_ops(&handle, &guardian, &ops);

        let mut wiring = wire_replica();
        for message in &relay_all(&handle, batch) {
            deliver(&mut wiring, message);
        }

        let source = handle.lock();
        prop_assert_eq!(
            wiring.replica.merkle_roots(0, None).unwrap(),
            source.merkle_roots(0, None).unwrap()
        );
        prop_assert_eq!(
            wiring.replica.root_valid_from_index(),
            source.root_valid_from_index()
        );
        prop_assert_eq!(wiring.replica.queue_pointer(), source.queue_pointer());
    }

    /// Whatever messages are lost, the replica never validates a root
    /// the source rejects, and its pointer never moves backward.
    #[test]
    fn lossy_delivery_stays_sound(
        ops in proptest::collection::vec(any::<bool>(), 1..16),
        batch in 1usize..5,
        drops in proptest::collection::vec(any::<bool>(), 16),
    ) {
        let (handle, guardian) = registry_handle();
        run_ops(&handle, &guardian, &ops);

        let mut wiring = wire_replica();
        let mut last_pointer = 0;
        for (i, message) in relay_all(&handle, batch).iter().enumerate() {
            if *drops.get(i).unwrap_or(&false) {
                continue;
            }
            deliver(&mut wiring, message);
            prop_assert!(wiring.replica.queue_pointer() >= last_pointer);
            last_pointer = wiring.replica.queue_pointer();
        }

        let source = handle.lock();
        for root in source.merkle_roots(0, None).unwrap() {
            if wiring.replica.verify_merkle_root(root) {
                prop_assert!(
                    source.verify_merkle_root(root),
                    "replica validates a root the source rejects"
                );
            }
        }
    }

    /// Replaying an entire delivery schedule leaves the replica
    /// untouched: reconciliation is idempotent message by message.
    #[test]
    fn replayed_schedule_is_a_no_op(
        ops in proptest::collection::vec(any::<bool>(), 1..12),
        batch in 1usize..4,
        drops in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let (handle, guardian) = registry_handle();
        run_ops(&handle, &guardian, &ops);

        let mut wiring = wire_replica();
        let messages = relay_all(&handle, batch);
        let schedule: Vec<&OutboundMessage> = messages
            .iter()
            .enumerate()
            .filter(|(i, _)| !drops.get(*i).unwrap_or(&false))
            .map(|(_, message)| message)
            .collect();

        for message in &schedule {
            deliver(&mut wiring, message);
        }
        let history = wiring.replica.merkle_roots(0, None).unwrap().to_vec();
        let valid_from = wiring.replica.root_valid_from_index();
        let pointer = wiring.replica.queue_pointer();

        for message in &schedule {
            deliver(&mut wiring, message);
        }
        prop_assert_eq!(wiring.replica.merkle_roots(0, None).unwrap(), &history[..]);
        prop_assert_eq!(wiring.replica.root_valid_from_index(), valid_from);
        prop_assert_eq!(wiring.replica.queue_pointer(), pointer);
    }
}
