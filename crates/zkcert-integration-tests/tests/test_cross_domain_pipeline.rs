// SPDX-License-Identifier: BUSL-1.1
//! End-to-end cross-domain pipeline test.
//!
//! Drives the full stack in-process: a source registry with real
//! guardian admission, the bounded-batch replication sender over the
//! mock transport, and a destination replica. Exercises:
//!
//! 1. Guardian grant, issuance and revocation through the FIFO queue
//! 2. Relaying every produced root window to the destination
//! 3. Root verification on the replica matching the source exactly,
//!    including validity-window narrowing after a revocation

use chrono::{Duration, Utc};
use ed25519_dalek::SigningKey;
use rand_core::OsRng;

use zkcert_core::{AccountId, DomainId, IdentityCommitment, IdentityHash, LeafHash, TreeRoot};
use zkcert_merkle::leaf_commitment;
use zkcert_registry::{
    CertificateRegistry, CertificateState, GuardianMetadata, GuardianRegistry, RegistryHandle,
};
use zkcert_replication::{MockTransport, ReconcileOutcome, Replica, ReplicationSender};

const DEPTH: u32 = 8;

struct Domains {
    handle: RegistryHandle,
    guardian: AccountId,
    sender: ReplicationSender<MockTransport>,
    transport: MockTransport,
    replica: Replica,
    replica_transport: AccountId,
    source_sender: AccountId,
    source_domain: DomainId,
}

fn setup(max_roots_per_message: usize) -> Domains {
    let admin = AccountId::new();
    let guardian = AccountId::new();
    let mut guardians = GuardianRegistry::new(admin);
    guardians
        .grant_role(
            &admin,
            guardian,
            SigningKey::generate(&mut OsRng).verifying_key(),
            GuardianMetadata {
                name: "compliant-kyc".to_string(),
                url: Some("https://guardians.example/kyc".to_string()),
            },
        )
        .unwrap();
    let handle = RegistryHandle::new(CertificateRegistry::new(DEPTH, guardians).unwrap());

    let source_domain = DomainId::new(1);
    let destination = DomainId::new(2);
    let transport = MockTransport::new(10, 1);
    let sender = ReplicationSender::new(
        handle.clone(),
        transport.clone(),
        destination,
        max_roots_per_message,
    )
    .unwrap();

    let replica_transport = AccountId::new();
    let source_sender = AccountId::new();
    let replica = Replica::new(DEPTH, source_domain, source_sender, replica_transport).unwrap();

    Domains {
        handle,
        guardian,
        sender,
        transport,
        replica,
        replica_transport,
        source_sender,
        source_domain,
    }
}

fn issue(domains: &Domains, tag: u8, slot: u64) -> (LeafHash, TreeRoot) {
    let mut registry = domains.handle.lock();
    let hash = leaf_commitment(&[b"cert", &[tag][..]].concat());
    let position = registry
        .enqueue_issuance(
            &domains.guardian,
            hash,
            IdentityHash::from_bytes([tag; 32]),
            IdentityCommitment::from_bytes([tag; 32]),
            Utc::now() + Duration::days(180),
        )
        .unwrap();
    let proof = registry.create_proof(slot).unwrap();
    let root = registry.apply(position, hash, &proof).unwrap();
    (hash, root)
}

fn revoke(domains: &Domains, hash: LeafHash) -> TreeRoot {
    let mut registry = domains.handle.lock();
    let position = registry.enqueue_revocation(&domains.guardian, hash).unwrap();
    let slot = registry.record(&hash).unwrap().leaf_index.unwrap();
    let proof = registry.create_proof(slot).unwrap();
    registry.apply(position, hash, &proof).unwrap()
}

/// Drain the transport outbox into the replica, in delivery order.
fn deliver_all(domains: &mut Domains) -> Vec<ReconcileOutcome> {
    domains
        .transport
        .take_outbox()
        .into_iter()
        .map(|message| {
            let transport = domains.replica_transport;
            let sender = domains.source_sender;
            domains
                .replica
                .handle(&transport, domains.source_domain, &sender, &message.payload)
                .unwrap()
        })
        .collect()
}

#[test]
fn issuance_replicates_to_destination() {
    let mut domains = setup(16);

    let (hash, root) = issue(&domains, 1, 0);
    assert_eq!(
        domains.handle.lock().record(&hash).unwrap().state,
        CertificateState::Issued
    );

    let receipt = domains.sender.relay_state().unwrap().unwrap();
    assert_eq!(receipt.roots_sent, 1);
    assert_eq!(receipt.queue_pointer, 1);

    let outcomes = deliver_all(&mut domains);
    assert_eq!(
        outcomes,
        vec![ReconcileOutcome::Applied {
            appended: 1,
            placeholder_inserted: false
        }]
    );
    assert_eq!(domains.replica.merkle_root(), root);
    assert!(domains.replica.verify_merkle_root(&root));
    assert_eq!(domains.replica.queue_pointer(), 1);
}

#[test]
fn revocation_narrows_replica_validity_window() {
    let mut domains = setup(16);

    let (first, first_root) = issue(&domains, 1, 0);
    let (_, second_root) = issue(&domains, 2, 1);
    let revoked_root = revoke(&domains, first);

    domains.sender.relay_state().unwrap().unwrap();
    deliver_all(&mut domains);

    // Source and replica agree on every root and on the window.
    let source = domains.handle.lock();
    for root in [&first_root, &second_root, &revoked_root] {
        assert_eq!(
            source.verify_merkle_root(root),
            domains.replica.verify_merkle_root(root),
            "source and replica disagree on root {root}"
        );
    }
    assert!(!domains.replica.verify_merkle_root(&first_root));
    assert!(!domains.replica.verify_merkle_root(&second_root));
    assert!(domains.replica.verify_merkle_root(&revoked_root));
    // With nothing lost, replica state is identical to the source's.
    assert_eq!(
        domains.replica.merkle_roots(0, None).unwrap(),
        source.merkle_roots(0, None).unwrap()
    );
    assert_eq!(
        domains.replica.root_valid_from_index(),
        source.root_valid_from_index()
    );
    assert_eq!(domains.replica.queue_pointer(), source.queue_pointer());
}

#[test]
fn small_batches_partition_the_history() {
    let mut domains = setup(2);

    for tag in 1..=5u8 {
        issue(&domains, tag, tag as u64 - 1);
    }

    // 5 roots beyond genesis, batch bound 2: windows of 2, 2, 1.
    let mut sent = Vec::new();
    while let Some(receipt) = domains.sender.relay_state().unwrap() {
        sent.push(receipt.roots_sent);
    }
    assert_eq!(sent, vec![2, 2, 1]);

    deliver_all(&mut domains);
    let source = domains.handle.lock();
    assert_eq!(
        domains.replica.merkle_roots(0, None).unwrap(),
        source.merkle_roots(0, None).unwrap()
    );
    assert_eq!(domains.replica.queue_pointer(), source.queue_pointer());
}

#[test]
fn reissuance_after_revocation_replicates() {
    let mut domains = setup(16);

    let (hash, _) = issue(&domains, 1, 0);
    revoke(&domains, hash);
    // Same certificate hash issued again into a fresh slot.
    let mut registry = domains.handle.lock();
    let position = registry
        .enqueue_issuance(
            &domains.guardian,
            hash,
            IdentityHash::from_bytes([1; 32]),
            IdentityCommitment::from_bytes([1; 32]),
            Utc::now() + Duration::days(180),
        )
        .unwrap();
    let proof = registry.create_proof(3).unwrap();
    let reissued_root = registry.apply(position, hash, &proof).unwrap();
    drop(registry);

    domains.sender.relay_state().unwrap().unwrap();
    deliver_all(&mut domains);

    // Revoking the only occupied slot restored the empty-tree root, so
    // the genesis value recurs mid-history; the replica keeps the
    // duplicate entry and stays identical to the source.
    let source = domains.handle.lock();
    assert_eq!(
        domains.replica.merkle_roots(0, None).unwrap(),
        source.merkle_roots(0, None).unwrap()
    );
    assert_eq!(
        domains.replica.root_valid_from_index(),
        source.root_valid_from_index()
    );
    assert_eq!(domains.replica.merkle_root(), reissued_root);
    assert!(domains.replica.verify_merkle_root(&reissued_root));
    assert_eq!(domains.replica.queue_pointer(), 3);
}
