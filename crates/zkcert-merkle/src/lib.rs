//! # zkcert-merkle — Sparse Merkle Tree over Certificate Commitments
//!
//! A fixed-depth binary Merkle tree whose `2^depth` leaf slots default to
//! an empty-leaf sentinel. Certificate commitments occupy individual
//! slots; issuing writes a commitment, revoking writes the sentinel back.
//!
//! - **Hashing** ([`hash`]): domain-separated SHA-256. Internal nodes are
//!   hashed with a tag byte distinct from the content-leaf tag, and the
//!   empty-leaf sentinel lives in its own reserved tag domain so a sparse
//!   slot can never collide with a real commitment.
//! - **Tree** ([`tree`]): arena-backed storage — absent leaves and
//!   all-empty subtrees are never materialized, so a depth-32 tree costs
//!   memory proportional to its occupied slots, not `2^32`.
//! - **Proofs** ([`proof`]): `depth` sibling hashes from leaf to root,
//!   verifiable without access to the tree.

pub mod hash;
pub mod proof;
pub mod tree;

// Re-export primary types.
pub use hash::{EMPTY_LEAF, empty_root, leaf_commitment, node_hash};
pub use proof::{MerkleProof, verify_proof};
pub use tree::{MerkleError, SparseMerkleTree};
