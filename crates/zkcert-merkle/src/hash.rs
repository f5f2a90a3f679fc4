//! # Domain-Separated Tree Hashing
//!
//! All tree hashing uses SHA-256 with a one-byte domain tag:
//!
//! - `0x00 || content` — content-leaf commitment ([`leaf_commitment`]).
//! - `0x01 || left || right` — internal node ([`node_hash`]).
//! - `0x02` — reserved for the empty-leaf sentinel.
//!
//! The sentinel is the digest of `0x02 || "zkcert/empty-leaf"`. Because
//! content leaves are always produced in the `0x00` tag domain, no
//! certificate commitment can equal [`EMPTY_LEAF`], which is what makes
//! a sparse (unused or revoked) slot unambiguous.

use sha2::{Digest, Sha256};

use zkcert_core::{LeafHash, TreeRoot};

/// Tag byte for content-leaf commitments.
const TAG_LEAF: u8 = 0x00;
/// Tag byte for internal nodes.
const TAG_NODE: u8 = 0x01;

/// The empty-leaf sentinel: `SHA256(0x02 || "zkcert/empty-leaf")`.
///
/// Occupies every unused leaf slot and is written back when a
/// certificate is revoked. Unreachable from the content-leaf hash
/// domain.
pub const EMPTY_LEAF: LeafHash = LeafHash::from_bytes([
    0x85, 0xe0, 0x48, 0xf2, 0xd1, 0xfc, 0xe6, 0xbe, 0x79, 0xf7, 0x64, 0xf4, 0x29, 0xac, 0x26,
    0x90, 0x1b, 0x3b, 0x6c, 0xd7, 0xdb, 0x50, 0x07, 0x46, 0xfc, 0x9a, 0x9f, 0xb1, 0xcd, 0xc9,
    0xbf, 0x5e,
]);

fn sha256_raw(input: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Compute a content-leaf commitment: `SHA256(0x00 || content)`.
///
/// Certificate issuers derive the leaf hash from the (opaque) credential
/// content through this function so that every live leaf stays inside
/// the `0x00` tag domain.
pub fn leaf_commitment(content: &[u8]) -> LeafHash {
    let mut input = Vec::with_capacity(1 + content.len());
    input.push(TAG_LEAF);
    input.extend_from_slice(content);
    LeafHash::from_bytes(sha256_raw(&input))
}

/// Compute an internal node hash: `SHA256(0x01 || left || right)`.
pub fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut input = Vec::with_capacity(65);
    input.push(TAG_NODE);
    input.extend_from_slice(left);
    input.extend_from_slice(right);
    sha256_raw(&input)
}

/// Build the table of all-empty subtree hashes for a tree of `depth`
/// levels: `table[0] = EMPTY_LEAF`, `table[i+1] = H(table[i], table[i])`.
pub(crate) fn empty_subtree_table(depth: u32) -> Vec<[u8; 32]> {
    let mut table = Vec::with_capacity(depth as usize + 1);
    table.push(*EMPTY_LEAF.as_bytes());
    for level in 0..depth as usize {
        let h = node_hash(&table[level], &table[level]);
        table.push(h);
    }
    table
}

/// The root of an entirely empty tree of the given depth.
///
/// This is the pre-genesis root at index 0 of every registry's (and
/// replica's) root history.
pub fn empty_root(depth: u32) -> TreeRoot {
    let table = empty_subtree_table(depth);
    TreeRoot::from_bytes(table[depth as usize])
}
