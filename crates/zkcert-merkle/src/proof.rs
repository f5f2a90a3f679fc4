//! # Inclusion Proofs
//!
//! A [`MerkleProof`] binds a leaf value to a slot index under a specific
//! root: `depth` sibling hashes, folded leaf-to-root with the slot
//! index selecting left/right at each level.
//!
//! Verification is pure — no access to the tree — so provers can
//! generate a proof on the source domain and verifiers can check it
//! anywhere the root is known.

use serde::{Deserialize, Serialize};

use zkcert_core::{LeafHash, TreeRoot};

use crate::hash::node_hash;

/// An inclusion proof for one leaf slot of a sparse Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf value being proven (possibly the empty-leaf sentinel).
    pub leaf: LeafHash,
    /// The slot index of the leaf.
    pub leaf_index: u64,
    /// Sibling hashes from level 0 (leaf siblings) upward, one per level.
    pub path_elements: Vec<[u8; 32]>,
    /// The root this proof was generated against.
    pub root: TreeRoot,
}

impl MerkleProof {
    /// Fold the path to recompute the root this proof implies.
    pub fn computed_root(&self) -> TreeRoot {
        let mut current = *self.leaf.as_bytes();
        for (level, sibling) in self.path_elements.iter().enumerate() {
            current = if (self.leaf_index >> level) & 1 == 1 {
                node_hash(sibling, &current)
            } else {
                node_hash(&current, sibling)
            };
        }
        TreeRoot::from_bytes(current)
    }
}

/// Verify an inclusion proof: the folded path must reproduce the
/// proof's own root. Returns `false` for malformed proofs rather than
/// an error.
pub fn verify_proof(proof: &MerkleProof) -> bool {
    if proof.path_elements.is_empty() || proof.path_elements.len() > 64 {
        return false;
    }
    if proof.path_elements.len() < 64
        && proof.leaf_index >= (1u64 << proof.path_elements.len())
    {
        return false;
    }
    proof.computed_root() == proof.root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{EMPTY_LEAF, leaf_commitment};
    use crate::tree::SparseMerkleTree;

    fn proven_tree() -> (SparseMerkleTree, MerkleProof) {
        let mut tree = SparseMerkleTree::new(6).unwrap();
        tree.insert_leaves(&[
            (leaf_commitment(b"one"), 9),
            (leaf_commitment(b"two"), 10),
        ])
        .unwrap();
        let proof = tree.create_proof(9).unwrap();
        (tree, proof)
    }

    #[test]
    fn valid_proof_verifies() {
        let (tree, proof) = proven_tree();
        assert!(verify_proof(&proof));
        assert_eq!(proof.computed_root(), tree.root());
    }

    #[test]
    fn tampered_leaf_fails() {
        let (_, mut proof) = proven_tree();
        proof.leaf = leaf_commitment(b"forged");
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn tampered_sibling_fails() {
        let (_, mut proof) = proven_tree();
        proof.path_elements[2] = [0u8; 32];
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn wrong_index_fails() {
        let (_, mut proof) = proven_tree();
        proof.leaf_index = 10;
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn empty_path_fails() {
        let proof = MerkleProof {
            leaf: EMPTY_LEAF,
            leaf_index: 0,
            path_elements: Vec::new(),
            root: TreeRoot::from_bytes(*EMPTY_LEAF.as_bytes()),
        };
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn index_beyond_path_capacity_fails() {
        let (_, mut proof) = proven_tree();
        proof.leaf_index = 1 << 6;
        assert!(!verify_proof(&proof));
    }

    #[test]
    fn proof_serde_roundtrip() {
        let (_, proof) = proven_tree();
        let json = serde_json::to_string(&proof).unwrap();
        let back: MerkleProof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, proof);
        assert!(verify_proof(&back));
    }
}
