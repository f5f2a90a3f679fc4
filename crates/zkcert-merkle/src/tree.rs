//! # Sparse Merkle Tree
//!
//! Arena-backed fixed-depth tree. Leaves live in a `BTreeMap` keyed by
//! slot index; internal nodes that differ from the all-empty subtree
//! hash live in a cache keyed by `(level, index)`. Absent entries *are*
//! the empty subtree at that position, so a depth-32 tree never
//! allocates its `2^32` slots.
//!
//! Every mutation recomputes the `depth` ancestors on the touched path;
//! the root is always derived from current leaf contents and never
//! stored anywhere it could drift.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use zkcert_core::{LeafHash, TreeRoot};

use crate::hash::{EMPTY_LEAF, empty_subtree_table, node_hash};
use crate::proof::MerkleProof;

/// Maximum supported tree depth. Capacity is `2^depth` slots, so 32
/// levels already addresses four billion certificates.
pub const MAX_DEPTH: u32 = 32;

/// Errors from sparse Merkle tree operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// A leaf index does not fit in this tree.
    #[error("leaf index {index} out of range for capacity {capacity}")]
    IndexOutOfRange {
        /// The offending leaf index.
        index: u64,
        /// The tree's slot capacity (`2^depth`).
        capacity: u64,
    },

    /// The requested depth is outside the supported range.
    #[error("tree depth {0} out of range (1..={MAX_DEPTH})")]
    DepthOutOfRange(u32),
}

/// A fixed-depth sparse binary Merkle tree over certificate commitments.
#[derive(Debug, Clone)]
pub struct SparseMerkleTree {
    depth: u32,
    /// Occupied leaf slots. Absent slots hold [`EMPTY_LEAF`].
    leaves: BTreeMap<u64, LeafHash>,
    /// Internal nodes differing from the all-empty subtree hash,
    /// keyed by `(level, index_within_level)`. Level 0 is the leaves.
    nodes: HashMap<(u32, u64), [u8; 32]>,
    /// `empty[level]` — hash of an all-empty subtree rooted at `level`.
    empty: Vec<[u8; 32]>,
}

impl SparseMerkleTree {
    /// Create an empty tree of the given depth.
    pub fn new(depth: u32) -> Result<Self, MerkleError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(MerkleError::DepthOutOfRange(depth));
        }
        Ok(Self {
            depth,
            leaves: BTreeMap::new(),
            nodes: HashMap::new(),
            empty: empty_subtree_table(depth),
        })
    }

    /// The tree depth in levels.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The number of leaf slots (`2^depth`).
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// The number of occupied (non-sentinel) leaf slots.
    pub fn occupied(&self) -> usize {
        self.leaves.len()
    }

    /// The current root, derived from current leaf contents.
    pub fn root(&self) -> TreeRoot {
        TreeRoot::from_bytes(self.node_value(self.depth, 0))
    }

    /// The leaf value at `index` ([`EMPTY_LEAF`] for unoccupied slots).
    pub fn leaf(&self, index: u64) -> Result<LeafHash, MerkleError> {
        self.check_index(index)?;
        Ok(self.leaves.get(&index).copied().unwrap_or(EMPTY_LEAF))
    }

    /// Overwrite leaf slots in order, recomputing each touched path.
    ///
    /// Later entries see earlier entries' ancestor updates, so batches
    /// that share ancestors fold correctly. All indices are validated
    /// before any slot is written; an out-of-range entry leaves the
    /// tree untouched.
    pub fn insert_leaves(&mut self, entries: &[(LeafHash, u64)]) -> Result<(), MerkleError> {
        for (_, index) in entries {
            self.check_index(*index)?;
        }
        for (leaf, index) in entries {
            self.write_leaf(*leaf, *index);
        }
        Ok(())
    }

    /// Generate an inclusion proof for the leaf slot at `index`.
    ///
    /// The proof carries the slot's current value (possibly the
    /// sentinel), the `depth` sibling hashes on its path, and the
    /// current root.
    pub fn create_proof(&self, index: u64) -> Result<MerkleProof, MerkleError> {
        self.check_index(index)?;
        let mut path_elements = Vec::with_capacity(self.depth as usize);
        for level in 0..self.depth {
            let sibling = (index >> level) ^ 1;
            path_elements.push(self.node_value(level, sibling));
        }
        Ok(MerkleProof {
            leaf: self.leaves.get(&index).copied().unwrap_or(EMPTY_LEAF),
            leaf_index: index,
            path_elements,
            root: self.root(),
        })
    }

    fn check_index(&self, index: u64) -> Result<(), MerkleError> {
        if index >= self.capacity() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Node hash at `(level, index)`, falling back to the all-empty
    /// subtree hash for uncached positions.
    fn node_value(&self, level: u32, index: u64) -> [u8; 32] {
        if level == 0 {
            return self
                .leaves
                .get(&index)
                .map(|leaf| *leaf.as_bytes())
                .unwrap_or(self.empty[0]);
        }
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.empty[level as usize])
    }

    /// Write one leaf and recompute its ancestor path. Index is assumed
    /// validated.
    fn write_leaf(&mut self, leaf: LeafHash, index: u64) {
        if leaf == EMPTY_LEAF {
            self.leaves.remove(&index);
        } else {
            self.leaves.insert(index, leaf);
        }

        for level in 1..=self.depth {
            let child_base = (index >> (level - 1)) & !1;
            let left = self.node_value(level - 1, child_base);
            let right = self.node_value(level - 1, child_base + 1);
            let parent = node_hash(&left, &right);
            let parent_index = index >> level;
            if parent == self.empty[level as usize] {
                self.nodes.remove(&(level, parent_index));
            } else {
                self.nodes.insert((level, parent_index), parent);
            }
        }
    }
}
