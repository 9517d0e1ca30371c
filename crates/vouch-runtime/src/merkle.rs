//! Append-only Merkle accumulator of commitments
//!
//! Fixed depth, filled left to right. Leaf `i` is the `i`-th accepted
//! insertion, so the root is a pure function of the ordered leaf sequence:
//! replaying the same insertions in the same order always reproduces it.
//!
//! Only populated nodes are stored, one vector per level. A node that has not
//! been written yet reads as the zero value of its level, where
//! `zeros[0] = 0` and `zeros[i + 1] = H(zeros[i], zeros[i])`.

use crate::error::{Result, VouchError};
use crate::hash::{FieldHasher, PoseidonHasher};
use crate::types::{Commitment, MerkleRoot};
use ff::Field;
use halo2curves::pasta::Fp;
use serde::{Deserialize, Serialize};

/// Minimum supported tree depth
pub const MIN_TREE_DEPTH: u32 = 1;

/// Maximum supported tree depth (2^32 leaves)
pub const MAX_TREE_DEPTH: u32 = 32;

/// Depth of the reference deployment (2^20 leaves)
pub const DEFAULT_TREE_DEPTH: u32 = 20;

/// Which side of its parent a node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Circuit encoding: 1 when the node is the right child.
    pub fn as_bit(&self) -> bool {
        matches!(self, Direction::Right)
    }
}

/// One step of an authentication path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathElement {
    #[serde(with = "crate::types::field_serde")]
    pub sibling: Fp,
    /// Position of the node being authenticated, not of the sibling.
    pub direction: Direction,
}

/// Authentication path from a leaf up to the root, leaf level first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    elements: Vec<PathElement>,
}

impl MerklePath {
    pub fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn siblings(&self) -> Vec<Fp> {
        self.elements.iter().map(|e| e.sibling).collect()
    }

    pub fn direction_bits(&self) -> Vec<bool> {
        self.elements.iter().map(|e| e.direction.as_bit()).collect()
    }

    /// Leaf index encoded by the directions (bit `i` set when right child at level `i`).
    pub fn leaf_index(&self) -> u64 {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.direction.as_bit())
            .fold(0u64, |acc, (i, _)| acc | (1u64 << i))
    }

    pub fn compute_root<H: FieldHasher>(&self, leaf: Fp, hasher: &H) -> MerkleRoot {
        let root = self.elements.iter().fold(leaf, |current, e| match e.direction {
            Direction::Left => hasher.hash(current, e.sibling),
            Direction::Right => hasher.hash(e.sibling, current),
        });
        MerkleRoot::new(root)
    }
}

/// Fixed-depth append-only Merkle tree.
#[derive(Debug, Clone)]
pub struct Accumulator<H = PoseidonHasher> {
    hasher: H,
    depth: u32,
    /// `levels[0]` holds the leaves, `levels[depth]` at most the root.
    levels: Vec<Vec<Fp>>,
    /// Length = depth + 1
    zeros: Vec<Fp>,
}

impl Accumulator<PoseidonHasher> {
    pub fn new(depth: u32) -> Result<Self> {
        Self::with_hasher(depth, PoseidonHasher)
    }
}

impl<H: FieldHasher> Accumulator<H> {
    pub fn with_hasher(depth: u32, hasher: H) -> Result<Self> {
        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth) {
            return Err(VouchError::InvalidTreeDepth(depth));
        }

        let zeros = Self::compute_zero_values(&hasher, depth);
        let levels = vec![Vec::new(); depth as usize + 1];

        Ok(Self { hasher, depth, levels, zeros })
    }

    fn compute_zero_values(hasher: &H, depth: u32) -> Vec<Fp> {
        let mut zeros = Vec::with_capacity(depth as usize + 1);
        zeros.push(Fp::ZERO);
        for i in 1..=depth as usize {
            let prev = zeros[i - 1];
            zeros.push(hasher.hash(prev, prev));
        }
        zeros
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn len(&self) -> u64 {
        self.levels[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Zero value at `level` (0 = leaf level).
    pub fn zero(&self, level: u32) -> Fp {
        self.zeros[level as usize]
    }

    /// Append a commitment and return its leaf index.
    ///
    /// Fails with `TreeFull` once `2^depth` leaves are present; a failed
    /// insert leaves the tree untouched.
    pub fn insert(&mut self, commitment: Commitment) -> Result<u64> {
        if self.is_full() {
            return Err(VouchError::TreeFull { capacity: self.capacity() });
        }

        let leaf_index = self.len();
        let mut index = leaf_index as usize;
        let mut current = commitment.inner();
        self.levels[0].push(current);

        for level in 0..self.depth as usize {
            // The freshly written node is always the rightmost populated one,
            // so a left child's sibling is still empty.
            current = if index & 1 == 1 {
                self.hasher.hash(self.levels[level][index - 1], current)
            } else {
                self.hasher.hash(current, self.zeros[level])
            };
            index >>= 1;

            let parent = &mut self.levels[level + 1];
            if index < parent.len() {
                parent[index] = current;
            } else {
                parent.push(current);
            }
        }

        Ok(leaf_index)
    }

    pub fn root(&self) -> MerkleRoot {
        let top = self.levels[self.depth as usize].first().copied();
        MerkleRoot::new(top.unwrap_or(self.zeros[self.depth as usize]))
    }

    /// Authentication path for an inserted leaf.
    pub fn path_to(&self, leaf_index: u64) -> Result<MerklePath> {
        if leaf_index >= self.len() {
            return Err(VouchError::LeafNotFound);
        }

        let mut index = leaf_index as usize;
        let mut elements = Vec::with_capacity(self.depth as usize);
        for level in 0..self.depth as usize {
            let sibling = self.levels[level].get(index ^ 1).copied().unwrap_or(self.zeros[level]);
            let direction = if index & 1 == 1 { Direction::Right } else { Direction::Left };
            elements.push(PathElement { sibling, direction });
            index >>= 1;
        }

        Ok(MerklePath::new(elements))
    }

    pub fn leaf(&self, leaf_index: u64) -> Option<Commitment> {
        self.levels[0].get(leaf_index as usize).copied().map(Commitment::new)
    }

    /// Index of the first leaf equal to `commitment`.
    pub fn position(&self, commitment: &Commitment) -> Option<u64> {
        self.levels[0].iter().position(|leaf| *leaf == commitment.inner()).map(|i| i as u64)
    }

    pub fn leaves(&self) -> impl Iterator<Item = Commitment> + '_ {
        self.levels[0].iter().copied().map(Commitment::new)
    }
}
