//! Sorted-pair binary Merkle tree over an ordered batch of leaves

use crate::digest::{Digest, LeafHash, MerkleRoot, ProofPath};
use crate::error::MerkleError;
use crate::hasher::Keccak256Hasher;

/// Binary Merkle tree built bottom-up from an ordered leaf sequence.
///
/// `levels[0]` holds the leaves in caller order and the last level holds the
/// root alone. On a level of odd length the last node is paired with itself;
/// it is never promoted unchanged. Parents are computed with
/// [`Keccak256Hasher::hash_pair`], so the tree is not positional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree from leaf hashes. Leaf order defines each leaf's index.
    pub fn build(leaves: &[LeafHash]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyBatch);
        }

        let mut levels = vec![leaves.to_vec()];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = current
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    Keccak256Hasher::hash_pair(left, right)
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Get the root hash
    pub fn root(&self) -> MerkleRoot {
        // `build` guarantees at least one level with exactly one node at the top.
        self.levels[self.levels.len() - 1][0]
    }

    /// Leaves in insertion order
    pub fn leaves(&self) -> &[LeafHash] {
        &self.levels[0]
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// Always false; an empty tree cannot be built
    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Number of hashing levels above the leaves, which is also the length of
    /// every proof
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Generate the proof for the leaf at `index`.
    ///
    /// At each level the sibling of the node covering the leaf is recorded.
    /// A node without a right neighbour was paired with itself, so its own
    /// hash is the sibling.
    pub fn proof(&self, index: usize) -> Result<ProofPath, MerkleError> {
        if index >= self.len() {
            return Err(MerkleError::LeafIndexOutOfRange { index, len: self.len() });
        }
        Ok(self.path(index))
    }

    /// Proofs for every leaf, indexed by leaf index
    pub fn proofs(&self) -> Vec<ProofPath> {
        (0..self.len()).map(|index| self.path(index)).collect()
    }

    fn path(&self, index: usize) -> ProofPath {
        let mut siblings = Vec::with_capacity(self.depth());
        let mut position = index;
        for level in &self.levels[..self.depth()] {
            let sibling = position ^ 1;
            siblings.push(*level.get(sibling).unwrap_or(&level[position]));
            position /= 2;
        }
        siblings
    }
}

/// Build a tree and hand back its root and one proof per leaf.
///
/// `proofs[i]` belongs to `leaves[i]`. The tree itself is dropped.
pub fn build_tree(leaves: &[LeafHash]) -> Result<(MerkleRoot, Vec<ProofPath>), MerkleError> {
    let tree = MerkleTree::build(leaves)?;
    Ok((tree.root(), tree.proofs()))
}
