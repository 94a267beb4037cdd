//! Batching PoD records into a sealed, provable tree

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::digest::{LeafHash, MerkleRoot, ProofPath};
use crate::error::MerkleError;
use crate::proof::MerkleProof;
use crate::record::{hash_fields, PodRecord};
use crate::tree::MerkleTree;

/// Ordered collection of leaves for one milestone or batch
#[derive(Clone, Debug, Default)]
pub struct PodBatch {
    batch_id: String,
    leaves: Vec<LeafHash>,
}

impl PodBatch {
    /// Start an empty batch
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            leaves: Vec::new(),
        }
    }

    /// Batch identifier
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Hash and append a record, returning its leaf index
    pub fn push_record(&mut self, record: &PodRecord) -> Result<usize, MerkleError> {
        let leaf = record.leaf_hash()?;
        Ok(self.push_leaf(leaf))
    }

    /// Hash and append a raw field set, returning its leaf index
    pub fn push_fields(&mut self, fields: &Map<String, Value>) -> Result<usize, MerkleError> {
        let leaf = hash_fields(fields)?;
        Ok(self.push_leaf(leaf))
    }

    /// Append a leaf hash computed elsewhere, e.g. on the capture device
    pub fn push_leaf(&mut self, leaf: LeafHash) -> usize {
        self.leaves.push(leaf);
        debug!(batch = %self.batch_id, index = self.leaves.len() - 1, leaf = %leaf, "leaf added");
        self.leaves.len() - 1
    }

    /// Number of leaves collected so far
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether no leaf has been added
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Build the tree. An empty batch cannot be sealed and must not be anchored.
    pub fn seal(self) -> Result<SealedBatch, MerkleError> {
        let tree = MerkleTree::build(&self.leaves)?;
        let root = tree.root();
        let proofs = tree.proofs();

        info!(
            batch = %self.batch_id,
            leaves = self.leaves.len(),
            depth = tree.depth(),
            root = %root,
            "sealed PoD batch"
        );

        Ok(SealedBatch {
            batch_id: self.batch_id,
            leaves: self.leaves,
            root,
            proofs,
        })
    }
}

/// A batch whose root is final. Anchoring can be retried against it any
/// number of times without rebuilding the tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedBatch {
    batch_id: String,
    leaves: Vec<LeafHash>,
    root: MerkleRoot,
    proofs: Vec<ProofPath>,
}

impl SealedBatch {
    /// Batch identifier
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Merkle root of the batch
    pub fn root(&self) -> MerkleRoot {
        self.root
    }

    /// Leaves in index order
    pub fn leaves(&self) -> &[LeafHash] {
        &self.leaves
    }

    /// Proofs in leaf index order
    pub fn proofs(&self) -> &[ProofPath] {
        &self.proofs
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Always false for a sealed batch
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Position of a leaf in the batch
    pub fn index_of(&self, leaf: &LeafHash) -> Option<usize> {
        self.leaves.iter().position(|l| l == leaf)
    }

    /// Self-contained proof for the leaf at `index`
    pub fn proof_bundle(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        let (leaf, proof) = self
            .leaves
            .get(index)
            .zip(self.proofs.get(index))
            .ok_or(MerkleError::LeafIndexOutOfRange {
                index,
                len: self.leaves.len(),
            })?;

        Ok(MerkleProof {
            leaf_hash: *leaf,
            proof: proof.clone(),
            root: self.root,
        })
    }

    /// All proof bundles in leaf index order
    pub fn proof_bundles(&self) -> Vec<MerkleProof> {
        self.leaves
            .iter()
            .zip(&self.proofs)
            .map(|(leaf, proof)| MerkleProof {
                leaf_hash: *leaf,
                proof: proof.clone(),
                root: self.root,
            })
            .collect()
    }

    /// The value handed to the anchoring adapter
    pub fn commitment(&self) -> BatchCommitment {
        BatchCommitment {
            batch_id: self.batch_id.clone(),
            merkle_root: self.root,
            leaf_count: self.leaves.len(),
        }
    }
}

/// Finalized batch key and root, ready to be anchored
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCommitment {
    /// Milestone or batch identifier
    pub batch_id: String,
    /// Root of the sealed tree
    pub merkle_root: MerkleRoot,
    /// Number of leaves committed
    pub leaf_count: usize,
}
