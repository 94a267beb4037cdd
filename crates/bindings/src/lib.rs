//! Contract bindings
//!
//! Interface types for the `AIDProgram` anchoring contract, defined by hand:
//!
//! ```text
//! anchorBatch(string milestoneId, bytes32 merkleRoot, string signerKid) returns (bool)
//! getBatchByRoot(bytes32 root) returns ((string, bytes32, string, uint256))
//! ```

use serde::{Deserialize, Serialize};

use impactledger_merkle::{BatchCommitment, MerkleRoot};

pub mod abi;

pub use abi::AbiError;

/// Request to record a batch root on the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRequest {
    /// Milestone or batch identifier (`milestoneId` on chain)
    pub batch_id: String,
    /// Root of the sealed batch
    pub merkle_root: MerkleRoot,
    /// Key identifier of the signer (`signerKid` on chain)
    pub signer_key_id: String,
}

impl AnchorRequest {
    /// Pair a sealed batch with the signer that vouches for it
    pub fn new(commitment: &BatchCommitment, signer_key_id: impl Into<String>) -> Self {
        Self {
            batch_id: commitment.batch_id.clone(),
            merkle_root: commitment.merkle_root,
            signer_key_id: signer_key_id.into(),
        }
    }

    /// ABI calldata for `anchorBatch`
    pub fn calldata(&self) -> Vec<u8> {
        abi::encode_anchor_batch(&self.batch_id, &self.merkle_root, &self.signer_key_id)
    }
}

/// A batch as recorded by the ledger (`AIDProgram.Batch`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoredBatch {
    /// Milestone or batch identifier
    pub batch_id: String,
    /// Anchored root
    pub merkle_root: MerkleRoot,
    /// Key identifier of the signer
    pub signer_key_id: String,
    /// Ledger timestamp, seconds since the Unix epoch
    pub timestamp: u64,
}

impl AnchoredBatch {
    /// Whether this record anchors the same triple as `request`
    pub fn matches(&self, request: &AnchorRequest) -> bool {
        self.batch_id == request.batch_id
            && self.merkle_root == request.merkle_root
            && self.signer_key_id == request.signer_key_id
    }
}
