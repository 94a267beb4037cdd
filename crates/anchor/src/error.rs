//! Anchoring failures
//!
//! Kept apart from [`impactledger_merkle::MerkleError`]: a failed submission
//! says nothing about whether a proof is valid.

use impactledger_bindings::AbiError;
use impactledger_merkle::MerkleRoot;
use thiserror::Error;

/// Errors raised by the anchoring adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    /// The ledger could not be reached or answered with a transport fault
    #[error("ledger transport failed: {0}")]
    Transport(String),

    /// A ledger call did not finish within the configured timeout
    #[error("ledger call {0} timed out")]
    Timeout(String),

    /// The ledger refused the request
    #[error("ledger rejected the batch: {0}")]
    Rejected(String),

    /// The root is already anchored under a different batch or signer
    #[error("root {root} is already anchored for batch {existing_batch_id}")]
    Conflict {
        /// Root being anchored
        root: MerkleRoot,
        /// Batch the ledger already holds for that root
        existing_batch_id: String,
    },

    /// The request can never succeed as given
    #[error("invalid anchoring request: {0}")]
    InvalidRequest(String),

    /// No signer identity could be obtained
    #[error("signer unavailable: {0}")]
    Signer(String),

    /// Ledger return data could not be decoded
    #[error("undecodable ledger response: {0}")]
    Abi(#[from] AbiError),
}

impl AnchorError {
    /// Whether the same call may succeed if repeated unchanged
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}
