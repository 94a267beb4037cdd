//! Error types for the integrity core

use thiserror::Error;

/// Errors raised while hashing records or building trees.
///
/// A proof that does not reconstruct the expected root is not an error; the
/// verifier returns `false` for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// A required record field is missing or empty, or a value cannot be
    /// serialized canonically
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// No leaves were supplied to the builder
    #[error("cannot build a Merkle tree from an empty batch")]
    EmptyBatch,

    /// A textual digest is not 32 bytes of hex
    #[error("invalid hash encoding: {0}")]
    InvalidHash(String),

    /// A proof was requested for a leaf the tree does not have
    #[error("leaf index {index} out of range for batch of {len}")]
    LeafIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of leaves in the tree
        len: usize,
    },
}
