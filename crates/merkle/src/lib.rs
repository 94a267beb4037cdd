//! Integrity core for proof-of-delivery batches
//!
//! - Canonical hashing of PoD records into Keccak256 leaves
//! - Sorted-pair binary Merkle trees with odd-node duplication
//! - Inclusion proofs that any holder of a leaf, its proof and the anchored
//!   root can check independently
//!
//! Everything here is pure: no I/O, no shared state, safe to call from many
//! threads at once.

mod batch;
mod digest;
mod error;
mod hasher;
mod proof;
mod record;
mod tree;

pub use batch::{BatchCommitment, PodBatch, SealedBatch};
pub use digest::{Digest, LeafHash, MerkleRoot, ProofPath, DIGEST_LEN};
pub use error::MerkleError;
pub use hasher::Keccak256Hasher;
pub use proof::{audit_proof, compute_root, verify_encoded, verify_proof, verify_record, MerkleProof};
pub use record::{canonical_json_string, hash_fields, hash_json, PodRecord, BENEFICIARY_ID, DISBURSEMENT_ID};
pub use tree::{build_tree, MerkleTree};
