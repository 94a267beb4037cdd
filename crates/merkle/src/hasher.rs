//! Keccak256 hasher for leaves and internal nodes

use tiny_keccak::{Hasher, Keccak};

use crate::digest::Digest;

/// Keccak256 hasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hasher;

impl Keccak256Hasher {
    /// Hash a single value
    pub fn hash(data: &[u8]) -> Digest {
        let mut hasher = Keccak::v256();
        hasher.update(data);
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        Digest::new(output)
    }

    /// Hash a sibling pair into its parent.
    ///
    /// The two digests are ordered by their raw bytes before concatenation, so
    /// `hash_pair(a, b) == hash_pair(b, a)`. Proofs therefore carry no
    /// left/right flags. Pairing a node with itself is a valid step.
    pub fn hash_pair(a: &Digest, b: &Digest) -> Digest {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = Keccak::v256();
        hasher.update(low.as_bytes());
        hasher.update(high.as_bytes());
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        Digest::new(output)
    }
}
