//! Inclusion proof verification

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::digest::{Digest, LeafHash, MerkleRoot, ProofPath};
use crate::error::MerkleError;
use crate::hasher::Keccak256Hasher;
use crate::record::PodRecord;

/// Replay a proof from `leaf` and return the root it reconstructs
pub fn compute_root(leaf: &LeafHash, proof: &[Digest]) -> MerkleRoot {
    proof
        .iter()
        .fold(*leaf, |running, sibling| Keccak256Hasher::hash_pair(&running, sibling))
}

/// Verify that `proof` reconstructs `root` from `leaf`.
///
/// A sibling equal to the running hash is a duplicated odd node and is
/// accepted as a normal step.
pub fn verify_proof(leaf: &LeafHash, proof: &[Digest], root: &MerkleRoot) -> bool {
    compute_root(leaf, proof) == *root
}

/// Verify hex-encoded inputs.
///
/// Prefix and case are normalized first. `Err` is returned only when an input
/// is not a 32-byte hex digest; a well-formed mismatch is `Ok(false)`.
pub fn verify_encoded<S: AsRef<str>>(
    leaf: &str,
    proof: &[S],
    root: &str,
) -> Result<bool, MerkleError> {
    let leaf = Digest::from_hex(leaf)?;
    let root = Digest::from_hex(root)?;
    let proof = proof
        .iter()
        .map(|p| Digest::from_hex(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(verify_proof(&leaf, &proof, &root))
}

/// Hash a record and verify it against a proof and root
pub fn verify_record(
    record: &PodRecord,
    proof: &[Digest],
    root: &MerkleRoot,
) -> Result<bool, MerkleError> {
    Ok(verify_proof(&record.leaf_hash()?, proof, root))
}

/// Self-contained proof handed to donors and auditors
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    /// The leaf being proven
    pub leaf_hash: LeafHash,
    /// Sibling hashes from leaf to root
    pub proof: ProofPath,
    /// Root the proof was issued against
    pub root: MerkleRoot,
}

impl MerkleProof {
    /// Check the proof against its own root
    pub fn verify(&self) -> bool {
        verify_proof(&self.leaf_hash, &self.proof, &self.root)
    }

    /// Check the proof against an independently obtained root, such as the one
    /// read back from the anchoring ledger
    pub fn verify_against(&self, anchored_root: &MerkleRoot) -> bool {
        self.root == *anchored_root && self.verify()
    }
}

/// Verify a proof bundle against an anchored root and log a mismatch.
///
/// A `false` result means the proof is invalid. It is never a pending or
/// retryable state.
pub fn audit_proof(bundle: &MerkleProof, anchored_root: &MerkleRoot) -> bool {
    let valid = bundle.verify_against(anchored_root);
    if !valid {
        warn!(
            leaf = %bundle.leaf_hash,
            claimed_root = %bundle.root,
            anchored_root = %anchored_root,
            proof_len = bundle.proof.len(),
            "Merkle proof rejected"
        );
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build_tree, MerkleTree};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_leaves(rng: &mut StdRng, count: usize) -> Vec<Digest> {
        (0..count).map(|_| Digest::new(rng.gen())).collect()
    }

    /// Replace the hex character at `pos` (after the prefix) with a different hex digit
    fn flip_char(hex: &str, pos: usize) -> String {
        let mut chars: Vec<char> = hex.chars().collect();
        let idx = 2 + pos;
        chars[idx] = if chars[idx] == '0' { '1' } else { '0' };
        chars.into_iter().collect()
    }

    fn sample_records(count: usize) -> Vec<PodRecord> {
        (0..count)
            .map(|i| {
                PodRecord::new(format!("disb-{i:04}"), format!("ben-{i:04}"), 1_717_000_000_000 + i as u64)
                    .with_gps(-1.29 + i as f64 * 0.001, 36.82)
            })
            .collect()
    }

    #[test]
    fn test_empty_proof_compares_leaf_to_root() {
        let leaf = Digest::new([9u8; 32]);
        assert!(verify_proof(&leaf, &[], &leaf));
        assert!(!verify_proof(&leaf, &[], &Digest::new([8u8; 32])));
    }

    #[test]
    fn test_tamper_any_character_fails() {
        let mut rng = StdRng::seed_from_u64(7);
        let leaves = random_leaves(&mut rng, 6);
        let (root, proofs) = build_tree(&leaves).unwrap();

        let leaf_hex = leaves[3].to_hex();
        let root_hex = root.to_hex();
        let proof_hex: Vec<String> = proofs[3].iter().map(Digest::to_hex).collect();
        assert_eq!(verify_encoded(&leaf_hex, &proof_hex, &root_hex), Ok(true));

        for pos in 0..64 {
            let bad_leaf = flip_char(&leaf_hex, pos);
            assert_eq!(verify_encoded(&bad_leaf, &proof_hex, &root_hex), Ok(false));

            let bad_root = flip_char(&root_hex, pos);
            assert_eq!(verify_encoded(&leaf_hex, &proof_hex, &bad_root), Ok(false));

            for element in 0..proof_hex.len() {
                let mut bad_proof = proof_hex.clone();
                bad_proof[element] = flip_char(&bad_proof[element], pos);
                assert_eq!(verify_encoded(&leaf_hex, &bad_proof, &root_hex), Ok(false));
            }
        }
    }

    #[test]
    fn test_single_bit_flip_in_bytes_fails() {
        let mut rng = StdRng::seed_from_u64(11);
        let leaves = random_leaves(&mut rng, 5);
        let (root, proofs) = build_tree(&leaves).unwrap();

        for byte in 0..32 {
            for bit in 0..8 {
                let mut flipped = leaves[4].into_bytes();
                flipped[byte] ^= 1 << bit;
                assert!(!verify_proof(&Digest::new(flipped), &proofs[4], &root));

                let mut flipped = root.into_bytes();
                flipped[byte] ^= 1 << bit;
                assert!(!verify_proof(&leaves[4], &proofs[4], &Digest::new(flipped)));
            }
        }
    }

    #[test]
    fn test_encoded_inputs_are_normalized() {
        let leaves = vec![Digest::new([1u8; 32]), Digest::new([2u8; 32])];
        let (root, proofs) = build_tree(&leaves).unwrap();

        let leaf = leaves[0].to_hex().to_uppercase().replacen("0X", "", 1);
        let proof = vec![proofs[0][0].to_hex().to_uppercase().replacen("0X", "0x", 1)];
        assert_eq!(verify_encoded(&leaf, &proof, &root.to_hex()), Ok(true));
    }

    #[test]
    fn test_malformed_encoding_is_an_error() {
        let root = Digest::new([1u8; 32]).to_hex();
        assert!(matches!(
            verify_encoded("0xabc", &[] as &[&str], &root),
            Err(MerkleError::InvalidHash(_))
        ));
        assert!(matches!(
            verify_encoded(&root, &["not-hex"], &root),
            Err(MerkleError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_proof_from_other_tree_fails() {
        let mut rng = StdRng::seed_from_u64(3);
        let first = random_leaves(&mut rng, 4);
        let second = random_leaves(&mut rng, 4);
        let (root_a, _) = build_tree(&first).unwrap();
        let (_, proofs_b) = build_tree(&second).unwrap();
        assert!(!verify_proof(&second[0], &proofs_b[0], &root_a));
    }

    #[test]
    fn test_round_trip_at_scale_and_record_mutation() {
        let records = sample_records(1000);
        let leaves: Vec<Digest> = records.iter().map(|r| r.leaf_hash().unwrap()).collect();
        let tree = MerkleTree::build(&leaves).unwrap();
        let root = tree.root();
        let proofs = tree.proofs();

        for (i, leaf) in leaves.iter().enumerate() {
            assert!(verify_proof(leaf, &proofs[i], &root));
        }

        let target = 421;
        assert_eq!(verify_record(&records[target], &proofs[target], &root), Ok(true));

        let original = &records[target];
        let mutated = PodRecord::new(
            original.disbursement_id(),
            "ben-9999",
            original.timestamp(),
        );
        assert_ne!(mutated.leaf_hash().unwrap(), leaves[target]);
        assert_eq!(verify_record(&mutated, &proofs[target], &root), Ok(false));
    }

    #[test]
    fn test_random_leaves_at_scale() {
        let mut rng = StdRng::seed_from_u64(1000);
        let leaves = random_leaves(&mut rng, 1000);
        let (root, proofs) = build_tree(&leaves).unwrap();
        assert!(leaves
            .iter()
            .zip(&proofs)
            .all(|(leaf, proof)| verify_proof(leaf, proof, &root)));

        let index = rng.gen_range(0..leaves.len());
        let mut mutated = leaves[index].into_bytes();
        mutated[0] ^= 0x80;
        assert!(!verify_proof(&Digest::new(mutated), &proofs[index], &root));
    }

    #[test]
    fn test_bundle_serde_and_verify() {
        let leaves = vec![Digest::new([1u8; 32]), Digest::new([2u8; 32]), Digest::new([3u8; 32])];
        let tree = MerkleTree::build(&leaves).unwrap();
        let bundle = MerkleProof {
            leaf_hash: leaves[2],
            proof: tree.proof(2).unwrap(),
            root: tree.root(),
        };
        assert!(bundle.verify());
        assert!(audit_proof(&bundle, &tree.root()));
        assert!(!audit_proof(&bundle, &Digest::new([0u8; 32])));

        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json.get("leafHash").is_some());
        let back: MerkleProof = serde_json::from_value(json).unwrap();
        assert_eq!(back, bundle);
    }
}
