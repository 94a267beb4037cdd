//! 32-byte digest type and its hex encoding

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MerkleError;

/// Digest length in bytes
pub const DIGEST_LEN: usize = 32;

/// Keccak256 digest.
///
/// Ordering is the lexicographic order of the raw bytes, which is also the
/// order of the lowercase hex encodings. The textual form is always `0x`
/// followed by 64 lowercase hex characters.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

/// Hash of one canonicalized PoD record
pub type LeafHash = Digest;

/// Top hash of a completed tree
pub type MerkleRoot = Digest;

/// Ordered leaf-to-root sibling hashes for one leaf
pub type ProofPath = Vec<Digest>;

impl Digest {
    /// Wrap raw bytes
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Consume into raw bytes
    pub const fn into_bytes(self) -> [u8; DIGEST_LEN] {
        self.0
    }

    /// Parse a hex digest, accepting an optional `0x`/`0X` prefix and either case.
    pub fn from_hex(s: &str) -> Result<Self, MerkleError> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if body.len() != DIGEST_LEN * 2 {
            return Err(MerkleError::InvalidHash(format!(
                "expected {} hex characters, got {}",
                DIGEST_LEN * 2,
                body.len()
            )));
        }

        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|e| MerkleError::InvalidHash(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }

    /// `0x`-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// First four bytes as hex, for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Digest> for [u8; DIGEST_LEN] {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Digest {
    type Err = MerkleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0x00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

    #[test]
    fn test_parse_normalizes_prefix_and_case() {
        let plain: Digest = SAMPLE.parse().unwrap();
        let upper: Digest = SAMPLE.to_uppercase().replacen("0X", "0x", 1).parse().unwrap();
        let bare: Digest = SAMPLE.trim_start_matches("0x").parse().unwrap();
        let big_prefix: Digest = format!("0X{}", &SAMPLE[2..]).parse().unwrap();

        assert_eq!(plain, upper);
        assert_eq!(plain, bare);
        assert_eq!(plain, big_prefix);
        assert_eq!(plain.to_string(), SAMPLE);
    }

    #[test]
    fn test_parse_rejects_bad_length_and_chars() {
        assert!(matches!(Digest::from_hex("0x1234"), Err(MerkleError::InvalidHash(_))));
        let bad = format!("0x{}", "zz".repeat(32));
        assert!(matches!(Digest::from_hex(&bad), Err(MerkleError::InvalidHash(_))));
    }

    #[test]
    fn test_ordering_matches_hex_ordering() {
        let a = Digest::new([0x0f; 32]);
        let b = Digest::new([0xa0; 32]);
        assert!(a < b);
        assert!(a.to_hex() < b.to_hex());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let digest: Digest = SAMPLE.parse().unwrap();
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let back: Digest = serde_json::from_str(&json.to_uppercase().replacen("0X", "0x", 1)).unwrap();
        assert_eq!(back, digest);
    }
}
