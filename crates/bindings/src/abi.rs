//! Solidity ABI encoding for the `AIDProgram` calls
//!
//! Only the shapes this contract uses are covered: `bytes32`, `bool`,
//! `uint256` values that fit in a `u64`, and `string`.
//!
//! A `BatchLedger` implementation that talks to the contract over JSON-RPC
//! sends [`encode_anchor_batch`] / [`encode_get_batch_by_root`] as call data and
//! reads the replies with [`decode_anchor_batch_result`] /
//! [`decode_get_batch_by_root_result`].

use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

use impactledger_merkle::{Digest, MerkleRoot};

use crate::AnchoredBatch;

/// `anchorBatch` function signature
pub const ANCHOR_BATCH_SIGNATURE: &str = "anchorBatch(string,bytes32,string)";

/// `getBatchByRoot` function signature
pub const GET_BATCH_BY_ROOT_SIGNATURE: &str = "getBatchByRoot(bytes32)";

const WORD: usize = 32;

/// Errors decoding contract return data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Return data ended before the expected word
    #[error("return data truncated at byte {0}")]
    Truncated(usize),

    /// An offset or length word does not fit the data
    #[error("invalid offset or length at byte {0}")]
    InvalidOffset(usize),

    /// A numeric word is larger than the target type
    #[error("value at byte {0} overflows")]
    ValueOverflow(usize),

    /// A string field is not UTF-8
    #[error("string at byte {0} is not valid UTF-8")]
    InvalidUtf8(usize),

    /// A bool word is neither 0 nor 1
    #[error("invalid bool word")]
    InvalidBool,
}

/// Function selector: first four bytes of `keccak256(signature)`
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    [output[0], output[1], output[2], output[3]]
}

/// Calldata for `anchorBatch(milestoneId, merkleRoot, signerKid)`
pub fn encode_anchor_batch(batch_id: &str, merkle_root: &MerkleRoot, signer_key_id: &str) -> Vec<u8> {
    let first_tail = encode_string(batch_id);
    let second_tail = encode_string(signer_key_id);

    let head_len = 3 * WORD;
    let mut calldata = Vec::with_capacity(4 + head_len + first_tail.len() + second_tail.len());
    calldata.extend_from_slice(&selector(ANCHOR_BATCH_SIGNATURE));
    calldata.extend_from_slice(&uint_word(head_len as u64));
    calldata.extend_from_slice(merkle_root.as_bytes());
    calldata.extend_from_slice(&uint_word((head_len + first_tail.len()) as u64));
    calldata.extend_from_slice(&first_tail);
    calldata.extend_from_slice(&second_tail);
    calldata
}

/// Calldata for `getBatchByRoot(root)`
pub fn encode_get_batch_by_root(root: &MerkleRoot) -> Vec<u8> {
    let mut calldata = Vec::with_capacity(4 + WORD);
    calldata.extend_from_slice(&selector(GET_BATCH_BY_ROOT_SIGNATURE));
    calldata.extend_from_slice(root.as_bytes());
    calldata
}

/// Decode the `bool` returned by `anchorBatch`
pub fn decode_anchor_batch_result(data: &[u8]) -> Result<bool, AbiError> {
    let word = read_word(data, 0)?;
    if word[..WORD - 1].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidBool);
    }
    match word[WORD - 1] {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(AbiError::InvalidBool),
    }
}

/// Decode the struct returned by `getBatchByRoot`.
///
/// The contract returns a zeroed struct for an unknown root, which maps to
/// `None`.
pub fn decode_get_batch_by_root_result(data: &[u8]) -> Result<Option<AnchoredBatch>, AbiError> {
    let tuple = read_usize(data, 0)?;

    let batch_id = read_string(data, tuple, tuple)?;
    let merkle_root = Digest::new(*read_word(data, tuple + WORD)?);
    let signer_key_id = read_string(data, tuple, tuple + 2 * WORD)?;
    let timestamp = read_u64(data, tuple + 3 * WORD)?;

    if batch_id.is_empty() && timestamp == 0 {
        return Ok(None);
    }

    Ok(Some(AnchoredBatch {
        batch_id,
        merkle_root,
        signer_key_id,
        timestamp,
    }))
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Length word followed by the bytes right-padded to a word boundary
fn encode_string(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&uint_word(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8; WORD], AbiError> {
    at.checked_add(WORD)
        .and_then(|end| data.get(at..end))
        .and_then(|slice| slice.try_into().ok())
        .ok_or(AbiError::Truncated(at))
}

fn read_u64(data: &[u8], at: usize) -> Result<u64, AbiError> {
    let word = read_word(data, at)?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(AbiError::ValueOverflow(at));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(tail))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize, AbiError> {
    let value = read_u64(data, at)?;
    usize::try_from(value)
        .ok()
        .filter(|v| *v <= data.len())
        .ok_or(AbiError::InvalidOffset(at))
}

/// Read a string whose offset word sits at `head`, relative to `base`
fn read_string(data: &[u8], base: usize, head: usize) -> Result<String, AbiError> {
    let start = base
        .checked_add(read_usize(data, head)?)
        .ok_or(AbiError::InvalidOffset(head))?;
    let len = read_usize(data, start)?;
    let body = start + WORD;
    let bytes = body
        .checked_add(len)
        .and_then(|end| data.get(body..end))
        .ok_or(AbiError::InvalidOffset(start))?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Return data as the contract would produce it
    fn encode_batch_result(batch: &AnchoredBatch) -> Vec<u8> {
        let first_tail = encode_string(&batch.batch_id);
        let second_tail = encode_string(&batch.signer_key_id);
        let head_len = 4 * WORD;

        let mut data = Vec::new();
        data.extend_from_slice(&uint_word(WORD as u64));
        data.extend_from_slice(&uint_word(head_len as u64));
        data.extend_from_slice(batch.merkle_root.as_bytes());
        data.extend_from_slice(&uint_word((head_len + first_tail.len()) as u64));
        data.extend_from_slice(&uint_word(batch.timestamp));
        data.extend_from_slice(&first_tail);
        data.extend_from_slice(&second_tail);
        data
    }

    #[test]
    fn test_known_selector() {
        // transfer(address,uint256)
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn test_anchor_batch_layout() {
        let root = Digest::new([0xab; 32]);
        let calldata = encode_anchor_batch("milestone-42", &root, "kms/key-7");

        assert_eq!(&calldata[..4], &selector(ANCHOR_BATCH_SIGNATURE));
        let body = &calldata[4..];
        // head: offset(0x60), root, offset(0x60 + 0x40)
        assert_eq!(read_u64(body, 0).unwrap(), 0x60);
        assert_eq!(read_word(body, WORD).unwrap(), root.as_bytes());
        assert_eq!(read_u64(body, 2 * WORD).unwrap(), 0xa0);
        assert_eq!(read_string(body, 0, 0).unwrap(), "milestone-42");
        assert_eq!(read_string(body, 0, 2 * WORD).unwrap(), "kms/key-7");
        assert_eq!(body.len() % WORD, 0);
    }

    #[test]
    fn test_long_string_spans_words() {
        let id = "m".repeat(40);
        let calldata = encode_anchor_batch(&id, &Digest::default(), "");
        let body = &calldata[4..];
        assert_eq!(read_u64(body, 2 * WORD).unwrap(), (3 * WORD + 3 * WORD) as u64);
        assert_eq!(read_string(body, 0, 0).unwrap(), id);
        assert_eq!(read_string(body, 0, 2 * WORD).unwrap(), "");
    }

    #[test]
    fn test_get_batch_by_root_calldata() {
        let root = Digest::new([7u8; 32]);
        let calldata = encode_get_batch_by_root(&root);
        assert_eq!(calldata.len(), 36);
        assert_eq!(&calldata[4..], root.as_bytes());
    }

    #[test]
    fn test_decode_batch_result() {
        let batch = AnchoredBatch {
            batch_id: "milestone-42".to_string(),
            merkle_root: Digest::new([0x11; 32]),
            signer_key_id: "kms/key-7".to_string(),
            timestamp: 1_717_000_000,
        };
        let decoded = decode_get_batch_by_root_result(&encode_batch_result(&batch)).unwrap();
        assert_eq!(decoded, Some(batch));
    }

    #[test]
    fn test_decode_unknown_root_is_none() {
        let empty = AnchoredBatch {
            batch_id: String::new(),
            merkle_root: Digest::default(),
            signer_key_id: String::new(),
            timestamp: 0,
        };
        assert_eq!(decode_get_batch_by_root_result(&encode_batch_result(&empty)), Ok(None));
    }

    #[test]
    fn test_decode_rejects_truncated_and_bad_offsets() {
        let batch = AnchoredBatch {
            batch_id: "m".to_string(),
            merkle_root: Digest::default(),
            signer_key_id: "k".to_string(),
            timestamp: 1,
        };
        let data = encode_batch_result(&batch);
        assert!(decode_get_batch_by_root_result(&data[..data.len() - 40]).is_err());

        let mut bad = data.clone();
        bad[WORD - 1] = 0xff;
        assert!(decode_get_batch_by_root_result(&bad).is_err());
    }

    #[test]
    fn test_decode_bool() {
        assert_eq!(decode_anchor_batch_result(&uint_word(1)), Ok(true));
        assert_eq!(decode_anchor_batch_result(&uint_word(0)), Ok(false));
        assert_eq!(decode_anchor_batch_result(&uint_word(2)), Err(AbiError::InvalidBool));
        assert_eq!(decode_anchor_batch_result(&[0u8; 8]), Err(AbiError::Truncated(0)));
    }
}
