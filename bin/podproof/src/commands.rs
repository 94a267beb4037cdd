//! Subcommand implementations

use anyhow::{bail, ensure, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use impactledger_anchor::{
    AnchorConfig, BatchAnchorer, MemoryLedger, SignerIdentity, StaticSigner, Verification,
};
use impactledger_bindings::AnchorRequest;
use impactledger_merkle::{audit_proof, hash_json, Digest, LeafHash, MerkleProof, MerkleRoot, SealedBatch};

use crate::input::BatchInput;

/// Output of `build`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildOutput {
    pub(crate) batch_id: String,
    pub(crate) merkle_root: MerkleRoot,
    pub(crate) leaf_count: usize,
    pub(crate) proofs: Vec<MerkleProof>,
}

impl From<&SealedBatch> for BuildOutput {
    fn from(sealed: &SealedBatch) -> Self {
        Self {
            batch_id: sealed.batch_id().to_string(),
            merkle_root: sealed.root(),
            leaf_count: sealed.len(),
            proofs: sealed.proof_bundles(),
        }
    }
}

/// Output of `anchor`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnchorOutput {
    pub(crate) batch_id: String,
    pub(crate) merkle_root: MerkleRoot,
    pub(crate) signer_key_id: String,
    pub(crate) timestamp: u64,
    pub(crate) newly_anchored: bool,
    pub(crate) contract_address: String,
    pub(crate) chain_id: u64,
    pub(crate) calldata: String,
}

/// Leaf hash of one record, or of every record in an array
pub(crate) fn hash(value: &Value) -> Result<Vec<LeafHash>> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| hash_json(item).with_context(|| format!("record {i} rejected")))
            .collect(),
        other => Ok(vec![hash_json(other)?]),
    }
}

/// Seal the input into a batch
pub(crate) fn build(batch_id: &str, input: BatchInput) -> Result<SealedBatch> {
    ensure!(!batch_id.trim().is_empty(), "batch id must not be empty");
    let sealed = input.into_batch(batch_id)?.seal()?;
    Ok(sealed)
}

/// Check an inclusion proof.
///
/// With a bundle, `leaf` replaces the bundle's leaf and `root` is the root the
/// bundle is checked against. Without one, all three parts are required.
pub(crate) fn verify(
    leaf: Option<LeafHash>,
    proof: &[String],
    root: Option<&str>,
    bundle: Option<MerkleProof>,
) -> Result<bool> {
    let anchored_root = root.map(Digest::from_hex).transpose()?;

    let bundle = match bundle {
        Some(mut bundle) => {
            if let Some(leaf) = leaf {
                bundle.leaf_hash = leaf;
            }
            bundle
        }
        None => {
            let Some(leaf_hash) = leaf else {
                bail!("--leaf or --record is required without --bundle");
            };
            let Some(root) = anchored_root else {
                bail!("--root is required without --bundle");
            };
            let proof = proof
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| Digest::from_hex(s))
                .collect::<Result<Vec<_>, _>>()?;
            MerkleProof { leaf_hash, proof, root }
        }
    };

    Ok(audit_proof(&bundle, &anchored_root.unwrap_or(bundle.root)))
}

/// Signer from the command line, falling back to configuration
pub(crate) fn signer(flag: Option<String>, config: &AnchorConfig) -> Result<StaticSigner> {
    match flag {
        Some(key_id) => Ok(StaticSigner::new(key_id)),
        None => Ok(StaticSigner::from_config(config)?),
    }
}

/// Hex calldata for `anchorBatch`
pub(crate) fn calldata(batch_id: &str, root: &str, signer: &dyn SignerIdentity) -> Result<String> {
    ensure!(!batch_id.trim().is_empty(), "batch id must not be empty");
    let request = AnchorRequest {
        batch_id: batch_id.to_string(),
        merkle_root: Digest::from_hex(root)?,
        signer_key_id: signer.key_id()?,
    };
    Ok(format!("0x{}", hex::encode(request.calldata())))
}

/// Anchor a sealed batch against an in-memory ledger and confirm every proof
/// against the anchored root
pub(crate) async fn anchor_dry_run(
    sealed: &SealedBatch,
    signer: &dyn SignerIdentity,
    config: AnchorConfig,
) -> Result<AnchorOutput> {
    let contract_address = config.contract_address.clone();
    let chain_id = config.chain_id;
    let anchorer = BatchAnchorer::new(MemoryLedger::new(), config);

    let receipt = anchorer.anchor(&sealed.commitment(), signer).await?;

    for bundle in sealed.proof_bundles() {
        match anchorer.confirm(&bundle).await? {
            Verification::Verified(_) => {}
            other => bail!("proof for leaf {} failed confirmation: {other:?}", bundle.leaf_hash),
        }
    }
    info!("      ✓ {} proofs confirmed against the anchored root", sealed.len());

    let batch = receipt.batch;
    let request = AnchorRequest {
        batch_id: batch.batch_id.clone(),
        merkle_root: batch.merkle_root,
        signer_key_id: batch.signer_key_id.clone(),
    };

    Ok(AnchorOutput {
        calldata: format!("0x{}", hex::encode(request.calldata())),
        batch_id: batch.batch_id,
        merkle_root: batch.merkle_root,
        signer_key_id: batch.signer_key_id,
        timestamp: batch.timestamp,
        newly_anchored: receipt.newly_anchored,
        contract_address,
        chain_id,
    })
}
