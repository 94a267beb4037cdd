//! Anchoring logic

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use impactledger_bindings::{AnchorRequest, AnchoredBatch};
use impactledger_merkle::{audit_proof, BatchCommitment, MerkleProof, MerkleRoot};

use crate::config::AnchorConfig;
use crate::error::AnchorError;
use crate::ledger::BatchLedger;
use crate::signer::SignerIdentity;

/// Outcome of a successful anchoring call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorReceipt {
    /// The triple as the ledger holds it
    pub batch: AnchoredBatch,
    /// False when the ledger already held this exact triple
    pub newly_anchored: bool,
}

/// Result of checking a proof against the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The proof reconstructs a root the ledger has anchored
    Verified(AnchoredBatch),
    /// The ledger has no record of the proof's root
    NotAnchored,
    /// The proof does not reconstruct its root
    Invalid,
}

/// Submits sealed batch roots to a ledger and confirms proofs against it
#[derive(Debug)]
pub struct BatchAnchorer<L> {
    ledger: L,
    config: AnchorConfig,
}

impl<L: BatchLedger> BatchAnchorer<L> {
    /// Create a new anchorer
    pub fn new(ledger: L, config: AnchorConfig) -> Self {
        Self { ledger, config }
    }

    /// The underlying ledger
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Anchor a sealed batch under the signer's key identifier.
    ///
    /// Safe to repeat: if the ledger already holds the same triple the stored
    /// record is returned, and if it holds the root under another batch or
    /// signer the call fails with [`AnchorError::Conflict`].
    pub async fn anchor(
        &self,
        commitment: &BatchCommitment,
        signer: &dyn SignerIdentity,
    ) -> Result<AnchorReceipt, AnchorError> {
        if commitment.batch_id.trim().is_empty() {
            return Err(AnchorError::InvalidRequest("batch id must not be empty".to_string()));
        }
        if commitment.leaf_count == 0 {
            return Err(AnchorError::InvalidRequest("refusing to anchor an empty batch".to_string()));
        }

        let request = AnchorRequest::new(commitment, signer.key_id()?);
        let root = request.merkle_root;

        info!("→ Anchoring batch {}:", request.batch_id);
        info!("      root:   {}", root);
        info!("      leaves: {}", commitment.leaf_count);
        info!("      signer: {}", request.signer_key_id);

        if let Some(existing) = self.lookup(&root).await? {
            return if existing.matches(&request) {
                info!("      ✓ Already anchored at {}", existing.timestamp);
                Ok(AnchorReceipt { batch: existing, newly_anchored: false })
            } else {
                Err(conflict(&root, existing))
            };
        }

        let ledger = &self.ledger;
        let submission = &request;
        let submitted = AtomicBool::new(false);
        let submitted = &submitted;
        let accepted = self
            .call("anchorBatch", move || async move {
                // A submission that timed out may still have landed
                if submitted.swap(true, Ordering::SeqCst)
                    && ledger.get_batch_by_root(&submission.merkle_root).await?.is_some()
                {
                    return Ok(true);
                }
                ledger.anchor_batch(submission).await
            })
            .await?;
        if !accepted {
            return Err(AnchorError::Rejected(format!("anchorBatch returned false for {root}")));
        }

        match self.lookup(&root).await? {
            Some(batch) if batch.matches(&request) => {
                info!("      ✓ Anchored at {}", batch.timestamp);
                Ok(AnchorReceipt { batch, newly_anchored: true })
            }
            Some(other) => Err(conflict(&root, other)),
            None => Err(AnchorError::Transport(format!(
                "root {root} not visible after anchoring"
            ))),
        }
    }

    /// Look up the anchored triple for a root
    pub async fn lookup(&self, root: &MerkleRoot) -> Result<Option<AnchoredBatch>, AnchorError> {
        self.call("getBatchByRoot", || self.ledger.get_batch_by_root(root))
            .await
    }

    /// Check a proof bundle against the ledger.
    ///
    /// Ledger failures are returned as errors and never reported as an
    /// invalid proof.
    pub async fn confirm(&self, bundle: &MerkleProof) -> Result<Verification, AnchorError> {
        let Some(anchored) = self.lookup(&bundle.root).await? else {
            warn!(root = %bundle.root, "proof root has not been anchored");
            return Ok(Verification::NotAnchored);
        };

        if audit_proof(bundle, &anchored.merkle_root) {
            Ok(Verification::Verified(anchored))
        } else {
            Ok(Verification::Invalid)
        }
    }

    /// Run a ledger call under the per-call timeout, repeating it while the
    /// failure is retryable and attempts remain
    async fn call<T, F, Fut>(&self, name: &str, mut op: F) -> Result<T, AnchorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AnchorError>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = tokio::time::timeout(self.config.call_timeout(), op())
                .await
                .unwrap_or_else(|_| Err(AnchorError::Timeout(name.to_string())));

            match result {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("{} attempt {}/{} failed: {}", name, attempt, attempts, e);
                }
                other => return other,
            }
        }
    }
}

fn conflict(root: &MerkleRoot, existing: AnchoredBatch) -> AnchorError {
    AnchorError::Conflict {
        root: *root,
        existing_batch_id: existing.batch_id,
    }
}
