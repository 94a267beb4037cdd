//! Ledger call contract and an in-memory ledger

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use impactledger_bindings::{AnchorRequest, AnchoredBatch};
use impactledger_merkle::MerkleRoot;

use crate::error::AnchorError;

/// External append-only ledger that records batch roots.
///
/// Implementations own their transport. Each call may be cancelled by
/// dropping the future and may be repeated; the anchorer bounds every call
/// with a timeout. Contract transports build call data and decode replies with
/// [`impactledger_bindings::abi`]; a reply that does not decode surfaces as
/// [`AnchorError::Abi`].
#[async_trait]
pub trait BatchLedger: Send + Sync {
    /// `anchorBatch`: record the triple and timestamp it
    async fn anchor_batch(&self, request: &AnchorRequest) -> Result<bool, AnchorError>;

    /// `getBatchByRoot`: look up a previously anchored triple
    async fn get_batch_by_root(&self, root: &MerkleRoot) -> Result<Option<AnchoredBatch>, AnchorError>;
}

#[async_trait]
impl<L: BatchLedger + ?Sized> BatchLedger for Arc<L> {
    async fn anchor_batch(&self, request: &AnchorRequest) -> Result<bool, AnchorError> {
        (**self).anchor_batch(request).await
    }

    async fn get_batch_by_root(&self, root: &MerkleRoot) -> Result<Option<AnchoredBatch>, AnchorError> {
        (**self).get_batch_by_root(root).await
    }
}

/// In-memory ledger for tests and dry runs.
///
/// Append-only: a root can be anchored once. Re-anchoring the identical
/// triple succeeds without changing the record; anything else is rejected.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    batches: RwLock<HashMap<MerkleRoot, AnchoredBatch>>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of anchored roots
    pub async fn len(&self) -> usize {
        self.batches.read().await.len()
    }

    /// Whether nothing has been anchored yet
    pub async fn is_empty(&self) -> bool {
        self.batches.read().await.is_empty()
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BatchLedger for MemoryLedger {
    async fn anchor_batch(&self, request: &AnchorRequest) -> Result<bool, AnchorError> {
        let mut batches = self.batches.write().await;

        if let Some(existing) = batches.get(&request.merkle_root) {
            if existing.matches(request) {
                return Ok(true);
            }
            return Err(AnchorError::Rejected(format!(
                "root {} already anchored",
                request.merkle_root
            )));
        }

        let batch = AnchoredBatch {
            batch_id: request.batch_id.clone(),
            merkle_root: request.merkle_root,
            signer_key_id: request.signer_key_id.clone(),
            timestamp: Self::now_secs(),
        };
        debug!(root = %batch.merkle_root, batch = %batch.batch_id, "memory ledger recorded batch");
        batches.insert(request.merkle_root, batch);
        Ok(true)
    }

    async fn get_batch_by_root(&self, root: &MerkleRoot) -> Result<Option<AnchoredBatch>, AnchorError> {
        Ok(self.batches.read().await.get(root).cloned())
    }
}
