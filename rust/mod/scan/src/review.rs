use std::sync::Arc;

use scanbox_client::Submitter;
use scanbox_core::{IndexError, PendingBatch};
use tracing::{info, warn};

use crate::error::SyncError;
use crate::store::PendingStore;

/// Review of locally kept batches: list, resend, delete, clear.
///
/// Confirmation prompts are the caller's job; every method here acts
/// immediately.
pub struct PendingReview {
    store: Arc<PendingStore>,
    submitter: Arc<dyn Submitter>,
}

impl PendingReview {
    pub fn new(store: Arc<PendingStore>, submitter: Arc<dyn Submitter>) -> Self {
        Self { store, submitter }
    }

    pub async fn load(&self) -> Result<Vec<PendingBatch>, SyncError> {
        self.store.load().await
    }

    /// Submit the batch at `index` again and drop it from the store once the
    /// service accepts it. On failure the store is unchanged.
    ///
    /// The store gate is held across the submission, so the entry cannot be
    /// moved by another mutation between sending it and removing it.
    pub async fn resend(&self, index: usize) -> Result<PendingBatch, SyncError> {
        let txn = self.store.lock().await;
        let mut batches = txn.read()?;
        IndexError::check(index, batches.len())?;

        if let Err(e) = self.submitter.submit(&batches[index].data).await {
            warn!("resend of pending batch {} failed: {}", index, e);
            return Err(e.into());
        }

        let sent = batches.remove(index);
        txn.write(&batches)?;
        info!(
            "resent {} codes saved at {}; {} batches still pending",
            sent.data.len(),
            sent.ts,
            batches.len()
        );
        Ok(sent)
    }

    pub async fn delete(&self, index: usize) -> Result<PendingBatch, SyncError> {
        let removed = self.store.remove(index).await?;
        info!("deleted pending batch saved at {}", removed.ts);
        Ok(removed)
    }

    pub async fn clear_all(&self) -> Result<(), SyncError> {
        self.store.clear().await?;
        info!("cleared all pending batches");
        Ok(())
    }
}
