use std::sync::Arc;

use scanbox_core::{IndexError, PendingBatch};
use scanbox_kv::KVStore;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::SyncError;

/// Storage key holding the pending-batch list.
pub const PENDING_KEY: &str = "localResult";

/// Batches that failed submission, persisted as one JSON array under a
/// single key.
///
/// Every mutation is a full read-modify-write of that value. Mutations go
/// through an in-flight gate so two callers can never interleave their reads
/// and writes; a lost update is impossible even when the scan session and the
/// review screen share one store.
pub struct PendingStore {
    kv: Arc<dyn KVStore>,
    key: String,
    gate: Mutex<()>,
}

/// Exclusive access to the pending list for the lifetime of the guard.
pub struct PendingTxn<'a> {
    store: &'a PendingStore,
    _guard: MutexGuard<'a, ()>,
}

impl PendingStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self::with_key(kv, PENDING_KEY)
    }

    pub fn with_key(kv: Arc<dyn KVStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            gate: Mutex::new(()),
        }
    }

    /// Wait for the gate and hold it until the returned transaction drops.
    pub async fn lock(&self) -> PendingTxn<'_> {
        PendingTxn {
            store: self,
            _guard: self.gate.lock().await,
        }
    }

    /// All pending batches, oldest first. An absent key is an empty list.
    pub async fn load(&self) -> Result<Vec<PendingBatch>, SyncError> {
        self.lock().await.read()
    }

    /// Append a batch. Returns the new number of pending batches.
    pub async fn append(&self, batch: PendingBatch) -> Result<usize, SyncError> {
        let txn = self.lock().await;
        let mut batches = txn.read()?;
        batches.push(batch);
        txn.write(&batches)?;
        Ok(batches.len())
    }

    /// Remove and return the batch at `index`. Out of range leaves the store untouched.
    pub async fn remove(&self, index: usize) -> Result<PendingBatch, SyncError> {
        let txn = self.lock().await;
        let mut batches = txn.read()?;
        IndexError::check(index, batches.len())?;
        let removed = batches.remove(index);
        txn.write(&batches)?;
        Ok(removed)
    }

    /// Replace the list with an empty one.
    pub async fn clear(&self) -> Result<(), SyncError> {
        self.lock().await.write(&[])
    }
}

impl PendingTxn<'_> {
    pub fn read(&self) -> Result<Vec<PendingBatch>, SyncError> {
        let raw = self.store.kv.get(&self.store.key)?;
        // Older clients stored a JSON null after clearing; treat it like absence.
        let batches = match raw {
            Some(raw) => serde_json::from_str::<Option<Vec<PendingBatch>>>(&raw)?,
            None => None,
        };
        Ok(batches.unwrap_or_default())
    }

    pub fn write(&self, batches: &[PendingBatch]) -> Result<(), SyncError> {
        let raw = serde_json::to_string(batches)?;
        self.store.kv.set(&self.store.key, &raw)?;
        debug!("pending store now holds {} batches", batches.len());
        Ok(())
    }
}
