use std::sync::Arc;

use scanbox_client::Submitter;
use scanbox_core::{PendingBatch, ScanBatch, ScannedCode};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::store::PendingStore;

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// Where a save action stands.
///
/// ```text
/// Idle → Submitting → Idle                    (accepted, batch cleared)
///                   → AwaitingConfirmation    (failed)
///                         → Idle              (saved locally / declined / abandoned)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Submitting,
    AwaitingConfirmation { reason: String },
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::AwaitingConfirmation { .. } => "awaiting confirmation",
        }
    }
}

/// What happens to the session batch after a failed submission.
///
/// Both flags default to `false`: the batch stays on screen whether or not it
/// was kept locally, so the operator decides when to clear it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Clear the batch once it has been written to the pending store.
    pub clear_on_local_save: bool,
    /// Clear the batch when the operator declines local persistence.
    pub clear_on_decline: bool,
}

/// Result of [`SyncWorkflow::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The service accepted `count` codes; the batch was cleared.
    Submitted { count: usize },
    /// Submission failed; call `confirm_local_save` or `decline`.
    NeedsConfirmation { reason: String },
}

// ---------------------------------------------------------------------------
// SyncWorkflow
// ---------------------------------------------------------------------------

/// One scan session: the batch being accumulated plus the save state machine.
///
/// The workflow owns its batch outright. Nothing else can observe or mutate it
/// except through these methods, and edits are refused while a save is
/// unresolved.
pub struct SyncWorkflow {
    batch: ScanBatch,
    state: SyncState,
    policy: FailurePolicy,
    submitter: Arc<dyn Submitter>,
    store: Arc<PendingStore>,
}

impl SyncWorkflow {
    pub fn new(
        submitter: Arc<dyn Submitter>,
        store: Arc<PendingStore>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            batch: ScanBatch::new(),
            state: SyncState::Idle,
            policy,
            submitter,
            store,
        }
    }

    pub fn batch(&self) -> &ScanBatch {
        &self.batch
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Record a scanned code. Returns `false` for a duplicate.
    pub fn scan(&mut self, code: impl Into<ScannedCode>) -> Result<bool, SyncError> {
        self.expect_idle("scan")?;
        let code = code.into();
        let added = self.batch.append(code.clone());
        debug!(added, "scanned {}", code);
        Ok(added)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<ScannedCode, SyncError> {
        self.expect_idle("remove a code")?;
        Ok(self.batch.remove_at(index)?)
    }

    pub fn clear(&mut self) -> Result<(), SyncError> {
        self.expect_idle("clear")?;
        self.batch.clear();
        Ok(())
    }

    /// Submit the batch.
    ///
    /// On success the batch is cleared. On failure the workflow parks in
    /// `AwaitingConfirmation` and the batch is left untouched.
    pub async fn save(&mut self) -> Result<SaveOutcome, SyncError> {
        self.expect_idle("save")?;
        if self.batch.is_empty() {
            return Err(SyncError::EmptyBatch);
        }

        self.state = SyncState::Submitting;
        let result = self.submitter.submit(&self.batch).await;

        match result {
            Ok(()) => {
                let count = self.batch.len();
                self.batch.clear();
                self.state = SyncState::Idle;
                info!("submitted {} codes", count);
                Ok(SaveOutcome::Submitted { count })
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("submission failed, awaiting confirmation: {}", reason);
                self.state = SyncState::AwaitingConfirmation {
                    reason: reason.clone(),
                };
                Ok(SaveOutcome::NeedsConfirmation { reason })
            }
        }
    }

    /// Keep the failed batch in the pending store, stamped with the current time.
    ///
    /// If the store cannot be written the workflow stays in
    /// `AwaitingConfirmation`, so the caller may retry or decline.
    pub async fn confirm_local_save(&mut self) -> Result<PendingBatch, SyncError> {
        self.expect_awaiting("save locally")?;

        let pending = PendingBatch::now(self.batch.clone());
        let total = self.store.append(pending.clone()).await?;
        info!(
            "kept {} codes locally ({} pending batches)",
            pending.data.len(),
            total
        );

        if self.policy.clear_on_local_save {
            self.batch.clear();
        }
        self.state = SyncState::Idle;
        Ok(pending)
    }

    /// Drop the failed save without persisting anything.
    pub fn decline(&mut self) -> Result<(), SyncError> {
        self.expect_awaiting("decline")?;
        if self.policy.clear_on_decline {
            self.batch.clear();
        }
        self.state = SyncState::Idle;
        debug!("local save declined");
        Ok(())
    }

    /// Leave `AwaitingConfirmation` without persisting anything and without
    /// applying the failure policy. The batch is kept as is.
    ///
    /// Used when a local save cannot complete, so codes that reached neither
    /// the service nor the store are never cleared.
    pub fn abandon(&mut self) -> Result<(), SyncError> {
        self.expect_awaiting("abandon")?;
        self.state = SyncState::Idle;
        warn!("unresolved save abandoned; {} codes kept in session", self.batch.len());
        Ok(())
    }

    fn expect_idle(&self, action: &'static str) -> Result<(), SyncError> {
        match self.state {
            SyncState::Idle => Ok(()),
            ref other => Err(SyncError::InvalidState {
                action,
                state: other.as_str(),
            }),
        }
    }

    fn expect_awaiting(&self, action: &'static str) -> Result<(), SyncError> {
        match self.state {
            SyncState::AwaitingConfirmation { .. } => Ok(()),
            ref other => Err(SyncError::InvalidState {
                action,
                state: other.as_str(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use scanbox_core::IndexError;
    use scanbox_kv::{KVError, KVStore, MemoryStore};

    use super::*;
    use crate::testing::StubSubmitter;

    fn workflow(
        submitter: Arc<StubSubmitter>,
        policy: FailurePolicy,
    ) -> (SyncWorkflow, Arc<PendingStore>) {
        let store = Arc::new(PendingStore::new(Arc::new(MemoryStore::new())));
        let wf = SyncWorkflow::new(submitter, Arc::clone(&store), policy);
        (wf, store)
    }

    async fn failed_save(wf: &mut SyncWorkflow) {
        let outcome = wf.save().await.unwrap();
        assert!(matches!(outcome, SaveOutcome::NeedsConfirmation { .. }));
    }

    #[test]
    fn scanning_same_code_twice_keeps_one() {
        let (mut wf, _) = workflow(Arc::new(StubSubmitter::default()), FailurePolicy::default());
        assert!(wf.scan("A").unwrap());
        assert!(!wf.scan("A").unwrap());
        assert_eq!(wf.batch().len(), 1);
    }

    #[test]
    fn remove_out_of_range() {
        let (mut wf, _) = workflow(Arc::new(StubSubmitter::default()), FailurePolicy::default());
        wf.scan("A").unwrap();
        let err = wf.remove_at(1).unwrap_err();
        assert!(matches!(err, SyncError::Index(IndexError { index: 1, len: 1 })));
        assert_eq!(wf.batch().snapshot(), ["A"]);
    }

    #[tokio::test]
    async fn empty_batch_cannot_be_saved() {
        let submitter = Arc::new(StubSubmitter::default());
        let (mut wf, _) = workflow(submitter.clone(), FailurePolicy::default());

        assert!(matches!(wf.save().await, Err(SyncError::EmptyBatch)));
        assert!(submitter.calls().is_empty());
        assert_eq!(wf.state(), &SyncState::Idle);
    }

    #[tokio::test]
    async fn success_clears_and_persists_nothing() {
        let submitter = Arc::new(StubSubmitter::default());
        let (mut wf, store) = workflow(submitter.clone(), FailurePolicy::default());
        wf.scan("A").unwrap();
        wf.scan("B").unwrap();

        let outcome = wf.save().await.unwrap();
        assert_eq!(outcome, SaveOutcome::Submitted { count: 2 });
        assert!(wf.batch().is_empty());
        assert_eq!(wf.state(), &SyncState::Idle);
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(submitter.calls(), vec![vec!["A".to_string(), "B".to_string()]]);
    }

    #[tokio::test]
    async fn failure_then_confirm_persists_snapshot() {
        let (mut wf, store) = workflow(Arc::new(StubSubmitter::failing()), FailurePolicy::default());
        wf.scan("A").unwrap();
        wf.scan("B").unwrap();

        let before = chrono::Utc::now();
        failed_save(&mut wf).await;
        assert!(matches!(wf.state(), SyncState::AwaitingConfirmation { .. }));

        let saved = wf.confirm_local_save().await.unwrap();
        let after = chrono::Utc::now();

        let pending = store.load().await.unwrap();
        assert_eq!(pending.last(), Some(&saved));
        assert_eq!(saved.data.snapshot(), ["A", "B"]);
        assert!(saved.ts >= before && saved.ts <= after);

        // Default policy keeps the batch on screen.
        assert_eq!(wf.batch().snapshot(), ["A", "B"]);
        assert_eq!(wf.state(), &SyncState::Idle);
    }

    #[tokio::test]
    async fn decline_persists_nothing() {
        let (mut wf, store) = workflow(Arc::new(StubSubmitter::failing()), FailurePolicy::default());
        wf.scan("A").unwrap();
        failed_save(&mut wf).await;

        wf.decline().unwrap();
        assert_eq!(wf.state(), &SyncState::Idle);
        assert_eq!(wf.batch().snapshot(), ["A"]);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn policy_can_clear_after_failure() {
        let policy = FailurePolicy {
            clear_on_local_save: true,
            clear_on_decline: true,
        };

        let (mut wf, _) = workflow(Arc::new(StubSubmitter::failing()), policy);
        wf.scan("A").unwrap();
        failed_save(&mut wf).await;
        wf.confirm_local_save().await.unwrap();
        assert!(wf.batch().is_empty());

        wf.scan("B").unwrap();
        failed_save(&mut wf).await;
        wf.decline().unwrap();
        assert!(wf.batch().is_empty());
    }

    #[tokio::test]
    async fn edits_blocked_until_failure_resolved() {
        let (mut wf, _) = workflow(Arc::new(StubSubmitter::failing()), FailurePolicy::default());
        wf.scan("A").unwrap();
        failed_save(&mut wf).await;

        assert!(matches!(wf.scan("B"), Err(SyncError::InvalidState { .. })));
        assert!(matches!(wf.clear(), Err(SyncError::InvalidState { .. })));
        assert!(matches!(wf.save().await, Err(SyncError::InvalidState { .. })));
        assert_eq!(wf.batch().snapshot(), ["A"]);
    }

    #[test]
    fn confirm_requires_failed_save() {
        let (mut wf, _) = workflow(Arc::new(StubSubmitter::default()), FailurePolicy::default());
        let err = wf.decline().unwrap_err();
        assert_eq!(err.to_string(), "cannot decline while idle");
    }

    #[tokio::test]
    async fn storage_failure_keeps_awaiting() {
        struct ReadOnlyKv;
        impl KVStore for ReadOnlyKv {
            fn get(&self, _key: &str) -> Result<Option<String>, KVError> {
                Ok(None)
            }
            fn set(&self, _key: &str, _value: &str) -> Result<(), KVError> {
                Err(KVError::Storage("read-only filesystem".into()))
            }
        }

        let store = Arc::new(PendingStore::new(Arc::new(ReadOnlyKv)));
        let mut wf = SyncWorkflow::new(
            Arc::new(StubSubmitter::failing()),
            store,
            FailurePolicy::default(),
        );
        wf.scan("A").unwrap();
        failed_save(&mut wf).await;

        let err = wf.confirm_local_save().await.unwrap_err();
        assert!(err.is_storage());
        assert!(matches!(wf.state(), SyncState::AwaitingConfirmation { .. }));

        wf.decline().unwrap();
        assert_eq!(wf.state(), &SyncState::Idle);
    }

    #[tokio::test]
    async fn abandon_keeps_batch_despite_policy() {
        let policy = FailurePolicy {
            clear_on_local_save: true,
            clear_on_decline: true,
        };
        let (mut wf, store) = workflow(Arc::new(StubSubmitter::failing()), policy);
        wf.scan("A").unwrap();
        wf.scan("B").unwrap();
        failed_save(&mut wf).await;

        wf.abandon().unwrap();
        assert_eq!(wf.state(), &SyncState::Idle);
        assert_eq!(wf.batch().snapshot(), ["A", "B"]);
        assert!(store.load().await.unwrap().is_empty());

        let err = wf.abandon().unwrap_err();
        assert_eq!(err.to_string(), "cannot abandon while idle");
    }
}
