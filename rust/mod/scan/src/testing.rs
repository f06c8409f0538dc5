//! In-process submitter for exercising workflows without a service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use scanbox_client::{SubmitError, SubmitResult, Submitter};
use scanbox_core::{ScanBatch, ScannedCode};

/// Submitter that records every batch and fails while `failing` is set.
#[derive(Default)]
pub struct StubSubmitter {
    failing: AtomicBool,
    calls: Mutex<Vec<Vec<ScannedCode>>>,
}

impl StubSubmitter {
    pub fn failing() -> Self {
        let stub = Self::default();
        stub.set_failing(true);
        stub
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Vec<ScannedCode>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Submitter for StubSubmitter {
    async fn submit(&self, batch: &ScanBatch) -> SubmitResult {
        self.calls.lock().unwrap().push(batch.snapshot().to_vec());
        if self.failing.load(Ordering::SeqCst) {
            return Err(SubmitError::Status {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(())
    }
}
