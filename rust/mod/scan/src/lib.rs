//! Scan session and offline queue.
//!
//! ```text
//! ScanBatch ──save──▶ Submitter ──ok──▶ cleared
//!                        │
//!                        └─fail──▶ confirm? ──yes──▶ PendingStore ("localResult")
//!                                                         │
//!                      PendingReview: load / resend / delete / clear_all
//! ```

pub mod error;
pub mod review;
pub mod store;
pub mod workflow;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::SyncError;
pub use review::PendingReview;
pub use store::{PendingStore, PendingTxn, PENDING_KEY};
pub use workflow::{FailurePolicy, SaveOutcome, SyncState, SyncWorkflow};
