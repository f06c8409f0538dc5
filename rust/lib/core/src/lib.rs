pub mod config;
pub mod error;
pub mod types;

pub use config::StoreConfig;
pub use error::IndexError;
pub use types::{PendingBatch, ScanBatch, ScannedCode};
