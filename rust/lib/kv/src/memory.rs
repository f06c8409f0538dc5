use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard};

use crate::error::KVError;
use crate::traits::KVStore;

/// MemoryStore keeps values in a process-local map. Nothing is persisted; it
/// backs tests and `--ephemeral` CLI runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> Result<usize, KVError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, KVError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, String>>, KVError> {
        self.entries
            .read()
            .map_err(|e| KVError::Storage(e.to_string()))
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KVError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KVError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
