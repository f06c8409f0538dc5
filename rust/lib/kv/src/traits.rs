use crate::error::KVError;

/// KVStore is the durable local storage seen by the scanner.
///
/// It deliberately mirrors a mobile async-storage API: one string value per
/// key, read and replaced whole. Callers that keep structured data under a key
/// serialize it themselves and rewrite the full value on every change.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<String>, KVError>;

    /// Set a key to a value, replacing whatever was stored before.
    fn set(&self, key: &str, value: &str) -> Result<(), KVError>;
}
