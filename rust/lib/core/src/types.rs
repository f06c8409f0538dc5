use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::IndexError;

/// The decoded payload of one barcode.
pub type ScannedCode = String;

// ---------------------------------------------------------------------------
// ScanBatch
// ---------------------------------------------------------------------------

/// An ordered, duplicate-free list of scanned codes.
///
/// Order is first-seen order. Uniqueness is enforced at insertion, so a code
/// scanned twice in one session appears once. On the wire the batch is a bare
/// JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScanBatch {
    codes: Vec<ScannedCode>,
}

impl ScanBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `code` unless it is already present. Returns whether it was added.
    pub fn append(&mut self, code: impl Into<ScannedCode>) -> bool {
        let code = code.into();
        if self.contains(&code) {
            return false;
        }
        self.codes.push(code);
        true
    }

    /// Remove the code at `index`, shifting later codes down.
    pub fn remove_at(&mut self, index: usize) -> Result<ScannedCode, IndexError> {
        IndexError::check(index, self.codes.len())?;
        Ok(self.codes.remove(index))
    }

    pub fn clear(&mut self) {
        self.codes.clear();
    }

    /// Read-only view of the current codes.
    pub fn snapshot(&self) -> &[ScannedCode] {
        &self.codes
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScannedCode> {
        self.codes.iter()
    }
}

impl FromIterator<ScannedCode> for ScanBatch {
    fn from_iter<I: IntoIterator<Item = ScannedCode>>(iter: I) -> Self {
        let mut batch = ScanBatch::new();
        for code in iter {
            batch.append(code);
        }
        batch
    }
}

impl<'a> IntoIterator for &'a ScanBatch {
    type Item = &'a ScannedCode;
    type IntoIter = std::slice::Iter<'a, ScannedCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.codes.iter()
    }
}

// Stored lists written by older clients may repeat a code; keep the first.
impl<'de> Deserialize<'de> for ScanBatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let codes = Vec::<ScannedCode>::deserialize(deserializer)?;
        Ok(codes.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// PendingBatch
// ---------------------------------------------------------------------------

/// A batch that failed remote submission and was kept locally.
///
/// Immutable once created; the only mutation is removing the whole entry from
/// the pending store (after a successful resend or an explicit delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBatch {
    /// When the batch was saved locally (RFC 3339 on the wire).
    pub ts: DateTime<Utc>,

    /// The codes that were being submitted.
    #[serde(default)]
    pub data: ScanBatch,
}

impl PendingBatch {
    /// Capture `data` as pending, stamped with the current time.
    pub fn now(data: ScanBatch) -> Self {
        Self {
            ts: Utc::now(),
            data,
        }
    }
}
