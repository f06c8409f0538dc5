use thiserror::Error;

/// An index addressed an element that does not exist.
///
/// Returned by every remove-by-position operation, both on the in-session
/// batch and on the pending store. The target is never modified when this
/// error is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("index {index} out of range (length {len})")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

impl IndexError {
    /// Check `index` against `len`.
    pub fn check(index: usize, len: usize) -> Result<(), IndexError> {
        if index < len {
            Ok(())
        } else {
            Err(IndexError { index, len })
        }
    }
}
