use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A conditional transaction kept conflicting with rival writers. The
    /// caller may retry the whole event; the derived state is untouched.
    #[error("Transaction on '{key}' could not commit after {attempts} attempts")]
    ConflictRetryExceeded { key: String, attempts: u32 },

    #[error("Corrupt derived record at '{key}': {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
