use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the ledger core.
///
/// Integrity findings are deliberately absent here: a broken chain is an
/// expected, first-class outcome reported through
/// [`crate::verify::VerificationResult`], not an error.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid event type: {0:?}")]
    InvalidEventType(String),

    #[error("Payload is {size} bytes, exceeding the {max} byte maximum")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Concurrent append conflict for subject {subject_id} after {attempts} attempts")]
    ConcurrentAppendConflict { subject_id: Uuid, attempts: u32 },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Corrupt ledger record for subject {subject_id} at sequence {sequence}: {detail}")]
    CorruptRecord {
        subject_id: String,
        sequence: i64,
        detail: String,
    },
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl LedgerError {
    /// Whether the caller may retry the failed operation as-is.
    ///
    /// Conflicts resolve by re-reading the tail; storage outages by backoff.
    /// Validation and corruption errors will fail identically on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentAppendConflict { .. } | Self::StorageUnavailable(_)
        )
    }

    pub(crate) fn corrupt(
        subject_id: impl Into<String>,
        sequence: i64,
        detail: impl Into<String>,
    ) -> Self {
        Self::CorruptRecord {
            subject_id: subject_id.into(),
            sequence,
            detail: detail.into(),
        }
    }
}
