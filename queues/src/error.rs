//! Queue-specific errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The caller's `insert_after` hint does not name a queued request at
    /// a position consistent with eligibility-time ordering.
    #[error("insertion hint {hint} is not a valid queue position")]
    InvalidInsertionHint { hint: u64 },
}
