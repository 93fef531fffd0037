// Errors surfaced by pool writes and reads.

use thiserror::Error;

/// Failure of a single pool operation.
///
/// Grading anomalies (unresolvable or ambiguous sides, missing spread or
/// result) are not represented here: they leave outcomes ungraded.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("missing required field `{field}`")]
    MissingRequiredField { field: &'static str },

    #[error("event log failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub type PoolResult<T> = Result<T, PoolError>;

/// Reject blank identifiers before anything is written.
pub(crate) fn require(field: &'static str, value: &str) -> PoolResult<()> {
    if value.trim().is_empty() {
        Err(PoolError::MissingRequiredField { field })
    } else {
        Ok(())
    }
}
