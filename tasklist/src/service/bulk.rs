//! Aggregation of concurrently issued per-item requests.
//!
//! Bulk operations launch every sub-request at once and wait for all of
//! them to settle. [`aggregate`] turns the settled results into either the
//! full list of successes or a [`BulkFailure`] that keeps every individual
//! failure, so callers can tell exactly which items did not go through.

use std::fmt;

use super::ServiceError;

/// Which bulk operation produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    /// Deleting every task in the collection.
    DeleteAll,
    /// Re-creating the seed set after a delete-all.
    Reseed,
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteAll => write!(f, "delete all"),
            Self::Reseed => write!(f, "reseed"),
        }
    }
}

/// One failed sub-request of a bulk operation.
#[derive(Debug)]
pub struct ItemFailure {
    /// What the sub-request targeted: a task id, or a seed title.
    pub target: String,
    /// Why it failed.
    pub error: ServiceError,
}

/// One or more sub-requests of a bulk operation failed.
///
/// Sub-requests are not cancelled when a sibling fails, so `succeeded`
/// counts the ones that completed and whose effects are now in place.
#[derive(Debug, thiserror::Error)]
#[error(
    "{operation}: {} of {} requests failed",
    .failures.len(),
    .failures.len() + .succeeded
)]
pub struct BulkFailure {
    /// The bulk operation that was running.
    pub operation: BulkOperation,
    /// Every failed sub-request.
    pub failures: Vec<ItemFailure>,
    /// Number of sub-requests that succeeded.
    pub succeeded: usize,
}

/// Splits settled `(target, result)` pairs into successes or a [`BulkFailure`].
///
/// Successes keep the order of `results`.
///
/// # Errors
///
/// Returns [`BulkFailure`] if at least one result is an error.
pub fn aggregate<T>(
    operation: BulkOperation,
    results: impl IntoIterator<Item = (String, Result<T, ServiceError>)>,
) -> Result<Vec<T>, BulkFailure> {
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for (target, result) in results {
        match result {
            Ok(value) => successes.push(value),
            Err(error) => failures.push(ItemFailure { target, error }),
        }
    }

    if failures.is_empty() {
        return Ok(successes);
    }

    for failure in &failures {
        tracing::warn!(
            operation = %operation,
            target = %failure.target,
            error = %failure.error,
            "bulk sub-request failed"
        );
    }
    Err(BulkFailure {
        operation,
        failures,
        succeeded: successes.len(),
    })
}
