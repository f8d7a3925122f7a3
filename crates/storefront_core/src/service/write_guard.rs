//! Write verification for catalog mutations.
//!
//! The store's affected row count is the source of truth for whether a write
//! happened. A mismatch means a stale id, a lost race or a store defect, and
//! is reported as `CatalogError::InternalInconsistency` without retry.

use crate::service::error::CatalogError;
use log::error;

/// Checks the row count a mutation reported against the expected count.
pub fn verify_rows(
    operation: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), CatalogError> {
    if expected == actual {
        return Ok(());
    }

    error!(
        "event=write_verify module=catalog status=error operation={} expected_rows={} actual_rows={}",
        operation, expected, actual
    );
    Err(CatalogError::InternalInconsistency {
        operation,
        expected,
        actual,
    })
}
