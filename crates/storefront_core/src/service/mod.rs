//! Catalog use-case services.
//!
//! # Responsibility
//! - Orchestrate store gateway calls into catalog and assignment use-cases.
//! - Verify every mutation's row count before reporting success.
//!
//! # Invariants
//! - Services hold no mutable state between calls.
//! - Multi-step mutations run inside `CatalogStore::atomically`.

pub mod assignment_service;
pub mod attribute_service;
pub mod error;
pub mod write_guard;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
