//! Catalog service configuration.
//!
//! # Invariants
//! - `reference_probe_limit` is at least 1 once normalized.

/// Default page size of the reference probe run before deleting an attribute.
pub const DEFAULT_REFERENCE_PROBE_LIMIT: u32 = 10;

/// Tunables for `AttributeService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Maximum referencing assignments read (and reported) when a delete is
    /// blocked.
    pub reference_probe_limit: u32,
}

impl CatalogConfig {
    /// Returns a copy with out-of-range values replaced.
    pub fn normalized(self) -> Self {
        Self {
            reference_probe_limit: self.reference_probe_limit.max(1),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            reference_probe_limit: DEFAULT_REFERENCE_PROBE_LIMIT,
        }
    }
}
