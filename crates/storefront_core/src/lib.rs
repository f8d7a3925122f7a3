//! Core domain logic for the storefront attribute catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CatalogConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attribute::{
    AttributeChanges, AttributeClassification, AttributeDefinition, AttributeId,
    AttributeValueOption, AttributeWithValues, InputKind, ItemAttributeAssignment, ItemId,
    ValueId,
};
pub use repo::catalog_repo::{
    AttributeListQuery, CatalogStore, Inserted, RepoError, RepoResult, SqliteCatalogStore,
};
pub use service::assignment_service::{AssignmentRequest, AssignmentService, ReconcileSummary};
pub use service::attribute_service::{
    AttributeService, CreateAttributeRequest, CreateValueOptionRequest,
};
pub use service::error::{CatalogError, ErrorKind};
pub use service::write_guard::verify_rows;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
