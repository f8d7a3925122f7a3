//! Catalog service error taxonomy.
//!
//! # Responsibility
//! - Separate expected caller-facing failures from internal inconsistencies.
//! - Carry diagnostic detail (referencing item ids, row counts) with the error.
//!
//! # Invariants
//! - `InternalInconsistency` and `Repo` are never produced for bad input.
//! - No error is retried or swallowed by the services.

use crate::model::attribute::{AttributeId, ItemId, ValueId};
use crate::repo::catalog_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse classification callers map to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced attribute or value option is absent.
    NotFound,
    /// Request clashes with existing state (duplicate name, live references).
    Conflict,
    /// Request is malformed for the target attribute.
    Invalid,
    /// Store inconsistency or transport failure; not locally recoverable.
    Internal,
}

/// Service error for attribute catalog and assignment use-cases.
#[derive(Debug)]
pub enum CatalogError {
    /// Attribute definition does not exist.
    NotFound(AttributeId),
    /// Another definition already uses this name.
    NameDuplicated(String),
    /// Delete or input-kind switch blocked by assignments seen by the bounded
    /// probe.
    ReferencedByItem {
        attribute_id: AttributeId,
        item_ids: Vec<ItemId>,
    },
    /// Value option does not exist (or belongs to another attribute).
    ValueNotFound(ValueId),
    /// Store reported a different affected row count than expected.
    InternalInconsistency {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Request field is blank or otherwise unusable.
    InvalidInput(String),
    /// Value options requested for a non-selection attribute.
    NotSelectionKind(AttributeId),
    /// Assignment payload does not match the attribute input kind.
    InvalidAssignment {
        attribute_id: AttributeId,
        reason: &'static str,
    },
    /// Store gateway failure.
    Repo(RepoError),
}

impl CatalogError {
    /// Returns the response class for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::ValueNotFound(_) => ErrorKind::NotFound,
            Self::NameDuplicated(_) | Self::ReferencedByItem { .. } => ErrorKind::Conflict,
            Self::InvalidInput(_) | Self::NotSelectionKind(_) | Self::InvalidAssignment { .. } => {
                ErrorKind::Invalid
            }
            Self::InternalInconsistency { .. } | Self::Repo(_) => ErrorKind::Internal,
        }
    }

    /// Returns whether this error should be alerted on rather than shown.
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "attribute not found: {id}"),
            Self::NameDuplicated(name) => write!(f, "attribute name already exists: `{name}`"),
            Self::ReferencedByItem {
                attribute_id,
                item_ids,
            } => write!(
                f,
                "attribute {attribute_id} is referenced by items {item_ids:?}"
            ),
            Self::ValueNotFound(id) => write!(f, "attribute value not found: {id}"),
            Self::InternalInconsistency {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "inconsistent catalog write `{operation}`: expected {expected} rows, store reported {actual}"
            ),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotSelectionKind(id) => {
                write!(f, "attribute {id} does not take value options")
            }
            Self::InvalidAssignment {
                attribute_id,
                reason,
            } => write!(f, "invalid assignment for attribute {attribute_id}: {reason}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CatalogError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
