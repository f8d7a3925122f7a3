//! Domain model for the attribute catalog.
//!
//! # Responsibility
//! - Define canonical data structures used by catalog services.
//! - Keep storage tokens for closed enums next to their types.
//!
//! # Invariants
//! - Identifiers are assigned by the store and never reused.
//! - Assignments are replaced, never updated in place.

pub mod attribute;
