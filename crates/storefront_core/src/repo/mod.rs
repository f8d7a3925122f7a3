//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the store gateway contract used by catalog services.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Mutations report affected row counts instead of interpreting them.
//! - Transport failures surface as `RepoError::Db`.

pub mod catalog_repo;
