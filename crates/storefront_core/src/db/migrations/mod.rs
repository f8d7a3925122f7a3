//! Catalog schema migrations.
//!
//! # Responsibility
//! - Register the catalog schema steps in strictly increasing order.
//! - Apply pending steps atomically and record the reached version.
//!
//! # Invariants
//! - `version` values must remain monotonic; `PRAGMA user_version` mirrors
//!   the last applied step.
//! - References from `attribute_values` and `item_attributes` to
//!   `attributes` are `DEFERRABLE INITIALLY DEFERRED`, so a definition may be
//!   deleted before its value options inside one transaction.
//! - `item_attributes` is keyed by `(item_id, attribute_id)`.
//! - Attribute name uniqueness is not a schema constraint; the catalog
//!   service checks it inside its write boundary.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_attributes.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_item_attributes.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        debug!("event=db_migrate module=db status=skip version={current_version}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );

    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
