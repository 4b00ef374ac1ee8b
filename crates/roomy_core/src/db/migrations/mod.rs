//! Ordered schema scripts for the co-value store.
//!
//! # Responsibility
//! - Keep the embedded SQL scripts in version order.
//! - Run whatever is pending in one transaction and record the new version.
//!
//! # Invariants
//! - Script versions start at 1 and increase by exactly 1.
//! - `PRAGMA user_version` equals the last script that committed.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One embedded schema script.
#[derive(Debug, Clone, Copy)]
struct Script {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCRIPTS: &[Script] = &[
    Script {
        version: 1,
        name: "covalues",
        sql: include_str!("0001_covalues.sql"),
    },
    Script {
        version: 2,
        name: "accounts",
        sql: include_str!("0002_accounts.sql"),
    },
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    SCRIPTS.last().map_or(0, |script| script.version)
}

/// Brings `conn` up to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is ahead of this build.
/// - `MigrationFailed` naming the script that broke; earlier scripts from
///   the same run are rolled back with it.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = current_user_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Script> = SCRIPTS.iter().filter(|s| s.version > from).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for script in &pending {
        let set_version = format!("PRAGMA user_version = {};", script.version);
        tx.execute_batch(script.sql)
            .and_then(|()| tx.execute_batch(&set_version))
            .map_err(|source| DbError::MigrationFailed {
                version: script.version,
                source,
            })?;
        info!(
            "event=db_migrate module=db status=step version={} name={}",
            script.version, script.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}

/// Reads the schema version recorded in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}
