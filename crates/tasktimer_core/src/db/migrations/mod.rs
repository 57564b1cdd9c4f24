//! Ordered schema steps for the task database.
//!
//! Step 1 uses `CREATE TABLE IF NOT EXISTS`, so a `tasks.db` left by an
//! older release (user_version 0, table already present) is adopted as-is
//! and keeps its rows.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(user_version after the step, SQL)`, strictly increasing.
const STEPS: &[(u32, &str)] = &[(1, include_str!("0001_tasks.sql"))];

/// Highest schema version this build can write.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _)| *version)
}

/// Reads the schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings the database up to [`latest_version`] in one transaction.
///
/// # Errors
/// - [`DbError::SchemaTooNew`] if a newer build already migrated the file.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending: Vec<_> = STEPS.iter().filter(|(version, _)| *version > found).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        info!("event=db_migrate module=db status=ok from={found} to={version}");
    }
    tx.commit()?;
    Ok(())
}
