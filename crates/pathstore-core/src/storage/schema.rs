//! SQLite schema for the record store
//!
//! One table of records keyed by `key`, with a non-unique index over the
//! precomputed `path` column. The structural version lives in `schema_info`.

use rusqlite::{Connection, OptionalExtension, Result};

/// Structural schema version this code creates and understands
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the records table
pub const RECORDS_TABLE: &str = "records";

/// Name of the index over `records.path`
pub const PATH_INDEX: &str = "idx_records_path";

/// Create the schema (idempotent) and stamp `version`
pub fn init_schema(conn: &Connection, version: u32) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS records (
            key TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            app_data_version INTEGER NOT NULL,
            mime_type TEXT NOT NULL,
            last_modified INTEGER NOT NULL,
            text TEXT,
            bytes BLOB
        );

        -- Exact-match lookups by directory
        CREATE INDEX IF NOT EXISTS idx_records_path ON records(path);
        "#,
    )?;

    set_schema_version(conn, version)
}

/// Record the structural version in `schema_info`
pub fn set_schema_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the structural version stored in the database
///
/// `None` for a database that has never been initialised.
pub fn get_schema_version(conn: &Connection) -> Result<Option<u32>> {
    if !table_exists(conn, "schema_info")? {
        return Ok(None);
    }

    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_info WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(value.and_then(|v| v.parse().ok()))
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?")?
        .exists([name])
}
