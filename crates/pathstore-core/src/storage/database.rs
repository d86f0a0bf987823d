//! SQLite-backed record engine
//!
//! `Database` owns the connection and implements every primitive as a
//! synchronous call scoped to one transaction. The async [`Store`] runs these
//! on the blocking pool.
//!
//! Reads that go through [`Database::get`] and friends reconcile the record's
//! data version first: current records are returned as-is, older ones are
//! upgraded and written back in the same transaction, newer ones fail.
//!
//! [`Store`]: crate::store::Store

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::record::{next_timestamp, now_millis, Payload, Record};
use crate::storage::error::{StoreError, StoreResult, TransactionContext};
use crate::storage::schema::{get_schema_version, init_schema};
use crate::upgrade::Upgrader;
use crate::versioning::{
    check_structural, classify_data_version, DataVersionAction, StructuralAction,
};

const RECORD_COLUMNS: &str =
    "key, path, app_data_version, mime_type, last_modified, text, bytes";

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A file named after the database inside this directory
    Directory(PathBuf),
    /// A private in-memory database (tests, scratch stores)
    Memory,
}

impl Location {
    /// Path of the database file, if file-backed
    pub fn database_file(&self, name: &str) -> Option<PathBuf> {
        match self {
            Location::Directory(dir) => Some(dir.join(format!("{}.sqlite", name))),
            Location::Memory => None,
        }
    }
}

/// Summary of what the store holds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub records: u64,
    pub text_records: u64,
    pub byte_records: u64,
    pub payload_bytes: u64,
    pub last_modified: Option<i64>,
}

/// An open record database
pub struct Database {
    conn: Connection,
    name: String,
    data_version: u32,
    upgrader: Arc<Upgrader>,
}

impl Database {
    /// Open (creating if needed) the database `name` at `location`
    ///
    /// Fails with `StructuralSchemaMismatch` if the database was stamped
    /// with a newer structural version than `schema_version`.
    pub fn open(
        location: &Location,
        name: &str,
        schema_version: u32,
        data_version: u32,
        upgrader: Arc<Upgrader>,
    ) -> StoreResult<Self> {
        let conn = match location.database_file(name) {
            Some(path) => open_file(&path)?,
            None => Connection::open_in_memory().during("open", None)?,
        };

        let found = get_schema_version(&conn).during("read schema version", None)?;
        match check_structural(name, found, schema_version)? {
            StructuralAction::Create => {
                init_schema(&conn, schema_version).during("create schema", None)?;
                info!("Created database {} (schema version {})", name, schema_version);
            }
            StructuralAction::Restamp { from } => {
                init_schema(&conn, schema_version).during("update schema", None)?;
                info!(
                    "Updated database {} from schema version {} to {}",
                    name, from, schema_version
                );
            }
            StructuralAction::Reuse => {
                debug!("Opened database {} (schema version {})", name, schema_version);
            }
        }

        Ok(Self {
            conn,
            name: name.to_string(),
            data_version,
            upgrader,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data version records are reconciled to on read
    pub fn data_version(&self) -> u32 {
        self.data_version
    }

    // ==================== Primitives ====================

    /// Stored record for `key`, without any version reconciliation
    pub fn get_raw(&self, key: &str) -> StoreResult<Option<Record>> {
        select_record(&self.conn, key).during("get", Some(key))
    }

    /// Insert or replace a record exactly as given
    pub fn put(&self, record: &Record) -> StoreResult<()> {
        upsert_record(&self.conn, record).during("put", Some(&record.key))
    }

    /// Delete `key`; absent keys are not an error
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        delete_record(&self.conn, key)
            .map(|_| ())
            .during("delete", Some(key))
    }

    /// Delete every key in one transaction; returns how many existed
    pub fn delete_many(&mut self, keys: &[String]) -> StoreResult<usize> {
        let tx = self.conn.transaction().during("begin delete", None)?;
        let mut deleted = 0;
        for key in keys {
            deleted += delete_record(&tx, key).during("delete", Some(key))?;
        }
        tx.commit().during("commit delete", None)?;
        Ok(deleted)
    }

    /// All keys, sorted
    pub fn all_keys(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM records ORDER BY key")
            .during("list keys", None)?;
        let keys = stmt
            .query_map([], |row| row.get(0))
            .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
            .during("list keys", None)?;
        Ok(keys)
    }

    /// Keys whose `path` equals `path` exactly, sorted
    pub fn keys_at_path(&self, path: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM records WHERE path = ? ORDER BY key")
            .during("list keys at path", Some(path))?;
        let keys = stmt
            .query_map(params![path], |row| row.get(0))
            .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
            .during("list keys at path", Some(path))?;
        Ok(keys)
    }

    // ==================== Reconciled reads ====================

    /// Record for `key` at the current data version
    pub fn get(&mut self, key: &str) -> StoreResult<Option<Record>> {
        let tx = self.conn.transaction().during("begin get", Some(key))?;
        let record = match select_record(&tx, key).during("get", Some(key))? {
            Some(record) => Some(reconcile(&tx, record, self.data_version, &self.upgrader)?),
            None => None,
        };
        tx.commit().during("commit get", Some(key))?;
        Ok(record)
    }

    /// Records for `keys`, in the same order; misses are `None`
    pub fn get_many(&mut self, keys: &[String]) -> StoreResult<Vec<Option<Record>>> {
        let tx = self.conn.transaction().during("begin get", None)?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let record = match select_record(&tx, key).during("get", Some(key))? {
                Some(record) => Some(reconcile(&tx, record, self.data_version, &self.upgrader)?),
                None => None,
            };
            records.push(record);
        }
        tx.commit().during("commit get", None)?;
        Ok(records)
    }

    /// Records whose `path` equals `path` exactly, sorted by key
    pub fn records_at_path(&mut self, path: &str) -> StoreResult<Vec<Record>> {
        let keys = self.keys_at_path(path)?;
        Ok(self.get_many(&keys)?.into_iter().flatten().collect())
    }

    // ==================== Writes ====================

    /// Write `payload` to `key`, stamping version and timestamp
    pub fn write(&mut self, key: &str, payload: Payload, mime_type: &str) -> StoreResult<Record> {
        let tx = self.conn.transaction().during("begin write", Some(key))?;
        let prior = select_record(&tx, key).during("get", Some(key))?;
        let record = Record::next(
            prior.as_ref(),
            key,
            payload,
            mime_type,
            self.data_version,
            now_millis(),
        );
        upsert_record(&tx, &record).during("put", Some(key))?;
        tx.commit().during("commit write", Some(key))?;
        Ok(record)
    }

    /// Move the record at `current` to `next` as a content change
    ///
    /// The moved record is reconciled to the current data version and gets a
    /// fresh `last_modified`, later than both the source's and any record it
    /// replaces at `next`. Fails with `NotFound` if `current` is absent.
    pub fn rename(&mut self, current: &str, next: &str) -> StoreResult<Record> {
        let tx = self.conn.transaction().during("begin rename", Some(current))?;
        let record = select_record(&tx, current)
            .during("get", Some(current))?
            .ok_or_else(|| StoreError::NotFound {
                key: current.to_string(),
            })?;
        let record = reconcile(&tx, record, self.data_version, &self.upgrader)?;
        let replaced = select_record(&tx, next).during("get", Some(next))?;

        let mut moved = record.moved_to(next);
        let previous = replaced
            .map(|r| r.last_modified)
            .unwrap_or(record.last_modified)
            .max(record.last_modified);
        moved.last_modified = next_timestamp(Some(previous), now_millis());

        delete_record(&tx, current).during("delete", Some(current))?;
        upsert_record(&tx, &moved).during("put", Some(next))?;
        tx.commit().during("commit rename", Some(current))?;
        Ok(moved)
    }

    /// Stored records for `keys`, read together without reconciliation
    ///
    /// Keys that no longer exist are left out.
    pub fn snapshot(&mut self, keys: &[String]) -> StoreResult<Vec<Record>> {
        let tx = self.conn.transaction().during("begin snapshot", None)?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = select_record(&tx, key).during("get", Some(key))? {
                records.push(record);
            }
        }
        tx.commit().during("commit snapshot", None)?;
        Ok(records)
    }

    /// Store `record` under `next` as a structural change
    ///
    /// Data version and `last_modified` are carried over untouched. The old
    /// key is removed only when `vacate` is set, so a key that is itself the
    /// target of another move in the same batch is left for that move.
    pub fn place(&mut self, record: &Record, next: &str, vacate: bool) -> StoreResult<()> {
        let tx = self.conn.transaction().during("begin move", Some(&record.key))?;
        if vacate {
            delete_record(&tx, &record.key).during("delete", Some(&record.key))?;
        }
        upsert_record(&tx, &record.moved_to(next)).during("put", Some(next))?;
        tx.commit().during("commit move", Some(&record.key))?;
        Ok(())
    }

    // ==================== Stats ====================

    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.conn
            .query_row(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(text),
                    COUNT(bytes),
                    COALESCE(SUM(COALESCE(LENGTH(CAST(text AS BLOB)), 0) + COALESCE(LENGTH(bytes), 0)), 0),
                    MAX(last_modified)
                FROM records
                "#,
                [],
                |row| {
                    Ok(StoreStats {
                        records: row.get::<_, i64>(0)? as u64,
                        text_records: row.get::<_, i64>(1)? as u64,
                        byte_records: row.get::<_, i64>(2)? as u64,
                        payload_bytes: row.get::<_, i64>(3)? as u64,
                        last_modified: row.get(4)?,
                    })
                },
            )
            .during("stats", None)
    }
}

// ==================== Private helpers ====================

/// Bring a freshly read record to `data_version`, writing back any upgrade
fn reconcile(
    conn: &Connection,
    mut record: Record,
    data_version: u32,
    upgrader: &Upgrader,
) -> StoreResult<Record> {
    match classify_data_version(record.app_data_version, data_version) {
        DataVersionAction::Current => Ok(record),
        DataVersionAction::TooNew => Err(StoreError::VersionTooNew {
            key: record.key,
            found: record.app_data_version,
            expected: data_version,
        }),
        DataVersionAction::Upgrade => {
            let from = record.app_data_version;
            upgrader.upgrade(&mut record, data_version)?;
            upsert_record(conn, &record).during("put upgraded", Some(&record.key))?;
            info!(
                "Upgraded record {} from data version {} to {}",
                record.key, from, data_version
            );
            Ok(record)
        }
    }
}

fn open_file(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let conn = Connection::open(path).during("open", None)?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .during("open", None)?;
    conn.busy_timeout(Duration::from_secs(5))
        .during("open", None)?;
    Ok(conn)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        key: row.get(0)?,
        path: row.get(1)?,
        app_data_version: row.get(2)?,
        mime_type: row.get(3)?,
        last_modified: row.get(4)?,
        text: row.get(5)?,
        bytes: row.get(6)?,
    })
}

fn select_record(conn: &Connection, key: &str) -> rusqlite::Result<Option<Record>> {
    conn.query_row(
        &format!("SELECT {} FROM records WHERE key = ?", RECORD_COLUMNS),
        params![key],
        record_from_row,
    )
    .optional()
}

fn upsert_record(conn: &Connection, record: &Record) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO records ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            RECORD_COLUMNS
        ),
        params![
            record.key,
            record.path,
            record.app_data_version,
            record.mime_type,
            record.last_modified,
            record.text,
            record.bytes,
        ],
    )?;
    Ok(())
}

fn delete_record(conn: &Connection, key: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM records WHERE key = ?", params![key])
}

/// Keys in `keys` minus those in `keep`
pub(crate) fn without_kept(keys: Vec<String>, keep: &HashSet<String>) -> Vec<String> {
    keys.into_iter().filter(|k| !keep.contains(k)).collect()
}
