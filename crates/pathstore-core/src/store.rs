//! Unified storage interface
//!
//! The `Store` is the main entry point. It owns the lazily-opened database
//! and exposes every operation as an async call that runs one unit of
//! SQLite work on the blocking pool.
//!
//! ## Versions
//!
//! - Opening checks the structural schema version (see [`versioning`]).
//! - Every read returns records at the configured data version, upgrading
//!   older records on the way out and persisting the result.
//! - Every write stamps the data version and a fresh `last_modified`.
//!
//! ## Bulk operations
//!
//! Subtree renames move each descendant in its own transaction, issued
//! concurrently and joined. They stop at the first failure and do not roll
//! back moves already made; re-running the same rename finishes the job.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open(StoreConfig::from_config(&Config::load()?)).await?;
//!
//! store.set_text("/notes/today", "hello").await?;
//! let keys = store.get_all_keys_at_path("/notes/").await?;
//! store.rename_key("/notes", "/journal").await?;
//! ```
//!
//! [`versioning`]: crate::versioning

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures_util::future::try_join_all;
use regex::Regex;
use tracing::{debug, info};

use crate::config::Config;
use crate::path::{path_prefix_pattern, replace_prefix};
use crate::record::{Payload, Record, TEXT_MIME_TYPE};
use crate::storage::database::without_kept;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::{Database, Location, StoreStats, SCHEMA_VERSION};
use crate::upgrade::Upgrader;

/// Payload format version this build reads and writes
pub const DATA_VERSION: u32 = 1;

/// Everything a `Store` needs to open its database
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Namespaces the database name
    pub app_id: String,
    /// Structural schema version the code declares
    pub schema_version: u32,
    /// Data version records are reconciled to
    pub data_version: u32,
    /// Steps used to upgrade older records on read
    pub upgrader: Arc<Upgrader>,
    pub location: Location,
}

impl StoreConfig {
    pub fn new(app_id: impl Into<String>, location: Location) -> Self {
        Self {
            app_id: app_id.into(),
            schema_version: SCHEMA_VERSION,
            data_version: DATA_VERSION,
            upgrader: Arc::new(Upgrader::new()),
            location,
        }
    }

    /// In-memory store, private to the returned handle and its clones
    pub fn in_memory(app_id: impl Into<String>) -> Self {
        Self::new(app_id, Location::Memory)
    }

    /// File-backed store described by the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.app_id.clone(), config.location())
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_data_version(mut self, version: u32) -> Self {
        self.data_version = version;
        self
    }

    pub fn with_upgrader(mut self, upgrader: Upgrader) -> Self {
        self.upgrader = Arc::new(upgrader);
        self
    }

    /// `{app_id}-{schema_version}`
    pub fn database_name(&self) -> String {
        format!("{}-{}", self.app_id, self.schema_version)
    }
}

type SharedDatabase = Arc<Mutex<Database>>;

struct Inner {
    config: StoreConfig,
    db: tokio::sync::Mutex<Option<SharedDatabase>>,
}

/// Handle to a path-keyed record store
///
/// Cloning is cheap; clones share one connection.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Create a handle; the database is opened on first use
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                db: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Create a handle and open the database immediately
    ///
    /// Surfaces structural version problems up front instead of on the
    /// first operation.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let store = Self::new(config);
        store.connect().await?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Open the database if it is not open yet
    pub async fn connect(&self) -> StoreResult<()> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> StoreResult<SharedDatabase> {
        let mut slot = self.inner.db.lock().await;
        if let Some(db) = slot.as_ref() {
            return Ok(Arc::clone(db));
        }

        let config = self.inner.config.clone();
        let db = tokio::task::spawn_blocking(move || {
            Database::open(
                &config.location,
                &config.database_name(),
                config.schema_version,
                config.data_version,
                config.upgrader,
            )
        })
        .await??;

        let db = Arc::new(Mutex::new(db));
        *slot = Some(Arc::clone(&db));
        Ok(db)
    }

    /// Run one unit of database work on the blocking pool
    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Database) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.connection().await?;
        tokio::task::spawn_blocking(move || {
            let mut db = db.lock().map_err(|_| StoreError::ConnectionPoisoned)?;
            op(&mut *db)
        })
        .await?
    }

    // ==================== Primitives ====================

    /// Stored record without data-version reconciliation
    pub async fn get_raw(&self, key: &str) -> StoreResult<Option<Record>> {
        let key = key.to_string();
        self.run(move |db| db.get_raw(&key)).await
    }

    /// Insert or replace a record exactly as given
    ///
    /// The caller is responsible for `path`, version and timestamp.
    pub async fn put(&self, record: Record) -> StoreResult<()> {
        self.run(move |db| db.put(&record)).await
    }

    /// Delete a key; absent keys are fine
    pub async fn delete(&self, key: &str) -> StoreResult<()> {
        let key = key.to_string();
        self.run(move |db| db.delete(&key)).await
    }

    /// Delete several keys in one transaction; returns how many existed
    pub async fn delete_many(&self, keys: &[String]) -> StoreResult<usize> {
        let keys = keys.to_vec();
        self.run(move |db| db.delete_many(&keys)).await
    }

    // ==================== Reads ====================

    /// Record for `key` at the current data version
    pub async fn get(&self, key: &str) -> StoreResult<Option<Record>> {
        let key = key.to_string();
        self.run(move |db| db.get(&key)).await
    }

    pub async fn get_text(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get(key).await?.and_then(|r| r.text))
    }

    pub async fn get_bytes(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.get(key).await?.and_then(|r| r.bytes))
    }

    /// Text payload, only if modified after `since` (ms since epoch)
    pub async fn get_text_if_modified(&self, key: &str, since: i64) -> StoreResult<Option<String>> {
        Ok(self
            .get(key)
            .await?
            .filter(|r| r.modified_since(since))
            .and_then(|r| r.text))
    }

    /// Byte payload, only if modified after `since` (ms since epoch)
    pub async fn get_bytes_if_modified(
        &self,
        key: &str,
        since: i64,
    ) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .get(key)
            .await?
            .filter(|r| r.modified_since(since))
            .and_then(|r| r.bytes))
    }

    /// Records for `keys` in input order; misses are `None`
    pub async fn get_values_for_keys(&self, keys: &[String]) -> StoreResult<Vec<Option<Record>>> {
        let keys = keys.to_vec();
        self.run(move |db| db.get_many(&keys)).await
    }

    pub async fn get_all_keys(&self) -> StoreResult<Vec<String>> {
        self.run(|db| db.all_keys()).await
    }

    /// Keys whose directory is exactly `path` (not a prefix scan)
    pub async fn get_all_keys_at_path(&self, path: &str) -> StoreResult<Vec<String>> {
        let path = path.to_string();
        self.run(move |db| db.keys_at_path(&path)).await
    }

    /// Records whose directory is exactly `path`
    pub async fn get_all_values_at_path(&self, path: &str) -> StoreResult<Vec<Record>> {
        let path = path.to_string();
        self.run(move |db| db.records_at_path(&path)).await
    }

    /// Keys matching `pattern`
    ///
    /// Loads every key and filters in process, so cost grows with the size
    /// of the whole store.
    pub async fn get_all_keys_matching_regex(&self, pattern: &Regex) -> StoreResult<Vec<String>> {
        let keys = self.get_all_keys().await?;
        Ok(keys.into_iter().filter(|k| pattern.is_match(k)).collect())
    }

    /// Keys matching the regex source `pattern`
    pub async fn get_all_keys_matching(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let pattern = Regex::new(pattern)?;
        self.get_all_keys_matching_regex(&pattern).await
    }

    pub async fn stats(&self) -> StoreResult<StoreStats> {
        self.run(|db| db.stats()).await
    }

    // ==================== Writes ====================

    /// Write a `text/plain` payload
    pub async fn set_text(&self, key: &str, text: impl Into<String>) -> StoreResult<Record> {
        self.set_text_as(key, text, TEXT_MIME_TYPE).await
    }

    /// Write a text payload with an explicit MIME type
    pub async fn set_text_as(
        &self,
        key: &str,
        text: impl Into<String>,
        mime_type: &str,
    ) -> StoreResult<Record> {
        self.write(key, Payload::Text(text.into()), mime_type).await
    }

    /// Write a byte payload
    pub async fn set_bytes(
        &self,
        key: &str,
        bytes: impl Into<Vec<u8>>,
        mime_type: &str,
    ) -> StoreResult<Record> {
        self.write(key, Payload::Bytes(bytes.into()), mime_type).await
    }

    async fn write(&self, key: &str, payload: Payload, mime_type: &str) -> StoreResult<Record> {
        let key = key.to_string();
        let mime_type = mime_type.to_string();
        let record = self
            .run(move |db| db.write(&key, payload, &mime_type))
            .await?;
        debug!("Wrote {} ({})", record.key, record.mime_type);
        Ok(record)
    }

    // ==================== Bulk deletes ====================

    /// Delete every key whose directory is exactly `path`
    pub async fn delete_all_keys_at_path(&self, path: &str) -> StoreResult<usize> {
        self.delete_all_keys_at_path_except(path, &[]).await
    }

    /// Delete every key whose directory is exactly `path`, sparing `keep`
    pub async fn delete_all_keys_at_path_except(
        &self,
        path: &str,
        keep: &[String],
    ) -> StoreResult<usize> {
        let path = path.to_string();
        let keep: HashSet<String> = keep.iter().cloned().collect();
        let deleted = self
            .run(move |db| {
                let keys = without_kept(db.keys_at_path(&path)?, &keep);
                db.delete_many(&keys)
            })
            .await?;
        info!("Deleted {} record(s) at path", deleted);
        Ok(deleted)
    }

    // ==================== Renames ====================

    /// Rename `current` to `next`, carrying its descendants along
    ///
    /// The record itself gets a fresh `last_modified`; descendants under
    /// `current/` are moved to `next/` without touching theirs. Fails with
    /// `NotFound` if `current` does not exist.
    pub async fn rename_key(&self, current: &str, next: &str) -> StoreResult<Record> {
        if next.starts_with(&format!("{}/", current)) {
            return Err(StoreError::InvalidRename {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let (from, to) = (current.to_string(), next.to_string());
        let record = self.run(move |db| db.rename(&from, &to)).await?;
        let moved = self
            .rename_path(&format!("{}/", current), &format!("{}/", next))
            .await?;

        info!("Renamed {} to {} ({} descendant(s))", current, next, moved);
        Ok(record)
    }

    /// Move every key at or below `current_path` under `next_path`
    ///
    /// Keys are rewritten by swapping the leading prefix; timestamps and
    /// data versions are untouched. Without a trailing `/`, a key equal to
    /// `current_path` moves too. A target that already holds a record
    /// outside the moved set is overwritten.
    ///
    /// Every source record is read before anything is written, so a target
    /// that is also a source (`/a/b/b/c` -> `/a/b/c` when lifting `/a/b/`
    /// to `/a/`) never clobbers a record that has not moved yet. Each key
    /// then moves in its own transaction, all issued together; on failure
    /// some keys may already have moved. Returns the number of keys moved.
    pub async fn rename_path(&self, current_path: &str, next_path: &str) -> StoreResult<usize> {
        if current_path == next_path {
            return Ok(0);
        }

        let pattern = Regex::new(&path_prefix_pattern(current_path))?;
        if pattern.is_match(next_path) {
            return Err(StoreError::InvalidRename {
                from: current_path.to_string(),
                to: next_path.to_string(),
            });
        }

        let keys = self.get_all_keys_matching_regex(&pattern).await?;
        let records = self.run(move |db| db.snapshot(&keys)).await?;

        let planned: Vec<(Record, String)> = records
            .into_iter()
            .filter_map(|record| {
                let target = replace_prefix(&record.key, current_path, next_path)?;
                Some((record, target))
            })
            .collect();
        let targets: HashSet<String> = planned.iter().map(|(_, t)| t.clone()).collect();

        let moves = planned.into_iter().map(|(record, target)| {
            let vacate = !targets.contains(&record.key);
            let store = self.clone();
            async move {
                store
                    .run(move |db| db.place(&record, &target, vacate))
                    .await
            }
        });

        let moved = try_join_all(moves).await?.len();

        debug!("Moved {} key(s) from {} to {}", moved, current_path, next_path);
        Ok(moved)
    }

    // ==================== Lifecycle ====================

    /// Drop the whole database
    ///
    /// The connection is closed and the database file removed; the next
    /// operation starts from an empty store.
    pub async fn delete_database(&self) -> StoreResult<()> {
        let mut slot = self.inner.db.lock().await;
        slot.take();

        let name = self.inner.config.database_name();
        if let Some(file) = self.inner.config.location.database_file(&name) {
            for suffix in ["", "-wal", "-shm"] {
                let mut path = file.clone().into_os_string();
                path.push(suffix);
                let path = PathBuf::from(path);
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(source) => return Err(StoreError::Io { path, source }),
                }
            }
        }

        info!("Deleted database {}", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::now_millis;

    fn memory_store() -> Store {
        Store::new(StoreConfig::in_memory("test"))
    }

    fn legacy(key: &str, version: u32) -> Record {
        Record::next(
            None,
            key,
            Payload::Text("legacy".into()),
            TEXT_MIME_TYPE,
            version,
            now_millis(),
        )
    }

    #[test]
    fn test_database_name() {
        let config = StoreConfig::in_memory("notes").with_schema_version(3);
        assert_eq!(config.database_name(), "notes-3");
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = memory_store();
        let record = store.set_text("/k", "hello").await.unwrap();

        assert_eq!(store.get_text("/k").await.unwrap().as_deref(), Some("hello"));
        assert_eq!(record.mime_type, TEXT_MIME_TYPE);
        assert_eq!(record.app_data_version, DATA_VERSION);

        let t = record.last_modified;
        assert_eq!(
            store.get_text_if_modified("/k", t - 1).await.unwrap().as_deref(),
            Some("hello")
        );
        assert_eq!(store.get_text_if_modified("/k", t + 1).await.unwrap(), None);
        assert_eq!(store.get_text_if_modified("/k", t).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bytes_if_modified() {
        let store = memory_store();
        let record = store
            .set_bytes("/img/a.png", vec![137, 80, 78, 71], "image/png")
            .await
            .unwrap();

        assert_eq!(
            store
                .get_bytes_if_modified("/img/a.png", record.last_modified - 1)
                .await
                .unwrap(),
            Some(vec![137, 80, 78, 71])
        );
        assert_eq!(
            store
                .get_bytes_if_modified("/img/a.png", record.last_modified)
                .await
                .unwrap(),
            None
        );
        assert_eq!(store.get_text("/img/a.png").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_reads_as_none() {
        let store = memory_store();
        assert!(store.get("/nothing").await.unwrap().is_none());
        assert!(store.get_text("/nothing").await.unwrap().is_none());
        assert!(store.get_bytes_if_modified("/nothing", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rewrite_replaces_in_place() {
        let store = memory_store();
        let first = store.set_text("/docs/a", "one").await.unwrap();
        let second = store.set_text("/docs/a", "two").await.unwrap();

        assert!(second.last_modified > first.last_modified);
        assert_eq!(store.get_all_keys().await.unwrap(), vec!["/docs/a".to_string()]);
        assert_eq!(store.get_text("/docs/a").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_delete_absent_key_twice() {
        let store = memory_store();
        store.delete("/absent").await.unwrap();
        store.delete("/absent").await.unwrap();
        assert_eq!(store.delete_many(&["/absent".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keys_at_path_scenario() {
        let store = memory_store();
        store
            .set_bytes("/docs/report", vec![0x25, 0x50, 0x44, 0x46], "application/pdf")
            .await
            .unwrap();
        store.set_text("/docs/sub/inner", "x").await.unwrap();

        assert_eq!(
            store.get_all_keys_at_path("/docs/").await.unwrap(),
            vec!["/docs/report".to_string()]
        );

        let values = store.get_all_values_at_path("/docs/").await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_keys_matching_regex_is_repeatable() {
        let store = memory_store();
        for key in ["/a/one.md", "/a/two.txt", "/b/three.md"] {
            store.set_text(key, "x").await.unwrap();
        }

        let pattern = Regex::new(r"\.md$").unwrap();
        let first = store.get_all_keys_matching_regex(&pattern).await.unwrap();
        let second = store.get_all_keys_matching_regex(&pattern).await.unwrap();

        assert_eq!(first, vec!["/a/one.md".to_string(), "/b/three.md".to_string()]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let store = memory_store();
        let err = store.get_all_keys_matching("(unclosed").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn test_values_for_keys_preserves_order() {
        let store = memory_store();
        store.set_text("/x", "x").await.unwrap();
        store.set_text("/y", "y").await.unwrap();

        let keys = vec!["/y".to_string(), "/missing".to_string(), "/x".to_string()];
        let values = store.get_values_for_keys(&keys).await.unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0].as_ref().unwrap().key, "/y");
        assert!(values[1].is_none());
        assert_eq!(values[2].as_ref().unwrap().key, "/x");
    }

    #[tokio::test]
    async fn test_delete_all_keys_at_path_except() {
        let store = memory_store();
        for key in ["/p/a", "/p/b", "/p/c", "/p/deep/d", "/q/e"] {
            store.set_text(key, "x").await.unwrap();
        }

        let deleted = store
            .delete_all_keys_at_path_except("/p/", &["/p/b".to_string()])
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(
            store.get_all_keys().await.unwrap(),
            vec!["/p/b".to_string(), "/p/deep/d".to_string(), "/q/e".to_string()]
        );

        assert_eq!(store.delete_all_keys_at_path("/p/").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lazy_upgrade_on_read() {
        let upgrader = Upgrader::new()
            .with_step(1, 2, |r| {
                r.text = r.text.as_ref().map(|t| format!("{}+2", t));
                Ok(())
            })
            .with_step(2, 3, |r| {
                r.text = r.text.as_ref().map(|t| format!("{}+3", t));
                Ok(())
            });
        let store = Store::new(
            StoreConfig::in_memory("test")
                .with_data_version(3)
                .with_upgrader(upgrader),
        );
        store.put(legacy("/old", 1)).await.unwrap();

        let record = store.get("/old").await.unwrap().unwrap();
        assert_eq!(record.app_data_version, 3);
        assert_eq!(record.text.as_deref(), Some("legacy+2+3"));

        let persisted = store.get_raw("/old").await.unwrap().unwrap();
        assert_eq!(persisted.app_data_version, 3);
        assert_eq!(persisted.text, record.text);
    }

    #[tokio::test]
    async fn test_unbridgeable_version_fails() {
        let upgrader = Upgrader::new().with_step(1, 2, |_| Ok(()));
        let store = Store::new(
            StoreConfig::in_memory("test")
                .with_data_version(3)
                .with_upgrader(upgrader),
        );
        store.put(legacy("/old", 1)).await.unwrap();

        let err = store.get("/old").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnupgradableRecord { expected: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_newer_record_requires_reload() {
        let store = memory_store();
        store.put(legacy("/future", DATA_VERSION + 1)).await.unwrap();

        let err = store.get_text("/future").await.unwrap_err();
        assert!(err.is_reload_required());

        // one bad record fails the whole batch
        let keys = vec!["/future".to_string()];
        assert!(store.get_values_for_keys(&keys).await.is_err());
    }

    #[tokio::test]
    async fn test_rename_key_carries_descendants() {
        let store = memory_store();
        let leaf = store.set_text("/a/b", "leaf").await.unwrap();
        let child = store.set_text("/a/b/c", "child").await.unwrap();
        store.set_text("/a/b/d/e", "grandchild").await.unwrap();
        store.set_text("/a/bc", "sibling").await.unwrap();

        let renamed = store.rename_key("/a/b", "/a/z").await.unwrap();
        assert!(renamed.last_modified > leaf.last_modified);
        assert_eq!(renamed.path, "/a/");

        assert_eq!(
            store.get_all_keys().await.unwrap(),
            vec![
                "/a/bc".to_string(),
                "/a/z".to_string(),
                "/a/z/c".to_string(),
                "/a/z/d/e".to_string(),
            ]
        );

        let moved_child = store.get("/a/z/c").await.unwrap().unwrap();
        assert_eq!(moved_child.last_modified, child.last_modified);
        assert_eq!(moved_child.path, "/a/z/");
        assert_eq!(moved_child.text.as_deref(), Some("child"));
    }

    #[tokio::test]
    async fn test_rename_missing_key_fails() {
        let store = memory_store();
        store.set_text("/ghost/child", "x").await.unwrap();

        let err = store.rename_key("/ghost", "/spirit").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        // nothing moved
        assert!(store.get("/ghost/child").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rename_into_own_subtree_is_rejected() {
        let store = memory_store();
        store.set_text("/a", "x").await.unwrap();

        assert!(matches!(
            store.rename_key("/a", "/a/b").await.unwrap_err(),
            StoreError::InvalidRename { .. }
        ));
        assert!(matches!(
            store.rename_path("/a/", "/a/b/").await.unwrap_err(),
            StoreError::InvalidRename { .. }
        ));
        assert!(store.get("/a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rename_path_without_leaf() {
        let store = memory_store();
        let first = store.set_text("/a/b/c", "c").await.unwrap();
        store.set_text("/a/b/d/e", "e").await.unwrap();
        store.set_text("/a/bc", "sibling").await.unwrap();

        let moved = store.rename_path("/a/b", "/a/z").await.unwrap();
        assert_eq!(moved, 2);

        let keys = store.get_all_keys().await.unwrap();
        assert_eq!(
            keys,
            vec!["/a/bc".to_string(), "/a/z/c".to_string(), "/a/z/d/e".to_string()]
        );
        assert!(!keys.iter().any(|k| k.starts_with("/a/b/")));

        let c = store.get("/a/z/c").await.unwrap().unwrap();
        assert_eq!(c.last_modified, first.last_modified);
    }

    #[tokio::test]
    async fn test_rename_path_moves_leaf_equal_to_prefix() {
        let store = memory_store();
        store.set_text("/a/b", "leaf").await.unwrap();
        store.set_text("/a/b/c", "c").await.unwrap();

        assert_eq!(store.rename_path("/a/b", "/a/z").await.unwrap(), 2);
        assert_eq!(
            store.get_all_keys().await.unwrap(),
            vec!["/a/z".to_string(), "/a/z/c".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rename_path_is_best_effort_and_reapplicable() {
        let store = memory_store();
        for key in ["/src/1", "/src/2", "/src/3"] {
            store.set_text(key, key).await.unwrap();
        }

        // Simulate a batch interrupted after one move: no rollback exists,
        // so the store is left partially renamed.
        store
            .run(|db| {
                let record = db.get_raw("/src/2")?.ok_or(StoreError::NotFound {
                    key: "/src/2".to_string(),
                })?;
                db.place(&record, "/dst/2", true)
            })
            .await
            .unwrap();
        assert_eq!(store.get_all_keys_matching("^/src/").await.unwrap().len(), 2);

        // Re-running the rename finishes the job.
        assert_eq!(store.rename_path("/src/", "/dst/").await.unwrap(), 2);
        assert_eq!(store.rename_path("/src/", "/dst/").await.unwrap(), 0);
        assert_eq!(
            store.get_all_keys().await.unwrap(),
            vec!["/dst/1".to_string(), "/dst/2".to_string(), "/dst/3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rename_path_onto_own_parent() {
        let store = memory_store();
        store.set_text("/a/b/c", "orig-c").await.unwrap();
        store.set_text("/a/b/b/c", "orig-bc").await.unwrap();

        assert_eq!(store.rename_path("/a/b/", "/a/").await.unwrap(), 2);

        assert_eq!(
            store.get_all_keys().await.unwrap(),
            vec!["/a/b/c".to_string(), "/a/c".to_string()]
        );
        assert_eq!(store.get_text("/a/c").await.unwrap().as_deref(), Some("orig-c"));
        assert_eq!(
            store.get_text("/a/b/c").await.unwrap().as_deref(),
            Some("orig-bc")
        );
    }

    #[tokio::test]
    async fn test_rename_key_onto_own_parent() {
        let store = memory_store();
        store.set_text("/a/b", "leaf").await.unwrap();
        store.set_text("/a/b/b", "bb").await.unwrap();
        store.set_text("/a/b/c", "orig-c").await.unwrap();
        store.set_text("/a/b/b/c", "orig-bc").await.unwrap();

        store.rename_key("/a/b", "/a").await.unwrap();

        let mut contents = Vec::new();
        for key in store.get_all_keys().await.unwrap() {
            let text = store.get_text(&key).await.unwrap().unwrap();
            contents.push((key, text));
        }
        assert_eq!(
            contents,
            vec![
                ("/a".to_string(), "leaf".to_string()),
                ("/a/b".to_string(), "bb".to_string()),
                ("/a/b/c".to_string(), "orig-bc".to_string()),
                ("/a/c".to_string(), "orig-c".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_rename_path_replaces_existing_target() {
        let store = memory_store();
        store.set_text("/dst/x", "old").await.unwrap();
        store.set_text("/dst/y", "untouched").await.unwrap();
        let moving = store.set_text("/src/x", "new").await.unwrap();

        assert_eq!(store.rename_path("/src/", "/dst/").await.unwrap(), 1);

        let x = store.get("/dst/x").await.unwrap().unwrap();
        assert_eq!(x.text.as_deref(), Some("new"));
        assert_eq!(x.last_modified, moving.last_modified);
        assert_eq!(
            store.get_text("/dst/y").await.unwrap().as_deref(),
            Some("untouched")
        );
        assert_eq!(
            store.get_all_keys().await.unwrap(),
            vec!["/dst/x".to_string(), "/dst/y".to_string()]
        );
    }

    #[tokio::test]
    async fn test_clones_share_connection() {
        let store = memory_store();
        let other = store.clone();
        store.set_text("/shared", "x").await.unwrap();
        assert_eq!(other.get_text("/shared").await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_delete_database_resets_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new("app", Location::Directory(dir.path().to_path_buf()));
        let file = dir.path().join("app-1.sqlite");

        let store = Store::open(config.clone()).await.unwrap();
        store.set_text("/k", "v").await.unwrap();
        assert!(file.exists());

        store.delete_database().await.unwrap();
        assert!(!file.exists());

        assert!(store.get_all_keys().await.unwrap().is_empty());
        // dropping an already-missing database is fine
        store.delete_database().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new("app", Location::Directory(dir.path().to_path_buf()));

        {
            let store = Store::open(config.clone()).await.unwrap();
            store.set_text("/notes/a", "kept").await.unwrap();
        }

        let store = Store::open(config).await.unwrap();
        assert_eq!(store.get_text("/notes/a").await.unwrap().as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_open_fails_for_newer_structure() {
        let dir = tempfile::tempdir().unwrap();
        let location = Location::Directory(dir.path().to_path_buf());
        {
            let conn = rusqlite::Connection::open(dir.path().join("app-1.sqlite")).unwrap();
            crate::storage::init_schema(&conn, 2).unwrap();
        }

        let result = Store::open(StoreConfig::new("app", location)).await;
        assert!(matches!(
            result,
            Err(StoreError::StructuralSchemaMismatch { found: 2, expected: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let store = memory_store();
        assert_eq!(store.stats().await.unwrap().records, 0);

        store.set_text("/a", "abc").await.unwrap();
        assert_eq!(store.stats().await.unwrap().records, 1);
    }
}
