//! pathstore core library
//!
//! A path-keyed record store backed by SQLite. Keys double as virtual file
//! paths, records carry either text or bytes, and every record is upgraded
//! lazily to the application's current data format the first time it is
//! read.
//!
//! # Architecture
//!
//! - **SQLite**: one `records` table keyed by `key`, indexed on `path`
//! - **Store**: async facade; each call is one transaction on the blocking pool
//! - **Upgrader**: ordered per-record migration steps, applied on read
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open(StoreConfig::in_memory("notes")).await?;
//!
//! store.set_text("/drafts/intro", "hello").await?;
//! let names = store.get_all_keys_at_path("/drafts/").await?;
//!
//! store.rename_key("/drafts", "/published").await?;
//! ```
//!
//! # Modules
//!
//! - `store`: Async store handle (main entry point)
//! - `record`: The stored record and its builder
//! - `path`: Key/path/filename helpers
//! - `upgrade`: Data-version upgrade steps
//! - `versioning`: Structural and data version rules
//! - `storage`: SQLite schema, primitives and errors
//! - `mime`: MIME type <-> extension table
//! - `export`: Writing records out as files
//! - `config`: Application configuration

pub mod config;
pub mod export;
pub mod mime;
pub mod path;
pub mod record;
pub mod storage;
pub mod store;
pub mod upgrade;
pub mod versioning;

pub use config::Config;
pub use export::{export_path, ExportSummary};
pub use record::{Payload, Record};
pub use storage::{Location, StoreError, StoreResult, StoreStats};
pub use store::{Store, StoreConfig, DATA_VERSION};
pub use upgrade::Upgrader;
