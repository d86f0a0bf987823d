//! Storage layer
//!
//! Handles the SQLite database behind the store.
//!
//! ## Architecture
//!
//! - **schema**: table/index definitions and the structural version stamp
//! - **database**: one-transaction-per-call record primitives
//! - **error**: typed failures shared by every layer above
//!
//! Nothing here is async; the [`Store`](crate::store::Store) moves calls
//! onto the blocking pool.

pub mod database;
pub mod error;
pub mod schema;

pub use database::{Database, Location, StoreStats};
pub use error::{StoreError, StoreResult};
pub use schema::{init_schema, SCHEMA_VERSION};
