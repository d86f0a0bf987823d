//! Stored record model
//!
//! A `Record` is the atomic unit of storage. Its `path` is always derived
//! from its `key`, so records are only ever built through the constructors
//! here rather than by assigning fields one at a time.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::path::key_to_path;

/// Default MIME type for text payloads
pub const TEXT_MIME_TYPE: &str = "text/plain";

/// A single keyed value with its metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Unique key, structured as a virtual file path
    pub key: String,
    /// Directory portion of the key (see [`key_to_path`])
    pub path: String,
    /// Payload format version as of the last write or upgrade
    pub app_data_version: u32,
    /// Advisory content type
    pub mime_type: String,
    /// Milliseconds since the Unix epoch
    pub last_modified: i64,
    /// Text payload
    pub text: Option<String>,
    /// Binary payload
    pub bytes: Option<Vec<u8>>,
}

/// The active payload written by a content update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Record {
    /// Build the record that results from writing `payload` to `key`
    ///
    /// `prior` is the record currently stored under `key`, if any; it only
    /// feeds the timestamp so that `last_modified` strictly increases per key.
    pub fn next(
        prior: Option<&Record>,
        key: impl Into<String>,
        payload: Payload,
        mime_type: impl Into<String>,
        app_data_version: u32,
        now_ms: i64,
    ) -> Self {
        let key = key.into();
        let (text, bytes) = match payload {
            Payload::Text(text) => (Some(text), None),
            Payload::Bytes(bytes) => (None, Some(bytes)),
        };
        Self {
            path: key_to_path(&key).to_string(),
            key,
            app_data_version,
            mime_type: mime_type.into(),
            last_modified: next_timestamp(prior.map(|r| r.last_modified), now_ms),
            text,
            bytes,
        }
    }

    /// Copy of this record under a new key, with the path recomputed
    ///
    /// The timestamp is left alone: moves are structural, not content edits.
    pub fn moved_to(&self, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            path: key_to_path(&key).to_string(),
            key,
            ..self.clone()
        }
    }

    /// Whether this record was modified after `since` (milliseconds)
    pub fn modified_since(&self, since: i64) -> bool {
        self.last_modified > since
    }
}

/// Timestamp for a write following a record stamped `previous`
///
/// Never goes backwards and never repeats, even when two writes land in the
/// same millisecond or the wall clock steps back. Saturates at `i64::MAX`.
pub fn next_timestamp(previous: Option<i64>, now_ms: i64) -> i64 {
    match previous {
        Some(prev) if prev >= now_ms => prev.saturating_add(1),
        _ => now_ms,
    }
}

/// Current wall-clock time in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
