//! Version reconciliation rules
//!
//! Two counters are tracked independently:
//!
//! - **Structural version**: the shape of the database (tables, indexes).
//!   Checked once when the connection is opened.
//! - **Data version**: the format of a record's payload. Checked on every
//!   record read.

use crate::storage::error::{StoreError, StoreResult};

/// What to do with a database on open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralAction {
    /// Fresh database: create the schema
    Create,
    /// Database matches the code
    Reuse,
    /// Database predates the code: apply the idempotent schema and restamp
    Restamp { from: u32 },
}

/// Decide how to treat a database whose recorded version is `found`
///
/// A database newer than the code is fatal; migrating structure
/// downwards is not implemented.
pub fn check_structural(
    database: &str,
    found: Option<u32>,
    expected: u32,
) -> StoreResult<StructuralAction> {
    match found {
        None => Ok(StructuralAction::Create),
        Some(v) if v == expected => Ok(StructuralAction::Reuse),
        Some(v) if v < expected => Ok(StructuralAction::Restamp { from: v }),
        Some(v) => Err(StoreError::StructuralSchemaMismatch {
            database: database.to_string(),
            found: v,
            expected,
        }),
    }
}

/// What to do with a record read at data version `found`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataVersionAction {
    /// Return as-is
    Current,
    /// Run through the upgrader and persist before returning
    Upgrade,
    /// Written by a newer application
    TooNew,
}

pub fn classify_data_version(found: u32, expected: u32) -> DataVersionAction {
    use std::cmp::Ordering;

    match found.cmp(&expected) {
        Ordering::Equal => DataVersionAction::Current,
        Ordering::Less => DataVersionAction::Upgrade,
        Ordering::Greater => DataVersionAction::TooNew,
    }
}
