//! Lazy record upgrades
//!
//! An `Upgrader` holds an ordered chain of steps, each moving a record from
//! one data version to a later one. Records are upgraded one at a time, the
//! first time they are read after the application's expected data version
//! has moved on.
//!
//! Steps only see the record being upgraded. Upgrades that must touch
//! several records together belong in caller-written transactions, which
//! can drive [`Upgrader::upgrade`] directly in whatever order they need.
//!
//! ```ignore
//! let upgrader = Upgrader::new()
//!     .with_step(1, 2, |record| {
//!         record.mime_type = record.mime_type.to_lowercase();
//!         Ok(())
//!     });
//! ```

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::record::Record;
use crate::storage::error::{StoreError, StoreResult};

type StepFn = dyn Fn(&mut Record) -> anyhow::Result<()> + Send + Sync;

struct UpgradeStep {
    to: u32,
    apply: Box<StepFn>,
}

/// Registry of data-version upgrade steps, keyed by source version
#[derive(Default)]
pub struct Upgrader {
    steps: BTreeMap<u32, UpgradeStep>,
}

impl Upgrader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the step that moves records from `from` to `to`
    ///
    /// Registering a second step for the same `from` replaces the first.
    pub fn with_step<F>(mut self, from: u32, to: u32, apply: F) -> Self
    where
        F: Fn(&mut Record) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.steps.insert(
            from,
            UpgradeStep {
                to,
                apply: Box::new(apply),
            },
        );
        self
    }

    /// Number of registered steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Bring `record` up to `expected`, in place
    ///
    /// Steps are followed from the record's current version in ascending
    /// order. The record's `app_data_version` is updated after every step.
    /// Fails with `UnupgradableRecord` if the chain ends anywhere other
    /// than `expected`.
    pub fn upgrade(&self, record: &mut Record, expected: u32) -> StoreResult<()> {
        while record.app_data_version < expected {
            let from = record.app_data_version;
            let Some(step) = self.steps.get(&from) else {
                break;
            };
            if step.to <= from {
                break;
            }

            (step.apply)(record).map_err(|e| StoreError::UpgradeStepFailed {
                key: record.key.clone(),
                from,
                to: step.to,
                details: format!("{:#}", e),
            })?;
            record.app_data_version = step.to;
            debug!("Upgraded {} from data version {} to {}", record.key, from, step.to);
        }

        if record.app_data_version != expected {
            return Err(StoreError::UnupgradableRecord {
                key: record.key.clone(),
                reached: record.app_data_version,
                expected,
            });
        }

        Ok(())
    }
}

impl fmt::Debug for Upgrader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|(from, step)| (*from, step.to)))
            .finish()
    }
}
