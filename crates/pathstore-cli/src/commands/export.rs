//! Export command handler

use std::path::PathBuf;

use anyhow::Result;

use pathstore_core::{export_path, Store};

use crate::output::Output;

/// Write records at or below `prefix` into `dest`
pub async fn export(store: &Store, prefix: String, dest: PathBuf, output: &Output) -> Result<()> {
    let summary = export_path(store, &prefix, &dest).await?;
    output.print_export(&summary);
    Ok(())
}
