//! Status and reset command handlers

use anyhow::{Context, Result};

use pathstore_core::Store;

use crate::output::Output;
use crate::prompt::confirm;

/// Show what the store holds
pub async fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.stats().await.context("Failed to read store stats")?;
    output.print_stats(&store.config().database_name(), &stats);
    Ok(())
}

/// Drop the whole database
pub async fn reset(store: &Store, yes: bool, output: &Output) -> Result<()> {
    let name = store.config().database_name();
    let prompt = format!("Delete database {} and all records?", name);
    if !yes && (!output.should_prompt() || !confirm(&prompt)?) {
        output.message("Aborted. Pass --yes to delete without prompting.");
        return Ok(());
    }

    store
        .delete_database()
        .await
        .with_context(|| format!("Failed to delete database {}", name))?;
    output.success(&format!("Deleted database {}", name));
    Ok(())
}
