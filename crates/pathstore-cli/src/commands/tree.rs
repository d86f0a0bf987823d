//! Path-level command handlers

use anyhow::{Context, Result};

use pathstore_core::Store;

use crate::output::Output;

/// List records directly under a path, or every key
pub async fn list(store: &Store, path: Option<String>, output: &Output) -> Result<()> {
    match path {
        Some(path) => {
            let records = store
                .get_all_values_at_path(&path)
                .await
                .with_context(|| format!("Failed to list {}", path))?;
            output.print_listing(&records);
        }
        None => {
            let keys = store.get_all_keys().await.context("Failed to list keys")?;
            output.print_keys(&keys);
        }
    }
    Ok(())
}

/// List keys matching a regular expression
pub async fn find(store: &Store, pattern: String, output: &Output) -> Result<()> {
    let keys = store
        .get_all_keys_matching(&pattern)
        .await
        .with_context(|| format!("Failed to search for {:?}", pattern))?;
    output.print_keys(&keys);
    Ok(())
}

/// Rename a key (with its descendants) or a bare path
pub async fn rename(
    store: &Store,
    from: String,
    to: String,
    path_only: bool,
    output: &Output,
) -> Result<()> {
    if path_only {
        let moved = store
            .rename_path(&from, &to)
            .await
            .with_context(|| format!("Failed to move {} to {}", from, to))?;
        output.success(&format!("Moved {} key(s) from {} to {}", moved, from, to));
    } else {
        let record = store
            .rename_key(&from, &to)
            .await
            .with_context(|| format!("Failed to rename {} to {}", from, to))?;
        output.success(&format!("Renamed {} to {}", from, record.key));
    }
    Ok(())
}

/// Delete every key directly under a path
pub async fn remove_path(
    store: &Store,
    path: String,
    except: Vec<String>,
    output: &Output,
) -> Result<()> {
    let deleted = store
        .delete_all_keys_at_path_except(&path, &except)
        .await
        .with_context(|| format!("Failed to delete keys at {}", path))?;
    output.success(&format!("Deleted {} key(s) at {}", deleted, path));
    Ok(())
}
