//! Export records as a directory tree
//!
//! Keys map directly onto relative file paths. A leaf name without an
//! extension gets one from the record's MIME type when the table knows it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::mime::mime_type_to_extension;
use crate::path::{key_to_name, path_prefix_pattern, split_filename_and_extension};
use crate::record::Record;
use crate::store::Store;

/// What an export wrote
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    /// Files written, in key order
    pub written: Vec<PathBuf>,
    /// Keys with no payload or no usable file name
    pub skipped: Vec<String>,
}

/// Relative file path a record exports to
///
/// `None` for keys ending in `/` or containing `.`/`..` segments.
pub fn export_file_path(record: &Record) -> Option<PathBuf> {
    let name = key_to_name(&record.key);
    if name.is_empty() {
        return None;
    }

    let mut path = PathBuf::new();
    for segment in record.key.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return None;
        }
        path.push(segment);
    }

    let (_, extension) = split_filename_and_extension(name);
    if extension.is_empty() {
        let extension = mime_type_to_extension(&record.mime_type);
        if !extension.is_empty() {
            path.set_file_name(format!("{}.{}", name, extension));
        }
    }

    Some(path)
}

/// Write every record at or below `prefix` into `dest`
///
/// File paths are planned before anything is written. A leaf whose file
/// would sit where another record needs a directory (`/docs/report` next to
/// `/docs/report/appendix`) is skipped, and when two keys map to the same
/// file (`/notes/a` as text/plain and `/notes/a.txt`) the first in key
/// order wins. Both land in `skipped`.
pub async fn export_path(store: &Store, prefix: &str, dest: &Path) -> Result<ExportSummary> {
    let pattern = Regex::new(&path_prefix_pattern(prefix))
        .with_context(|| format!("Invalid export prefix {:?}", prefix))?;
    let keys = store
        .get_all_keys_matching_regex(&pattern)
        .await
        .context("Failed to list keys for export")?;
    let records = store
        .get_values_for_keys(&keys)
        .await
        .context("Failed to read records for export")?;

    let mut summary = ExportSummary::default();
    let mut planned = Vec::new();
    for record in records.into_iter().flatten() {
        if record.text.is_none() && record.bytes.is_none() {
            summary.skipped.push(record.key);
            continue;
        }
        match export_file_path(&record) {
            Some(relative) => planned.push((record, relative)),
            None => {
                warn!("Skipping {}: no usable file name", record.key);
                summary.skipped.push(record.key);
            }
        }
    }

    let directories: HashSet<PathBuf> = planned
        .iter()
        .flat_map(|(_, relative)| relative.ancestors().skip(1))
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .collect();
    let mut claimed = HashSet::new();

    for (record, relative) in planned {
        if directories.contains(&relative) {
            warn!("Skipping {}: {:?} is needed as a directory", record.key, relative);
            summary.skipped.push(record.key);
            continue;
        }
        if !claimed.insert(relative.clone()) {
            warn!("Skipping {}: {:?} is already exported", record.key, relative);
            summary.skipped.push(record.key);
            continue;
        }

        let contents = match (&record.text, &record.bytes) {
            (Some(text), _) => text.as_bytes(),
            (None, Some(bytes)) => bytes.as_slice(),
            (None, None) => continue,
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        tokio::fs::write(&target, contents)
            .await
            .with_context(|| format!("Failed to write {:?}", target))?;
        summary.written.push(target);
    }

    info!(
        "Exported {} file(s) to {:?}, skipped {}",
        summary.written.len(),
        dest,
        summary.skipped.len()
    );
    Ok(summary)
}
