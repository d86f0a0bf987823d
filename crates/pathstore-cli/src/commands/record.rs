//! Single-record command handlers

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use pathstore_core::mime::extension_to_mime_type;
use pathstore_core::path::split_filename_and_extension;
use pathstore_core::record::TEXT_MIME_TYPE;
use pathstore_core::Store;

use crate::output::Output;

const BINARY_MIME_TYPE: &str = "application/octet-stream";

/// Show a record, or write its raw payload to stdout
pub async fn get(store: &Store, key: String, content_only: bool, output: &Output) -> Result<()> {
    let record = store
        .get(&key)
        .await
        .with_context(|| format!("Failed to read {}", key))?
        .ok_or_else(|| anyhow::anyhow!("No record at {}", key))?;

    if content_only {
        let mut stdout = io::stdout().lock();
        match (&record.text, &record.bytes) {
            (Some(text), _) => stdout.write_all(text.as_bytes())?,
            (None, Some(bytes)) => stdout.write_all(bytes)?,
            (None, None) => {}
        }
        stdout.flush()?;
        return Ok(());
    }

    output.print_record(&record);
    Ok(())
}

/// Where `put` takes its payload from
pub enum Source {
    Text(String),
    File(PathBuf),
    Stdin,
}

/// Write a record from text, a file, or stdin
pub async fn put(
    store: &Store,
    key: String,
    source: Source,
    mime: Option<String>,
    output: &Output,
) -> Result<()> {
    let record = match source {
        Source::Text(text) => {
            let mime = mime.unwrap_or_else(|| TEXT_MIME_TYPE.to_string());
            store.set_text_as(&key, text, &mime).await?
        }
        Source::Stdin => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            let mime = mime.unwrap_or_else(|| TEXT_MIME_TYPE.to_string());
            store.set_text_as(&key, text, &mime).await?
        }
        Source::File(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            let mime = mime.unwrap_or_else(|| guess_mime_type(&path).to_string());
            if mime.starts_with("text/") {
                match String::from_utf8(bytes) {
                    Ok(text) => store.set_text_as(&key, text, &mime).await?,
                    Err(e) => store.set_bytes(&key, e.into_bytes(), &mime).await?,
                }
            } else {
                store.set_bytes(&key, bytes, &mime).await?
            }
        }
    };

    output.success(&format!("Stored {} ({})", record.key, record.mime_type));
    Ok(())
}

/// Delete one or more keys
pub async fn remove(store: &Store, keys: Vec<String>, output: &Output) -> Result<()> {
    if keys.is_empty() {
        bail!("No keys given");
    }

    let deleted = store
        .delete_many(&keys)
        .await
        .context("Failed to delete keys")?;
    output.success(&format!("Deleted {} of {} key(s)", deleted, keys.len()));
    Ok(())
}

/// MIME type for a file, from its extension
fn guess_mime_type(path: &std::path::Path) -> &'static str {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (_, extension) = split_filename_and_extension(&name);
    extension_to_mime_type(&extension).unwrap_or(BINARY_MIME_TYPE)
}
