//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};

use pathstore_core::{ExportSummary, Record, StoreStats};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a single record with its payload
    pub fn print_record(&self, record: &Record) {
        match self.format {
            OutputFormat::Human => {
                println!("Key:       {}", record.key);
                println!("Path:      {}", record.path);
                println!("Type:      {}", record.mime_type);
                println!("Version:   {}", record.app_data_version);
                println!("Modified:  {}", format_millis(record.last_modified));
                println!();
                match (&record.text, &record.bytes) {
                    (Some(text), _) => println!("{}", text),
                    (None, Some(bytes)) => println!("<{} bytes>", bytes.len()),
                    (None, None) => println!("<empty>"),
                }
            }
            OutputFormat::Json => {
                println!("{}", pretty(&record_json(record)));
            }
            OutputFormat::Quiet => {
                println!("{}", record.key);
            }
        }
    }

    /// Print a list of keys
    pub fn print_keys(&self, keys: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if keys.is_empty() {
                    println!("No keys found.");
                    return;
                }
                for key in keys {
                    println!("{}", key);
                }
                println!("\n{} key(s)", keys.len());
            }
            OutputFormat::Json => {
                println!("{}", pretty(&serde_json::json!(keys)));
            }
            OutputFormat::Quiet => {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print a directory listing
    pub fn print_listing(&self, records: &[Record]) {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No records found.");
                    return;
                }
                for record in records {
                    println!(
                        "{} | {} | {} | {}",
                        format_millis(record.last_modified),
                        truncate(&record.mime_type, 24),
                        payload_size(record),
                        record.key
                    );
                }
                println!("\n{} record(s)", records.len());
            }
            OutputFormat::Json => {
                let entries: Vec<_> = records.iter().map(record_summary_json).collect();
                println!("{}", pretty(&serde_json::json!(entries)));
            }
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.key);
                }
            }
        }
    }

    /// Print store statistics
    pub fn print_stats(&self, database: &str, stats: &StoreStats) {
        match self.format {
            OutputFormat::Human => {
                println!("Database: {}", database);
                println!();
                println!("Records:       {}", stats.records);
                println!("  text:        {}", stats.text_records);
                println!("  bytes:       {}", stats.byte_records);
                println!("Payload size:  {} bytes", stats.payload_bytes);
                println!(
                    "Last modified: {}",
                    stats
                        .last_modified
                        .map(format_millis)
                        .unwrap_or_else(|| "(never)".to_string())
                );
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    pretty(&serde_json::json!({"database": database, "stats": stats}))
                );
            }
            OutputFormat::Quiet => {
                println!("{}", stats.records);
            }
        }
    }

    /// Print the result of an export
    pub fn print_export(&self, summary: &ExportSummary) {
        match self.format {
            OutputFormat::Human => {
                for path in &summary.written {
                    println!("{}", path.display());
                }
                println!(
                    "\n{} file(s) written, {} skipped",
                    summary.written.len(),
                    summary.skipped.len()
                );
            }
            OutputFormat::Json => {
                println!("{}", pretty(&serde_json::json!(summary)));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn record_json(record: &Record) -> serde_json::Value {
    let mut value = record_summary_json(record);
    value["text"] = serde_json::json!(record.text);
    value["bytes_base64"] = serde_json::json!(record.bytes.as_ref().map(|b| BASE64.encode(b)));
    value
}

fn record_summary_json(record: &Record) -> serde_json::Value {
    serde_json::json!({
        "key": record.key,
        "path": record.path,
        "mime_type": record.mime_type,
        "app_data_version": record.app_data_version,
        "last_modified": record.last_modified,
    })
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn payload_size(record: &Record) -> String {
    let size = record
        .text
        .as_ref()
        .map(|t| t.len())
        .or_else(|| record.bytes.as_ref().map(|b| b.len()))
        .unwrap_or(0);
    format!("{:>8} B", size)
}

/// Format a millisecond timestamp for display
fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
