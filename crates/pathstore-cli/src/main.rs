//! pathstore CLI
//!
//! Command-line interface for pathstore - a path-keyed record store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pathstore_core::{Config, Store, StoreConfig};

mod commands;
mod logging;
mod output;
mod prompt;

use commands::record::Source;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pathstore")]
#[command(about = "pathstore - path-keyed record storage")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a record
    Get {
        key: String,
        /// Print only the payload
        #[arg(short, long)]
        content: bool,
    },
    /// Store a record (reads stdin when neither --text nor --file is given)
    Put {
        key: String,
        /// Text payload
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,
        /// Read the payload from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// MIME type (guessed from --file, text/plain otherwise)
        #[arg(short, long)]
        mime: Option<String>,
    },
    /// List records directly under a path, or every key
    #[command(alias = "list")]
    Ls {
        /// Directory path, e.g. /docs/
        path: Option<String>,
    },
    /// List keys matching a regular expression
    Find { pattern: String },
    /// Rename a key together with its descendants
    Mv {
        from: String,
        to: String,
        /// Move a bare path prefix; no record needs to exist at FROM
        #[arg(long)]
        path: bool,
    },
    /// Delete keys
    Rm {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Delete every key directly under a path
    RmPath {
        path: String,
        /// Keys to keep
        #[arg(short, long)]
        except: Vec<String>,
    },
    /// Write records at or below a path into a directory
    Export { path: String, dest: PathBuf },
    /// Show store statistics
    Status,
    /// Delete the whole database
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, app_id, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    logging::init(&config);

    let store = Store::open(StoreConfig::from_config(&config))
        .await
        .with_context(|| format!("Failed to open store in {:?}", config.data_dir))?;

    match cli.command {
        Commands::Get { key, content } => commands::record::get(&store, key, content, &output).await,
        Commands::Put {
            key,
            text,
            file,
            mime,
        } => {
            let source = match (text, file) {
                (Some(text), _) => Source::Text(text),
                (None, Some(file)) => Source::File(file),
                (None, None) => Source::Stdin,
            };
            commands::record::put(&store, key, source, mime, &output).await
        }
        Commands::Ls { path } => commands::tree::list(&store, path, &output).await,
        Commands::Find { pattern } => commands::tree::find(&store, pattern, &output).await,
        Commands::Mv { from, to, path } => {
            commands::tree::rename(&store, from, to, path, &output).await
        }
        Commands::Rm { keys } => commands::record::remove(&store, keys, &output).await,
        Commands::RmPath { path, except } => {
            commands::tree::remove_path(&store, path, except, &output).await
        }
        Commands::Export { path, dest } => {
            commands::export::export(&store, path, dest, &output).await
        }
        Commands::Status => commands::status::show(&store, &output).await,
        Commands::Reset { yes } => commands::status::reset(&store, yes, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mv_path() {
        let cli = Cli::try_parse_from(["pathstore", "mv", "/a/b", "/a/z", "--path"]).unwrap();
        match cli.command {
            Commands::Mv { from, to, path } => {
                assert_eq!((from.as_str(), to.as_str(), path), ("/a/b", "/a/z", true));
            }
            _ => panic!("expected mv"),
        }
    }

    #[test]
    fn test_put_text_conflicts_with_file() {
        let result =
            Cli::try_parse_from(["pathstore", "put", "/k", "--text", "x", "--file", "f.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rm_requires_keys() {
        assert!(Cli::try_parse_from(["pathstore", "rm"]).is_err());
    }
}
