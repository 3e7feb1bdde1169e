//! CLI argument definitions using clap
//!
//! Commands:
//! - arcdb --config <path> init
//! - arcdb --config <path> insert <key> [--value <text> | --file <path>] [--meta k=v]...
//! - arcdb --config <path> get <key>
//! - arcdb --config <path> update <key> [--value <text> | --file <path>] [--meta k=v]... [--rebuild]
//! - arcdb --config <path> delete <key>
//! - arcdb --config <path> list
//! - arcdb --config <path> search <pattern>
//! - arcdb --config <path> compact
//! - arcdb --config <path> stats
//! - arcdb --config <path> backup <target> [--overwrite]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// arcdb - A record store inside a single archive file
#[derive(Parser, Debug)]
#[command(name = "arcdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./arcdb.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Payload source for insert and update
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Payload given inline as UTF-8 text
    #[arg(long)]
    pub value: Option<String>,

    /// Payload read from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database archive if it does not exist
    Init,

    /// Insert a new record
    Insert {
        /// Record key
        key: String,

        #[command(flatten)]
        payload: PayloadArgs,

        /// Metadata pair as name=value (repeatable)
        #[arg(long = "meta")]
        meta: Vec<String>,
    },

    /// Print a record
    Get {
        /// Record key
        key: String,
    },

    /// Write a new revision of a record
    Update {
        /// Record key
        key: String,

        #[command(flatten)]
        payload: PayloadArgs,

        /// Metadata pair as name=value (repeatable)
        #[arg(long = "meta")]
        meta: Vec<String>,

        /// Rewrite the archive instead of appending
        #[arg(long)]
        rebuild: bool,
    },

    /// Delete a record
    Delete {
        /// Record key
        key: String,
    },

    /// List all live keys
    List,

    /// List live keys containing a pattern
    Search {
        /// Substring to match
        pattern: String,
    },

    /// Reclaim stale entries
    Compact,

    /// Print archive statistics
    Stats,

    /// Copy the archive to another path
    Backup {
        /// Backup destination
        target: PathBuf,

        /// Replace an existing file at the destination
        #[arg(long)]
        overwrite: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
