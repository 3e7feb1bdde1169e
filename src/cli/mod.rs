//! CLI module for arcdb
//!
//! Provides command-line access to one database:
//! - init: Create the archive
//! - insert / get / update / delete: Record operations
//! - list / search: Key listing
//! - compact / stats / backup: Maintenance

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, PayloadArgs};
pub use commands::{execute, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
