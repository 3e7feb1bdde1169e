//! arcdb CLI entry point
//!
//! Installs logging, then delegates everything to the CLI module. The CLI
//! has already written the JSON error response when it returns an error.

use arcdb::{cli, observability};

fn main() {
    observability::init_logging("warn");

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
