//! Observability for arcdb
//!
//! Structured logging through `tracing`. Every log line carries an `event`
//! field from [`Event`] so logs can be filtered by what happened rather than
//! by message text. The library never installs a subscriber; the `arcdb`
//! binary does (see [`init_logging`]).

mod events;

pub use events::Event;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive
pub const LOG_ENV: &str = "ARCDB_LOG";

/// Install a JSON subscriber on stderr.
///
/// The filter comes from `ARCDB_LOG` and falls back to `default_directive`.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
