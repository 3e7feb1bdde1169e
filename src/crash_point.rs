//! Crash point injection for testing durability
//!
//! When `ARCDB_CRASH_POINT` names a crash point, reaching that point
//! terminates the process immediately via `std::process::abort()`: no
//! cleanup, no unwinding, no destructors. Temp files stay on disk exactly as
//! a power loss would leave them.
//!
//! # Usage
//!
//! ```ignore
//! use arcdb::crash_point::{maybe_crash, points};
//!
//! maybe_crash(points::REBUILD_BEFORE_REPLACE);
//! ```
//!
//! ```bash
//! ARCDB_CRASH_POINT=rebuild_before_replace arcdb --config db.json compact
//! ```

use std::sync::OnceLock;

/// Environment variable naming the active crash point
pub const CRASH_POINT_ENV: &str = "ARCDB_CRASH_POINT";

/// Cache the crash point name to avoid repeated env var lookups
static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok())
        .as_deref()
}

/// Returns true if `ARCDB_CRASH_POINT` equals `name`.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Abort the process if the named crash point is enabled.
///
/// No-op when `ARCDB_CRASH_POINT` is unset or names another point.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    // Append path
    pub const APPEND_BEFORE_WRITE: &str = "append_before_write";
    pub const APPEND_AFTER_WRITE: &str = "append_after_write";

    // Rebuild path
    pub const REBUILD_BEFORE_STAGE: &str = "rebuild_before_stage";
    pub const REBUILD_BEFORE_REPLACE: &str = "rebuild_before_replace";
    pub const REBUILD_AFTER_REPLACE: &str = "rebuild_after_replace";

    // Backup
    pub const BACKUP_BEFORE_PERSIST: &str = "backup_before_persist";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[
            APPEND_BEFORE_WRITE,
            APPEND_AFTER_WRITE,
            REBUILD_BEFORE_STAGE,
            REBUILD_BEFORE_REPLACE,
            REBUILD_AFTER_REPLACE,
            BACKUP_BEFORE_PERSIST,
        ]
    }
}
