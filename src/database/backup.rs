//! Backup copy
//!
//! The archive is copied into a temp file in the target's directory, fsynced
//! and then renamed onto the target, so a reader never sees a partial copy.

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use crate::archive::{parent_dir, sync_parent_dir};
use crate::crash_point::{maybe_crash, points};
use crate::errors::{DbError, DbResult};
use crate::observability::Event;

/// Copies `source` to `target` and returns the number of bytes copied.
///
/// Fails if `target` exists and `overwrite` is false, or if both paths name
/// the same file.
pub(super) fn copy_archive(source: &Path, target: &Path, overwrite: bool) -> DbResult<u64> {
    if target.exists() {
        if !overwrite {
            return Err(DbError::backup_failed("backup target already exists")
                .with_details(format!("path: {}", target.display())));
        }
        if same_file(source, target) {
            return Err(DbError::backup_failed("backup target is the database itself")
                .with_details(format!("path: {}", target.display())));
        }
    }

    let dir = parent_dir(target);
    let mut temp = tempfile::Builder::new()
        .prefix(".arcdb-backup-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| DbError::backup_io("failed to create temp file", e))?;

    let mut reader =
        File::open(source).map_err(|e| DbError::backup_io("failed to open database", e))?;
    let copied = io::copy(&mut reader, temp.as_file_mut())
        .map_err(|e| DbError::backup_io("failed to copy database", e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| DbError::backup_io("failed to sync backup", e))?;

    maybe_crash(points::BACKUP_BEFORE_PERSIST);

    let persisted = if overwrite {
        temp.persist(target)
    } else {
        temp.persist_noclobber(target)
    };
    persisted.map_err(|e| DbError::backup_io("failed to move backup into place", e.error))?;

    if let Err(e) = sync_parent_dir(target) {
        warn!(
            event = Event::ReplaceWarning.as_str(),
            path = %target.display(),
            error = %e,
            "backup written but directory sync failed"
        );
    }

    info!(
        event = Event::BackupComplete.as_str(),
        source = %source.display(),
        target = %target.display(),
        bytes = copied,
        "backup complete"
    );
    Ok(copied)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
