//! Rebuild protocol
//!
//! 1. Read every entry in append order
//! 2. Resolve each key to its winning entry
//! 3. Apply the pending mutation (drop a key, replace a key, or nothing) and
//!    drop record entries whose names do not parse
//! 4. Write the result into a temp archive next to the original and fsync it
//! 5. Rename the temp archive over the original
//! 6. fsync the parent directory
//!
//! Any failure up to and including step 5 leaves the original archive
//! untouched and removes the temp file. A failure in step 6 happens after
//! the new archive is already in place and is only logged.

use std::collections::HashMap;
use std::mem;

use tracing::{debug, error, info, warn};

use crate::archive::{sync_parent_dir, ArchiveEntry, ArchiveFile};
use crate::crash_point::{maybe_crash, points};
use crate::errors::{DbError, DbErrorCode, DbResult};
use crate::observability::Event;
use crate::record::{is_record_entry, parse_entry_name};

use super::resolve::Resolution;

/// Change applied while rewriting the archive
#[derive(Debug)]
pub(super) enum Mutation {
    /// Liveness resolution only
    Compact,
    /// Drop every entry for the key
    Delete { key: String },
    /// Emit `entry` in place of every entry for the key
    Replace { key: String, entry: ArchiveEntry },
}

impl Mutation {
    fn key(&self) -> Option<&str> {
        match self {
            Mutation::Compact => None,
            Mutation::Delete { key } | Mutation::Replace { key, .. } => Some(key),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Mutation::Compact => "compact",
            Mutation::Delete { .. } => "delete",
            Mutation::Replace { .. } => "replace",
        }
    }

    /// Only a mutation that writes a new payload is subject to the size ceiling.
    fn enforces_size(&self) -> bool {
        matches!(self, Mutation::Replace { .. })
    }
}

/// Result of a committed rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RebuildOutcome {
    /// Physical record entries that did not survive
    pub reclaimed: usize,
    /// Size of the new archive in bytes
    pub size: u64,
}

/// Rewrite `archive` with `mutation` applied.
///
/// `max_size` of zero disables the size check.
pub(super) fn rebuild(
    archive: &ArchiveFile,
    mutation: Mutation,
    max_size: u64,
) -> DbResult<RebuildOutcome> {
    let label = mutation.label();
    info!(
        event = Event::RebuildStart.as_str(),
        mutation = label,
        path = %archive.path().display(),
        "rebuild started"
    );

    let result = rebuild_inner(archive, mutation, max_size);

    match &result {
        Ok(outcome) => info!(
            event = Event::RebuildComplete.as_str(),
            mutation = label,
            reclaimed = outcome.reclaimed,
            size_bytes = outcome.size,
            "rebuild complete"
        ),
        Err(err) if err.code() == DbErrorCode::SizeLimitExceeded => warn!(
            event = Event::SizeLimitRejected.as_str(),
            mutation = label,
            max_size,
            "rebuild rejected by size limit"
        ),
        Err(err) => error!(
            event = Event::RebuildFailed.as_str(),
            mutation = label,
            code = err.code().code(),
            error = %err,
            "rebuild failed, archive unchanged"
        ),
    }

    result
}

fn rebuild_inner(
    archive: &ArchiveFile,
    mutation: Mutation,
    max_size: u64,
) -> DbResult<RebuildOutcome> {
    let mut entries = archive
        .read_entries()
        .map_err(|e| DbError::rebuild_failed_with("failed to read archive", e))?;

    let resolution = Resolution::from_names(entries.iter().map(|e| e.name.as_str()));
    if let Some(key) = mutation.key() {
        if !resolution.contains(key) {
            return Err(DbError::not_found(key));
        }
    }

    let enforce_size = mutation.enforces_size() && max_size > 0;
    let output = plan(&mut entries, &resolution, mutation);
    let kept_records = output
        .iter()
        .filter(|e| parse_entry_name(&e.name).is_some())
        .count();
    let reclaimed = (resolution.record_entries() + resolution.malformed_entries())
        .saturating_sub(kept_records);
    debug!(
        entries_in = entries.len(),
        entries_out = output.len(),
        reclaimed,
        "rebuild planned"
    );

    maybe_crash(points::REBUILD_BEFORE_STAGE);

    let staged = archive
        .stage(&output)
        .map_err(|e| DbError::rebuild_failed_with("failed to write temp archive", e))?;
    let size = staged.size();

    if enforce_size && size > max_size {
        // Dropping the staged archive removes the temp file.
        return Err(DbError::size_limit(size, max_size));
    }

    maybe_crash(points::REBUILD_BEFORE_REPLACE);

    let target = staged
        .commit()
        .map_err(|e| DbError::rebuild_failed_with("failed to replace archive", e))?;

    maybe_crash(points::REBUILD_AFTER_REPLACE);

    if let Err(e) = sync_parent_dir(&target) {
        warn!(
            event = Event::ReplaceWarning.as_str(),
            path = %target.display(),
            error = %e,
            "archive replaced but directory sync failed"
        );
    }

    Ok(RebuildOutcome { reclaimed, size })
}

/// Build the output entry list.
///
/// Each live key is written once, at the position of its first physical
/// entry, so key order survives the rewrite. Non-record entries keep their
/// first position and their last body. Malformed record entries are dropped.
fn plan(
    entries: &mut [ArchiveEntry],
    resolution: &Resolution,
    mutation: Mutation,
) -> Vec<ArchiveEntry> {
    let mut output: Vec<ArchiveEntry> = Vec::with_capacity(resolution.live_count() + 1);
    let mut other_slots: HashMap<String, usize> = HashMap::new();

    let (target, mut replacement) = match mutation {
        Mutation::Compact => (None, None),
        Mutation::Delete { key } => (Some(key), None),
        Mutation::Replace { key, entry } => (Some(key), Some(entry)),
    };

    for position in 0..entries.len() {
        let Some(parsed) = parse_entry_name(&entries[position].name) else {
            if is_record_entry(&entries[position].name) {
                continue;
            }
            let name = entries[position].name.clone();
            let data = mem::take(&mut entries[position].data);
            match other_slots.get(&name) {
                Some(&slot) => output[slot].data = data,
                None => {
                    other_slots.insert(name.clone(), output.len());
                    output.push(ArchiveEntry::new(name, data));
                }
            }
            continue;
        };

        let Some(live) = resolution.get(&parsed.key) else {
            continue;
        };
        if live.first_position != position {
            continue;
        }

        if target.as_deref() == Some(parsed.key.as_str()) {
            if let Some(entry) = replacement.take() {
                output.push(entry);
            }
            continue;
        }

        let winner = &mut entries[live.position];
        output.push(ArchiveEntry::new(
            winner.name.clone(),
            mem::take(&mut winner.data),
        ));
    }

    output
}
