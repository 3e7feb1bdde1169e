//! Observable database events

use std::fmt;

/// Events emitted by the record store and the database facade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// New archive created with its header
    DatabaseCreated,
    /// Existing archive opened
    DatabaseOpened,
    /// Archive header version differs from the configured version
    VersionMismatch,

    // Record operations
    /// Record appended by insert
    RecordInsert,
    /// Record revision written by update
    RecordUpdate,
    /// Record removed by delete
    RecordDelete,
    /// Write rejected by the size ceiling
    SizeLimitRejected,
    /// Stored checksum did not match the payload
    IntegrityFailure,
    /// Payload could not be decrypted
    DecryptionFailure,
    /// Record entry name that does not parse
    MalformedEntry,

    // Rebuild
    /// Rebuild started
    RebuildStart,
    /// Rebuild replaced the archive
    RebuildComplete,
    /// Rebuild failed, original archive untouched
    RebuildFailed,
    /// Rename succeeded but the directory could not be synced
    ReplaceWarning,
    /// Compaction finished
    CompactComplete,
    /// Compaction found nothing to reclaim
    CompactSkipped,
    /// Compaction after a committed update or delete failed
    AutoCompactFailed,

    // Backup
    /// Backup copy written
    BackupComplete,
}

impl Event {
    /// Returns the event name used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DatabaseCreated => "DATABASE_CREATED",
            Event::DatabaseOpened => "DATABASE_OPENED",
            Event::VersionMismatch => "VERSION_MISMATCH",
            Event::RecordInsert => "RECORD_INSERT",
            Event::RecordUpdate => "RECORD_UPDATE",
            Event::RecordDelete => "RECORD_DELETE",
            Event::SizeLimitRejected => "SIZE_LIMIT_REJECTED",
            Event::IntegrityFailure => "INTEGRITY_FAILURE",
            Event::DecryptionFailure => "DECRYPTION_FAILURE",
            Event::MalformedEntry => "MALFORMED_ENTRY",
            Event::RebuildStart => "REBUILD_START",
            Event::RebuildComplete => "REBUILD_COMPLETE",
            Event::RebuildFailed => "REBUILD_FAILED",
            Event::ReplaceWarning => "REPLACE_WARNING",
            Event::CompactComplete => "COMPACT_COMPLETE",
            Event::CompactSkipped => "COMPACT_SKIPPED",
            Event::AutoCompactFailed => "AUTO_COMPACT_FAILED",
            Event::BackupComplete => "BACKUP_COMPLETE",
        }
    }

    /// Whether this event reports a failed or degraded operation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::SizeLimitRejected
                | Event::IntegrityFailure
                | Event::DecryptionFailure
                | Event::MalformedEntry
                | Event::RebuildFailed
                | Event::ReplaceWarning
                | Event::AutoCompactFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
