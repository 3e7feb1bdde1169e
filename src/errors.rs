//! Database error types
//!
//! Error codes:
//! - ARCDB_NOT_FOUND (ERROR severity)
//! - ARCDB_DUPLICATE_KEY (ERROR severity)
//! - ARCDB_CORRUPT_RECORD (FATAL severity)
//! - ARCDB_INTEGRITY (FATAL severity)
//! - ARCDB_DECRYPTION (ERROR severity)
//! - ARCDB_ENCRYPTION (ERROR severity)
//! - ARCDB_SIZE_LIMIT_EXCEEDED (ERROR severity)
//! - ARCDB_REBUILD_FAILED (ERROR severity)
//! - ARCDB_INVALID_CONFIG (ERROR severity)
//! - ARCDB_IO_ERROR (ERROR severity)
//! - ARCDB_BACKUP_FAILED (ERROR severity)
//!
//! FATAL applies to the affected record only: a corrupt or tampered entry is
//! never retried, but the database stays usable for every other key.

use std::fmt;
use std::io;

use crate::crypto::CipherError;
use crate::record::CodecError;

/// Severity levels for database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, database continues
    Error,
    /// Stored data is unusable and must not be retried
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Database error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// No live record for the key
    NotFound,
    /// Insert collided with a live record
    DuplicateKey,
    /// Entry framing is malformed
    CorruptRecord,
    /// Checksum mismatch after decryption
    Integrity,
    /// Wrong password or tampered ciphertext
    Decryption,
    /// Payload could not be sealed for writing
    Encryption,
    /// Configured max_size would be exceeded
    SizeLimitExceeded,
    /// Rebuild-and-replace sequence failed
    RebuildFailed,
    /// Configuration rejected
    InvalidConfig,
    /// Filesystem or archive I/O failure
    IoError,
    /// Backup copy failed
    BackupFailed,
}

impl DbErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            DbErrorCode::NotFound => "ARCDB_NOT_FOUND",
            DbErrorCode::DuplicateKey => "ARCDB_DUPLICATE_KEY",
            DbErrorCode::CorruptRecord => "ARCDB_CORRUPT_RECORD",
            DbErrorCode::Integrity => "ARCDB_INTEGRITY",
            DbErrorCode::Decryption => "ARCDB_DECRYPTION",
            DbErrorCode::Encryption => "ARCDB_ENCRYPTION",
            DbErrorCode::SizeLimitExceeded => "ARCDB_SIZE_LIMIT_EXCEEDED",
            DbErrorCode::RebuildFailed => "ARCDB_REBUILD_FAILED",
            DbErrorCode::InvalidConfig => "ARCDB_INVALID_CONFIG",
            DbErrorCode::IoError => "ARCDB_IO_ERROR",
            DbErrorCode::BackupFailed => "ARCDB_BACKUP_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            DbErrorCode::CorruptRecord | DbErrorCode::Integrity => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DbErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Database error with code, message and optional context
#[derive(Debug)]
pub struct DbError {
    code: DbErrorCode,
    message: String,
    details: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DbError {
    fn new(code: DbErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach key or path context
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// No live record for `key`
    pub fn not_found(key: &str) -> Self {
        Self::new(DbErrorCode::NotFound, "record does not exist").with_details(format!("key: {}", key))
    }

    /// Live record for `key` already exists
    pub fn duplicate_key(key: &str) -> Self {
        Self::new(DbErrorCode::DuplicateKey, "record already exists")
            .with_details(format!("key: {}", key))
    }

    /// Entry framing violation
    pub fn corrupt_record(entry: &str, source: CodecError) -> Self {
        Self::new(DbErrorCode::CorruptRecord, source.to_string())
            .with_details(format!("entry: {}", entry))
            .with_source(source)
    }

    /// Corrupt entry without a codec-level cause
    pub fn corrupt_entry(entry: &str, reason: impl Into<String>) -> Self {
        Self::new(DbErrorCode::CorruptRecord, reason).with_details(format!("entry: {}", entry))
    }

    /// Checksum mismatch for `key`
    pub fn integrity(key: &str) -> Self {
        Self::new(DbErrorCode::Integrity, "checksum mismatch")
            .with_details(format!("key: {}", key))
    }

    /// Decryption failed
    pub fn decryption(message: impl Into<String>, source: CipherError) -> Self {
        Self::new(DbErrorCode::Decryption, message).with_source(source)
    }

    /// Encryption failed on the write path
    pub fn encryption(message: impl Into<String>, source: CipherError) -> Self {
        Self::new(DbErrorCode::Encryption, message).with_source(source)
    }

    /// Size ceiling would be exceeded
    pub fn size_limit(required: u64, max_size: u64) -> Self {
        Self::new(
            DbErrorCode::SizeLimitExceeded,
            format!("database exceeds size limit of {} bytes", max_size),
        )
        .with_details(format!("required: {}", required))
    }

    /// Rebuild failed before the atomic replacement
    pub fn rebuild_failed_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::new(DbErrorCode::RebuildFailed, message).with_source(source)
    }

    /// Configuration rejected
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(DbErrorCode::InvalidConfig, message)
    }

    /// I/O failure
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(DbErrorCode::IoError, message).with_source(source)
    }

    /// Backup failed
    pub fn backup_failed(message: impl Into<String>) -> Self {
        Self::new(DbErrorCode::BackupFailed, message)
    }

    /// Backup failed with an I/O cause
    pub fn backup_io(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(DbErrorCode::BackupFailed, message).with_source(source)
    }

    /// Returns the error code
    pub fn code(&self) -> DbErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the affected record must be treated as unusable
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
