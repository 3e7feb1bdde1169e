//! Record store engine

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{sync_parent_dir, ArchiveEntry, ArchiveFile, MAX_COMPRESSION_LEVEL};
use crate::crash_point::{maybe_crash, points};
use crate::crypto::Cipher;
use crate::errors::{DbError, DbResult};
use crate::observability::Event;
use crate::record::{
    checksum_hex, decode, encode, entry_name, Metadata, Record, META_CHECKSUM, META_CREATED_AT,
    META_PREVIOUS_CHECKSUM, META_SIZE, META_UPDATED_AT,
};

use super::header::{DatabaseHeader, HEADER_ENTRY};
use super::now_rfc3339;
use super::rebuild::{rebuild, Mutation};
use super::resolve::Resolution;

/// Settings the store needs to open or create an archive
#[derive(Clone)]
pub struct StoreOptions {
    /// Database name written into a new header
    pub name: String,
    /// Version tag written into a new header
    pub version: String,
    /// Encryption password, `None` for a plaintext database
    pub password: Option<String>,
    /// Deflate level for entry bodies (0-9)
    pub compression_level: u32,
    /// Archive size ceiling in bytes, 0 for unlimited
    pub max_size: u64,
}

impl StoreOptions {
    /// Options with default level, no limit and no password
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            password: None,
            compression_level: 6,
            max_size: 0,
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("compression_level", &self.compression_level)
            .field("max_size", &self.max_size)
            .finish()
    }
}

/// Point-in-time view of the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Keys with a live record
    pub live_records: usize,
    /// Physical record entries, stale ones included
    pub entries: usize,
    /// Superseded revisions a compaction would reclaim
    pub stale_entries: usize,
    /// Record entries with unparseable names, also dropped by compaction
    pub malformed_entries: usize,
    /// Archive file size
    pub size_bytes: u64,
}

/// Record store over one archive file.
///
/// Holds no file handle between calls. All state lives in the archive.
#[derive(Debug)]
pub struct RecordStore {
    archive: ArchiveFile,
    cipher: Cipher,
    header: DatabaseHeader,
    max_size: u64,
}

impl RecordStore {
    /// Opens the archive at `path`, creating it with a fresh header if it
    /// does not exist.
    pub fn open(path: impl Into<PathBuf>, options: StoreOptions) -> DbResult<Self> {
        if options.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(DbError::invalid_config(format!(
                "compression level {} outside 0-{}",
                options.compression_level, MAX_COMPRESSION_LEVEL
            )));
        }

        let archive = ArchiveFile::new(path, options.compression_level);
        let password = options.password.as_deref();

        let (header, cipher) = if archive.exists() {
            Self::open_existing(&archive, &options, password)?
        } else {
            Self::create(&archive, &options, password)?
        };

        Ok(Self {
            archive,
            cipher,
            header,
            max_size: options.max_size,
        })
    }

    fn create(
        archive: &ArchiveFile,
        options: &StoreOptions,
        password: Option<&str>,
    ) -> DbResult<(DatabaseHeader, Cipher)> {
        let (header, cipher) = DatabaseHeader::create(&options.name, &options.version, password)?;
        let entry = ArchiveEntry::new(HEADER_ENTRY, header.to_bytes()?);

        archive
            .write_archive(&[entry])
            .map_err(|e| DbError::io_error("failed to create archive", e))?;
        let target = archive.path();
        if let Err(e) = sync_parent_dir(target) {
            warn!(
                event = Event::ReplaceWarning.as_str(),
                path = %target.display(),
                error = %e,
                "archive created but directory sync failed"
            );
        }

        info!(
            event = Event::DatabaseCreated.as_str(),
            name = %header.name,
            path = %target.display(),
            encrypted = header.encrypted,
            "database created"
        );
        Ok((header, cipher))
    }

    fn open_existing(
        archive: &ArchiveFile,
        options: &StoreOptions,
        password: Option<&str>,
    ) -> DbResult<(DatabaseHeader, Cipher)> {
        let data = archive
            .read_entry(HEADER_ENTRY)
            .map_err(|e| read_failure(HEADER_ENTRY, e))?
            .ok_or_else(|| DbError::corrupt_entry(HEADER_ENTRY, "missing database header"))?;
        let header = DatabaseHeader::from_bytes(&data)?;

        let cipher = header.unlock(password).map_err(|e| {
            warn!(
                event = Event::DecryptionFailure.as_str(),
                path = %archive.path().display(),
                code = e.code().code(),
                "database could not be unlocked"
            );
            e
        })?;

        if header.version != options.version {
            warn!(
                event = Event::VersionMismatch.as_str(),
                stored = %header.version,
                configured = %options.version,
                "database version differs from configuration"
            );
        }

        info!(
            event = Event::DatabaseOpened.as_str(),
            name = %header.name,
            path = %archive.path().display(),
            encrypted = header.encrypted,
            "database opened"
        );
        Ok((header, cipher))
    }

    /// Archive path
    pub fn path(&self) -> &Path {
        self.archive.path()
    }

    /// Header read or written when the store was opened
    pub fn header(&self) -> &DatabaseHeader {
        &self.header
    }

    /// Whether payloads are encrypted
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_encrypted()
    }

    /// Adds a new record. Fails with `DuplicateKey` if `key` is live.
    pub fn insert(&mut self, key: &str, payload: &[u8], metadata: Metadata) -> DbResult<()> {
        let resolution = self.resolve()?;
        if resolution.contains(key) {
            return Err(DbError::duplicate_key(key));
        }

        let now = now_rfc3339();
        let mut record = Record::new(key, payload, metadata);
        stamp(&mut record, now.clone(), now);

        let seq = resolution.next_seq(key);
        let name = entry_name(key, seq);
        let frame = self.seal(&name, &record)?;
        self.append(&name, &frame)?;

        info!(
            event = Event::RecordInsert.as_str(),
            key,
            seq,
            size = payload.len(),
            "record inserted"
        );
        Ok(())
    }

    /// Reads, decrypts and verifies the live record for `key`.
    pub fn get(&self, key: &str) -> DbResult<Record> {
        let resolution = self.resolve()?;
        self.load(&resolution, key)
    }

    /// Writes a new revision of `key`.
    ///
    /// `metadata` of `None` keeps the previous metadata; otherwise the given
    /// pairs are merged over it. With `rebuild` the archive is rewritten so
    /// that the new revision is the only entry for `key`; without it the new
    /// revision is appended and the old one stays behind as a stale entry.
    pub fn update(
        &mut self,
        key: &str,
        payload: &[u8],
        metadata: Option<Metadata>,
        rebuild_archive: bool,
    ) -> DbResult<()> {
        let resolution = self.resolve()?;
        let previous = self.load(&resolution, key)?;

        let now = now_rfc3339();
        let created_at = previous
            .metadata
            .get(META_CREATED_AT)
            .cloned()
            .unwrap_or_else(|| now.clone());

        let mut merged = previous.metadata;
        if let Some(metadata) = metadata {
            merged.extend(metadata);
        }

        let mut record = Record::new(key, payload, merged);
        stamp(&mut record, created_at, now);
        record.metadata.insert(
            META_PREVIOUS_CHECKSUM.to_string(),
            checksum_hex(&previous.checksum),
        );

        let seq = resolution.next_seq(key);
        let name = entry_name(key, seq);
        let frame = self.seal(&name, &record)?;

        if rebuild_archive {
            self.check_entry_size(&frame)?;
            let mutation = Mutation::Replace {
                key: key.to_string(),
                entry: ArchiveEntry::new(name, frame),
            };
            rebuild(&self.archive, mutation, self.max_size)?;
        } else {
            self.append(&name, &frame)?;
        }

        info!(
            event = Event::RecordUpdate.as_str(),
            key,
            seq,
            rebuild = rebuild_archive,
            size = payload.len(),
            "record updated"
        );
        Ok(())
    }

    /// Removes every entry for `key`. The archive is not rewritten when the
    /// key is absent.
    pub fn delete(&mut self, key: &str) -> DbResult<()> {
        let resolution = self.resolve()?;
        let Some(live) = resolution.get(key) else {
            return Err(DbError::not_found(key));
        };
        let entries = live.entries;

        rebuild(
            &self.archive,
            Mutation::Delete {
                key: key.to_string(),
            },
            self.max_size,
        )?;

        info!(
            event = Event::RecordDelete.as_str(),
            key,
            entries,
            "record deleted"
        );
        Ok(())
    }

    /// Drops every stale or malformed entry and returns how many were
    /// reclaimed.
    pub fn compact(&mut self) -> DbResult<usize> {
        let resolution = self.resolve()?;
        if resolution.reclaimable() == 0 {
            debug!(
                event = Event::CompactSkipped.as_str(),
                live = resolution.live_count(),
                "nothing to compact"
            );
            return Ok(0);
        }

        let outcome = rebuild(&self.archive, Mutation::Compact, self.max_size)?;

        info!(
            event = Event::CompactComplete.as_str(),
            reclaimed = outcome.reclaimed,
            size_bytes = outcome.size,
            "compaction complete"
        );
        Ok(outcome.reclaimed)
    }

    /// Live keys containing `pattern`, in order of each key's first entry.
    pub fn search(&self, pattern: &str) -> DbResult<Vec<String>> {
        let resolution = self.resolve()?;
        Ok(resolution
            .keys()
            .filter(|key| key.contains(pattern))
            .map(str::to_string)
            .collect())
    }

    /// All live keys
    pub fn list_records(&self) -> DbResult<Vec<String>> {
        self.search("")
    }

    /// Whether `key` has a live record
    pub fn contains(&self, key: &str) -> DbResult<bool> {
        Ok(self.resolve()?.contains(key))
    }

    /// Physical record entries, stale ones included
    pub fn entry_count(&self) -> DbResult<usize> {
        Ok(self.resolve()?.record_entries())
    }

    /// Current archive statistics
    pub fn stats(&self) -> DbResult<StoreStats> {
        let resolution = self.resolve()?;
        let size_bytes = self
            .archive
            .size()
            .map_err(|e| DbError::io_error("failed to stat archive", e))?;

        Ok(StoreStats {
            live_records: resolution.live_count(),
            entries: resolution.record_entries(),
            stale_entries: resolution.stale_entries(),
            malformed_entries: resolution.malformed_entries(),
            size_bytes,
        })
    }

    fn resolve(&self) -> DbResult<Resolution> {
        let names = self
            .archive
            .list_entry_names()
            .map_err(|e| DbError::io_error("failed to read archive", e))?;
        Ok(Resolution::from_names(names.iter().map(String::as_str)))
    }

    fn load(&self, resolution: &Resolution, key: &str) -> DbResult<Record> {
        let live = resolution.get(key).ok_or_else(|| DbError::not_found(key))?;

        let frame = self
            .archive
            .read_entry(&live.name)
            .map_err(|e| read_failure(&live.name, e))?
            .ok_or_else(|| DbError::corrupt_entry(&live.name, "entry disappeared during read"))?;

        let stored = decode(&frame).map_err(|e| DbError::corrupt_record(&live.name, e))?;
        if stored.key != key {
            return Err(DbError::corrupt_entry(
                &live.name,
                "frame key does not match entry name",
            ));
        }

        let payload = self.cipher.decrypt(&stored.payload).map_err(|e| {
            warn!(
                event = Event::DecryptionFailure.as_str(),
                key,
                entry = %live.name,
                "payload could not be decrypted"
            );
            DbError::decryption("failed to decrypt payload", e).with_details(format!("key: {}", key))
        })?;

        let record = Record { payload, ..stored };
        if !record.validate() {
            warn!(
                event = Event::IntegrityFailure.as_str(),
                key,
                entry = %live.name,
                "checksum mismatch"
            );
            return Err(DbError::integrity(key));
        }
        Ok(record)
    }

    /// Encrypt the payload and frame the record
    fn seal(&self, name: &str, record: &Record) -> DbResult<Vec<u8>> {
        let payload = self
            .cipher
            .encrypt(&record.payload)
            .map_err(|e| DbError::encryption("failed to encrypt payload", e))?;
        let sealed = Record {
            payload,
            ..record.clone()
        };
        encode(&sealed).map_err(|e| DbError::corrupt_record(name, e))
    }

    fn check_entry_size(&self, frame: &[u8]) -> DbResult<()> {
        let len = frame.len() as u64;
        if self.max_size > 0 && len > self.max_size {
            return Err(self.reject(len));
        }
        Ok(())
    }

    fn append(&self, name: &str, frame: &[u8]) -> DbResult<()> {
        self.check_entry_size(frame)?;

        if self.max_size > 0 {
            let current = self
                .archive
                .size()
                .map_err(|e| DbError::io_error("failed to stat archive", e))?;
            let footprint = self
                .archive
                .entry_footprint(name, frame)
                .map_err(|e| DbError::io_error("failed to measure entry", e))?;
            let projected = current + footprint;
            if projected > self.max_size {
                return Err(self.reject(projected));
            }
        }

        maybe_crash(points::APPEND_BEFORE_WRITE);
        let size = self
            .archive
            .append_entry(name, frame)
            .map_err(|e| DbError::io_error("failed to append entry", e))?;
        maybe_crash(points::APPEND_AFTER_WRITE);

        debug!(entry = name, size_bytes = size, "entry appended");
        Ok(())
    }

    fn reject(&self, required: u64) -> DbError {
        warn!(
            event = Event::SizeLimitRejected.as_str(),
            required,
            max_size = self.max_size,
            "write rejected by size limit"
        );
        DbError::size_limit(required, self.max_size)
    }
}

/// Set the metadata the store maintains
fn stamp(record: &mut Record, created_at: String, updated_at: String) {
    let size = record.payload.len().to_string();
    let checksum = checksum_hex(&record.checksum);
    let metadata = &mut record.metadata;
    metadata.insert(META_CREATED_AT.to_string(), created_at);
    metadata.insert(META_UPDATED_AT.to_string(), updated_at);
    metadata.insert(META_SIZE.to_string(), size);
    metadata.insert(META_CHECKSUM.to_string(), checksum);
}

/// Undecompressable entry bodies are corruption; everything else is I/O.
fn read_failure(entry: &str, err: io::Error) -> DbError {
    if matches!(
        err.kind(),
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput
    ) {
        DbError::corrupt_entry(entry, format!("entry body unreadable: {}", err))
    } else {
        DbError::io_error("failed to read archive", err)
    }
}
