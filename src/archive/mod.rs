//! Archive adapter
//!
//! The database container is a plain tar file. Each entry body is deflate
//! compressed on its own at the configured level, so a single entry can be
//! read without touching the others and new entries can be appended without
//! rewriting the file.
//!
//! Tar has no way to remove or modify an entry. Appends overwrite the
//! end-of-archive marker in place; everything else goes through a
//! [`StagedArchive`]: a complete new container written to a temp file next
//! to the target, then renamed over it.
//!
//! # Contract
//!
//! - `list_entry_names` / `read_entries` return entries in append order
//! - `read_entry` returns the last entry with the given name
//! - `append_entry` adds one entry after the existing ones
//! - `write_archive` replaces the container with an ordered entry list
//! - `stage` does the same but leaves the final rename to the caller

mod compress;

pub use compress::{compress, decompress, MAX_COMPRESSION_LEVEL};

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tar::{Archive as TarReader, Builder, EntryType, Header};
use tempfile::NamedTempFile;

/// Tar block size
const BLOCK_SIZE: u64 = 512;

/// Names longer than this go into a GNU long-name extension entry
const GNU_NAME_LIMIT: usize = 100;

/// One named entry with its uncompressed bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name
    pub name: String,
    /// Uncompressed entry body
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    /// Create an entry
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Handle on one archive file.
///
/// Holds no open file: every call opens, uses and closes the file before
/// returning, on success and on error alike.
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    path: PathBuf,
    compression_level: u32,
}

impl ArchiveFile {
    /// Create a handle for the archive at `path`.
    pub fn new(path: impl Into<PathBuf>, compression_level: u32) -> Self {
        Self {
            path: path.into(),
            compression_level,
        }
    }

    /// Archive path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compression level used for new entries
    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    /// Whether the archive file exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Current archive size in bytes
    pub fn size(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Entry names in append order
    pub fn list_entry_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        self.scan(|name, _| {
            names.push(name);
            Ok(())
        })?;
        Ok(names)
    }

    /// Every entry in append order, decompressed
    pub fn read_entries(&self) -> io::Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        self.scan(|name, entry| {
            let mut packed = Vec::new();
            entry.read_to_end(&mut packed)?;
            entries.push(ArchiveEntry::new(name, decompress(&packed)?));
            Ok(())
        })?;
        Ok(entries)
    }

    /// Body of the last entry named `name`, if any
    pub fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let mut found = None;
        self.scan(|entry_name, entry| {
            if entry_name == name {
                let mut packed = Vec::new();
                entry.read_to_end(&mut packed)?;
                found = Some(packed);
            }
            Ok(())
        })?;
        found.map(|packed| decompress(&packed)).transpose()
    }

    /// Appends one entry in place and returns the new archive size.
    ///
    /// Only the end-of-archive marker is overwritten; existing entries are
    /// never touched. If the write fails part way, the file is truncated back
    /// to the previous last entry and the end marker is rewritten before the
    /// error is returned.
    pub fn append_entry(&self, name: &str, data: &[u8]) -> io::Result<u64> {
        let level = self.compression_level;
        self.append_with(|file| {
            let mut builder = Builder::new(file);
            append_compressed(&mut builder, name, data, level)?;
            builder.into_inner()?;
            Ok(())
        })
    }

    /// Positions a writable handle at the end of the last entry, runs
    /// `write`, then trims and syncs the file. Any failure rolls the file
    /// back to its previous entries.
    fn append_with<F>(&self, write: F) -> io::Result<u64>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let end = self.data_end()?;

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(end))?;

        let written = write(&mut file).and_then(|()| {
            let len = file.stream_position()?;
            file.set_len(len)?;
            file.sync_all()?;
            Ok(len)
        });

        match written {
            Ok(len) => Ok(len),
            Err(err) => match restore_end_marker(&mut file, end) {
                Ok(()) => Err(err),
                Err(restore) => Err(io::Error::new(
                    err.kind(),
                    format!("{}; end-of-archive marker not restored: {}", err, restore),
                )),
            },
        }
    }

    /// Bytes `append_entry(name, data)` would add to the archive: header,
    /// long-name extension when needed, and the padded compressed body.
    pub fn entry_footprint(&self, name: &str, data: &[u8]) -> io::Result<u64> {
        let packed = compress(data, self.compression_level)?;
        let mut footprint = BLOCK_SIZE + padded(packed.len() as u64);
        if name.len() > GNU_NAME_LIMIT {
            footprint += BLOCK_SIZE + padded(name.len() as u64 + 1);
        }
        Ok(footprint)
    }

    /// Writes a complete new archive holding `entries` to a temp file in the
    /// target's directory. Nothing at `self.path` changes until
    /// [`StagedArchive::commit`].
    pub fn stage(&self, entries: &[ArchiveEntry]) -> io::Result<StagedArchive> {
        let dir = parent_dir(&self.path);
        let mut temp = tempfile::Builder::new()
            .prefix(".arcdb-")
            .suffix(".tmp")
            .tempfile_in(&dir)?;

        {
            let writer = BufWriter::new(temp.as_file_mut());
            let mut builder = Builder::new(writer);
            for entry in entries {
                append_compressed(&mut builder, &entry.name, &entry.data, self.compression_level)?;
            }
            let mut writer = builder.into_inner()?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        let size = temp.as_file().metadata()?.len();
        Ok(StagedArchive {
            temp,
            target: self.path.clone(),
            size,
        })
    }

    /// Replaces the archive with a fresh one holding `entries` in order and
    /// returns its size. The parent directory is not synced.
    pub fn write_archive(&self, entries: &[ArchiveEntry]) -> io::Result<u64> {
        let staged = self.stage(entries)?;
        let size = staged.size();
        staged.commit()?;
        Ok(size)
    }

    /// Creates an archive with no entries
    pub fn create_empty(&self) -> io::Result<u64> {
        self.write_archive(&[])
    }

    /// Byte offset just past the last entry's data, where the next header
    /// belongs.
    fn data_end(&self) -> io::Result<u64> {
        let mut end = 0;
        self.scan(|_, entry| {
            end = entry.raw_file_position() + padded(entry.header().entry_size()?);
            Ok(())
        })?;
        Ok(end)
    }

    fn scan<F>(&self, mut visit: F) -> io::Result<()>
    where
        F: FnMut(String, &mut tar::Entry<'_, BufReader<File>>) -> io::Result<()>,
    {
        let file = File::open(&self.path)?;
        let mut reader = TarReader::new(BufReader::new(file));
        for entry in reader.entries()? {
            let mut entry = entry?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            visit(name, &mut entry)?;
        }
        Ok(())
    }
}

/// A fully written, fsynced archive waiting to replace its target.
///
/// Dropping it without committing deletes the temp file.
#[derive(Debug)]
pub struct StagedArchive {
    temp: NamedTempFile,
    target: PathBuf,
    size: u64,
}

impl StagedArchive {
    /// Size of the staged archive in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Temp file location
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically renames the staged archive over the target.
    ///
    /// On error the target is untouched and the temp file is removed.
    pub fn commit(self) -> io::Result<PathBuf> {
        self.temp.persist(&self.target).map_err(|e| e.error)?;
        Ok(self.target)
    }
}

/// fsync the directory holding `path` so a completed rename is durable.
pub fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let dir = parent_dir(path);
    // Directories cannot be opened for syncing on every platform.
    if cfg!(unix) {
        File::open(&dir)?.sync_all()?;
    }
    Ok(())
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Cut `file` back to `end` and write the two zero blocks that close a tar
/// archive.
fn restore_end_marker(file: &mut File, end: u64) -> io::Result<()> {
    file.set_len(end)?;
    file.seek(SeekFrom::Start(end))?;
    file.write_all(&[0u8; 2 * BLOCK_SIZE as usize])?;
    file.sync_all()
}

fn padded(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

fn append_compressed<W: Write>(
    builder: &mut Builder<W>,
    name: &str,
    data: &[u8],
    level: u32,
) -> io::Result<()> {
    let packed = compress(data, level)?;

    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(packed.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);

    builder.append_data(&mut header, name, packed.as_slice())
}
