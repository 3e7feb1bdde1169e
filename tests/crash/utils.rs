//! Crash testing utilities

use std::fs;
use std::path::{Path, PathBuf};

use arcdb::{Database, DatabaseConfig, Metadata};
use tempfile::TempDir;

/// Archive file name used by every scenario
pub const DB_FILE: &str = "crash.tar";

/// Create a temporary data directory for crash testing
pub fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Open the scenario database without auto-compaction
pub fn open_db(path: &Path) -> Database {
    let config = DatabaseConfig::new("crash_db", path).with_auto_compact(false);
    Database::new(config).unwrap()
}

/// Seed `dir` with a database holding `alpha` (two revisions, one stale)
/// and `beta`. Returns the archive path.
pub fn seed_database(dir: &Path) -> PathBuf {
    let path = dir.join(DB_FILE);
    let mut db = open_db(&path);
    db.insert("alpha", b"alpha-v1", Metadata::new()).unwrap();
    db.insert("beta", b"beta-v1", Metadata::new()).unwrap();
    db.update("alpha", b"alpha-v2", None, false).unwrap();
    assert_eq!(db.entry_count().unwrap(), 3);
    path
}

/// Leftover temp files in `dir`
pub fn temp_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().ends_with(".tmp"))
                .unwrap_or(false)
        })
        .collect()
}

/// Payload of `key` as text
pub fn payload(db: &mut Database, key: &str) -> String {
    db.get(key).unwrap().text().unwrap().to_string()
}
