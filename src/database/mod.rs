//! Database facade
//!
//! Validates configuration, opens the record store on first use and applies
//! the auto-compact policy. All record operations go through here.
//!
//! # Usage
//!
//! ```ignore
//! use arcdb::{Database, DatabaseConfig};
//!
//! let config = DatabaseConfig::new("inventory", "./inventory.tar").with_password("secret");
//! let mut db = Database::new(config)?;
//! db.insert("sku-1", b"{\"qty\": 4}", Default::default())?;
//! let record = db.get("sku-1")?;
//! ```

mod backup;
mod config;

pub use config::DatabaseConfig;

use std::path::Path;

use tracing::{debug, warn};

use crate::errors::DbResult;
use crate::observability::Event;
use crate::record::{Metadata, Record};
use crate::store::{DatabaseHeader, RecordStore, StoreStats};

/// A configured database
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    store: Option<RecordStore>,
}

impl Database {
    /// Validate `config`. The archive is not touched until the first
    /// operation.
    pub fn new(config: DatabaseConfig) -> DbResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: None,
        })
    }

    /// Validate `config` and open or create the archive immediately.
    pub fn open(config: DatabaseConfig) -> DbResult<Self> {
        let mut db = Self::new(config)?;
        db.store()?;
        Ok(db)
    }

    /// Active configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Archive path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Whether the archive has been opened
    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    /// Database header
    pub fn header(&mut self) -> DbResult<&DatabaseHeader> {
        Ok(self.store()?.header())
    }

    fn store(&mut self) -> DbResult<&mut RecordStore> {
        let store = match self.store.take() {
            Some(store) => store,
            None => RecordStore::open(&self.config.path, self.config.store_options())?,
        };
        Ok(self.store.insert(store))
    }

    /// Add a new record
    pub fn insert(&mut self, key: &str, payload: &[u8], metadata: Metadata) -> DbResult<()> {
        self.store()?.insert(key, payload, metadata)
    }

    /// Read the live record for `key`
    pub fn get(&mut self, key: &str) -> DbResult<Record> {
        self.store()?.get(key)
    }

    /// Write a new revision of `key`, then auto-compact if enabled.
    ///
    /// A failed auto-compact is logged and does not fail the update, which is
    /// already committed.
    pub fn update(
        &mut self,
        key: &str,
        payload: &[u8],
        metadata: Option<Metadata>,
        rebuild: bool,
    ) -> DbResult<()> {
        self.store()?.update(key, payload, metadata, rebuild)?;
        self.auto_compact();
        Ok(())
    }

    /// Remove `key`, then auto-compact if enabled. A failed auto-compact is
    /// logged only.
    pub fn delete(&mut self, key: &str) -> DbResult<()> {
        self.store()?.delete(key)?;
        self.auto_compact();
        Ok(())
    }

    /// Reclaim stale entries
    pub fn compact(&mut self) -> DbResult<usize> {
        self.store()?.compact()
    }

    /// Live keys containing `pattern`
    pub fn search(&mut self, pattern: &str) -> DbResult<Vec<String>> {
        self.store()?.search(pattern)
    }

    /// All live keys
    pub fn list_records(&mut self) -> DbResult<Vec<String>> {
        self.store()?.list_records()
    }

    /// Whether `key` has a live record
    pub fn contains(&mut self, key: &str) -> DbResult<bool> {
        self.store()?.contains(key)
    }

    /// Physical record entries, stale ones included
    pub fn entry_count(&mut self) -> DbResult<usize> {
        self.store()?.entry_count()
    }

    /// Archive statistics
    pub fn stats(&mut self) -> DbResult<StoreStats> {
        self.store()?.stats()
    }

    /// Copy the archive to `target`. Returns the bytes copied.
    pub fn backup(&mut self, target: impl AsRef<Path>, overwrite: bool) -> DbResult<u64> {
        let source = self.store()?.path().to_path_buf();
        backup::copy_archive(&source, target.as_ref(), overwrite)
    }

    fn auto_compact(&mut self) {
        if !self.config.auto_compact {
            return;
        }
        match self.store().and_then(|store| store.compact()) {
            Ok(reclaimed) => debug!(reclaimed, "auto-compact finished"),
            Err(err) => warn!(
                event = Event::AutoCompactFailed.as_str(),
                code = err.code().code(),
                error = %err,
                "auto-compact failed after a committed write"
            ),
        }
    }
}
