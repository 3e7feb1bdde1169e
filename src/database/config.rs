//! Database configuration
//!
//! Loaded from a JSON object. Only `name` and `path` are required:
//!
//! ```json
//! {
//!   "name": "inventory",
//!   "path": "./inventory.tar",
//!   "password": "optional secret",
//!   "compression_level": 6,
//!   "max_size": 0,
//!   "auto_compact": true,
//!   "version": "1.0.0"
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::MAX_COMPRESSION_LEVEL;
use crate::errors::{DbError, DbResult};
use crate::store::StoreOptions;

/// Configuration for one database
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database name (required, non-empty)
    pub name: String,

    /// Archive file path (required)
    pub path: PathBuf,

    /// Encryption password (optional, never serialized)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Deflate level 0-9 (optional, default 6)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Archive size ceiling in bytes (optional, default 0 = unlimited)
    #[serde(default)]
    pub max_size: u64,

    /// Compact after every update and delete (optional, default true)
    #[serde(default = "default_auto_compact")]
    pub auto_compact: bool,

    /// Version tag stored in new databases (optional, default "1.0.0")
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_compression_level() -> u32 {
    6
}
fn default_auto_compact() -> bool {
    true
}
fn default_version() -> String {
    "1.0.0".to_string()
}

impl DatabaseConfig {
    /// Config with every optional field at its default
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            password: None,
            compression_level: default_compression_level(),
            max_size: 0,
            auto_compact: default_auto_compact(),
            version: default_version(),
        }
    }

    /// Set the encryption password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the compression level
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    /// Set the size ceiling, 0 for unlimited
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Enable or disable auto-compaction
    pub fn with_auto_compact(mut self, auto_compact: bool) -> Self {
        self.auto_compact = auto_compact;
        self
    }

    /// Set the version tag
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Parse a JSON object. Does not validate.
    pub fn from_json_str(content: &str) -> DbResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| DbError::invalid_config(format!("invalid config JSON: {}", e)))
    }

    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> DbResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DbError::invalid_config(format!("failed to read config: {}", e))
                .with_details(format!("path: {}", path.display()))
        })?;

        let config = Self::from_json_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration against the filesystem
    pub fn validate(&self) -> DbResult<()> {
        if self.name.trim().is_empty() {
            return Err(DbError::invalid_config("name must not be empty"));
        }

        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(DbError::invalid_config(format!(
                "compression_level must be 0-{}, got {}",
                MAX_COMPRESSION_LEVEL, self.compression_level
            )));
        }

        if self.path.as_os_str().is_empty() {
            return Err(DbError::invalid_config("path must not be empty"));
        }
        if self.path.is_dir() {
            return Err(DbError::invalid_config("path is a directory")
                .with_details(format!("path: {}", self.path.display())));
        }

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let meta = fs::metadata(parent).map_err(|e| {
            DbError::invalid_config(format!("parent directory unavailable: {}", e))
                .with_details(format!("path: {}", parent.display()))
        })?;
        if !meta.is_dir() {
            return Err(DbError::invalid_config("parent is not a directory")
                .with_details(format!("path: {}", parent.display())));
        }
        if meta.permissions().readonly() {
            return Err(DbError::invalid_config("parent directory is not writable")
                .with_details(format!("path: {}", parent.display())));
        }

        Ok(())
    }

    /// Options for opening the record store
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            name: self.name.clone(),
            version: self.version.clone(),
            password: self.password.clone(),
            compression_level: self.compression_level,
            max_size: self.max_size,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("compression_level", &self.compression_level)
            .field("max_size", &self.max_size)
            .field("auto_compact", &self.auto_compact)
            .field("version", &self.version)
            .finish()
    }
}
