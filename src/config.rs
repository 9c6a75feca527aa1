//! Configuration for TandemDB
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::error::{Result, TandemError};

/// Main configuration for a TandemDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all table files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {master_name}.fl   (course records)
    ///     ├── {master_name}.ind  (course index)
    ///     ├── {slave_name}.fl    (certificate records)
    ///     ├── {slave_name}.ind   (certificate index)
    ///     └── {slave_name}.jk    (certificate free list)
    pub data_dir: PathBuf,

    /// Base file name of the master (course) table
    pub master_name: String,

    /// Base file name of the slave (certificate) table
    pub slave_name: String,

    /// Persist index and free lists after every mutating call
    pub flush_on_write: bool,

    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Free-list length at which the slave table is compacted
    pub compaction_threshold: usize,

    // -------------------------------------------------------------------------
    // Shell Configuration
    // -------------------------------------------------------------------------
    /// Argument that leaves a field unchanged in `update-*` commands
    pub keep_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./tandem_data"),
            master_name: "courses".to_string(),
            slave_name: "certificates".to_string(),
            flush_on_write: true,
            compaction_threshold: 2,
            keep_token: "*".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the storage layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.compaction_threshold == 0 {
            return Err(TandemError::Config(
                "compaction threshold must be at least 1".to_string(),
            ));
        }
        if self.master_name.is_empty() || self.slave_name.is_empty() {
            return Err(TandemError::Config("table names must not be empty".to_string()));
        }
        if self.master_name == self.slave_name {
            return Err(TandemError::Config(format!(
                "master and slave tables share the name '{}'",
                self.master_name
            )));
        }
        if self.keep_token.is_empty() {
            return Err(TandemError::Config("keep token must not be empty".to_string()));
        }
        Ok(())
    }

    /// Base path (without extension) of the master table files
    pub fn master_base(&self) -> PathBuf {
        self.data_dir.join(&self.master_name)
    }

    /// Base path (without extension) of the slave table files
    pub fn slave_base(&self) -> PathBuf {
        self.data_dir.join(&self.slave_name)
    }

    /// Data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all table files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the master table name
    pub fn master_name(mut self, name: impl Into<String>) -> Self {
        self.config.master_name = name.into();
        self
    }

    /// Set the slave table name
    pub fn slave_name(mut self, name: impl Into<String>) -> Self {
        self.config.slave_name = name.into();
        self
    }

    /// Set whether every mutation is followed by an index/free-list flush
    pub fn flush_on_write(mut self, enabled: bool) -> Self {
        self.config.flush_on_write = enabled;
        self
    }

    /// Set the free-list length that triggers compaction
    pub fn compaction_threshold(mut self, threshold: usize) -> Self {
        self.config.compaction_threshold = threshold;
        self
    }

    /// Set the "leave unchanged" token used by update commands
    pub fn keep_token(mut self, token: impl Into<String>) -> Self {
        self.config.keep_token = token.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
