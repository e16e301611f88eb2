//! Configuration for CaskKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CaskError, Result};

/// Default segment rotation threshold (1 MiB)
pub const DEFAULT_MAX_SEGMENT_SIZE: u64 = 1024 * 1024;

/// Main configuration for a CaskKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding every segment file
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── active.dat   (writable segment)
    ///     ├── 0.dat        (sealed segments)
    ///     └── 0.hint       (optional index for a sealed segment)
    pub data_dir: PathBuf,

    /// Active segment size that triggers rotation (in bytes)
    pub max_segment_size: u64,

    // -------------------------------------------------------------------------
    // Writer Configuration
    // -------------------------------------------------------------------------
    /// Staging buffer capacity of the segment writer (0 = write through)
    pub buffer_capacity: usize,

    /// When staged bytes are pushed to the active file
    pub flush_strategy: FlushStrategy,

    /// fsync a segment before sealing it
    pub sync_on_rotate: bool,

    // -------------------------------------------------------------------------
    // Recovery Configuration
    // -------------------------------------------------------------------------
    /// Write a `.hint` file next to every sealed segment
    pub write_hints: bool,
}

/// Flush strategy for the segment writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStrategy {
    /// Flush after every append (durable per write)
    EveryWrite,

    /// Flush only on buffer overflow, rotation, explicit flush, or close.
    /// Staged records stay readable but are lost on crash.
    Buffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./caskkv_data"),
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            buffer_capacity: 0,
            flush_strategy: FlushStrategy::EveryWrite,
            sync_on_rotate: true,
            write_hints: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_size == 0 {
            return Err(CaskError::Config(
                "max_segment_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the rotation threshold (in bytes)
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.config.max_segment_size = size;
        self
    }

    /// Set the staging buffer capacity (in bytes)
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Set the flush strategy
    pub fn flush_strategy(mut self, strategy: FlushStrategy) -> Self {
        self.config.flush_strategy = strategy;
        self
    }

    /// Enable or disable fsync before sealing a segment
    pub fn sync_on_rotate(mut self, enabled: bool) -> Self {
        self.config.sync_on_rotate = enabled;
        self
    }

    /// Enable or disable hint files for sealed segments
    pub fn write_hints(mut self, enabled: bool) -> Self {
        self.config.write_hints = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
