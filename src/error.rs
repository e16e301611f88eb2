//! Error types for CaskKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CaskError
pub type Result<T> = std::result::Result<T, CaskError>;

/// Unified error type for CaskKV operations
///
/// A missing key is never an error: `Engine::get` returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum CaskError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Truncated record: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Key too large: {0} bytes")]
    KeyTooLarge(usize),

    #[error("Value too large: {0} bytes")]
    ValueTooLarge(usize),

    #[error("Value collides with the tombstone sentinel")]
    ReservedValue,

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    #[error("Invalid segment file name: {0}")]
    InvalidSegmentName(String),

    #[error("Hint file for segment {0} has no data file")]
    OrphanHint(u64),

    #[error("Segment {0} is not open")]
    MissingSegment(u64),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CaskError {
    /// True for errors that indicate damaged on-disk data rather than an
    /// operational failure of the filesystem
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            CaskError::ChecksumMismatch { .. } | CaskError::Truncated { .. }
        )
    }
}
