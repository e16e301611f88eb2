//! Keydir Module
//!
//! In-memory index from key to the location of its most recent record.
//!
//! ## Responsibilities
//! - O(1) point lookups, then one positional read for the value
//! - Record the offset of every append
//! - Rebuild from segments (or their hint files) during recovery
//! - Merge per-segment indexes newest first without overwriting
//!
//! ## Data Structure Choice
//! A plain `HashMap`: order is irrelevant and the engine lock already
//! serializes mutation.

mod table;

pub use table::Keydir;

use crate::log::HEADER_SIZE;

/// Location of a key's latest record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeydirEntry {
    /// Segment holding the record
    pub segment_id: u64,
    /// Length of the value in bytes
    pub value_size: u32,
    /// Offset of the record's first header byte within the segment
    pub value_position: u64,
    /// Record timestamp (unix millis)
    pub timestamp: i64,
}

impl KeydirEntry {
    /// Full on-disk length of the record this entry points at
    pub fn record_len(&self, key_len: usize) -> usize {
        HEADER_SIZE + key_len + self.value_size as usize
    }
}
