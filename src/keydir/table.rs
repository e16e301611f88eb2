//! Keydir implementation
//!
//! HashMap-backed index plus the replay and merge logic used by recovery.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::config::FlushStrategy;
use crate::error::Result;
use crate::log::{self, HintEntry, HintReader, Record, SegmentReader, SegmentWriter, TOMBSTONE};
use crate::storage::segment::read_at;

use super::KeydirEntry;

/// Index of live keys
///
/// During recovery the keydir also remembers tombstones so that a delete in
/// a newer segment shadows older writes when merged. `clear_tombstones`
/// drops them once every segment is merged.
#[derive(Debug, Default)]
pub struct Keydir {
    entries: HashMap<Vec<u8>, KeydirEntry>,
    tombstones: HashMap<Vec<u8>, KeydirEntry>,
}

impl Keydir {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append `key → value` through `writer` and index it
    ///
    /// The record's offset is where it will land once everything staged
    /// ahead of it is flushed.
    pub fn put(
        &mut self,
        segment_id: u64,
        writer: &mut SegmentWriter,
        key: &[u8],
        value: &[u8],
        strategy: FlushStrategy,
    ) -> Result<KeydirEntry> {
        let entry = Self::append(segment_id, writer, key, value, strategy)?;
        self.entries.insert(key.to_vec(), entry);
        Ok(entry)
    }

    /// Append a tombstone for `key` and drop it from the index
    pub fn delete(
        &mut self,
        segment_id: u64,
        writer: &mut SegmentWriter,
        key: &[u8],
        strategy: FlushStrategy,
    ) -> Result<()> {
        Self::append(segment_id, writer, key, TOMBSTONE, strategy)?;
        self.entries.remove(key);
        Ok(())
    }

    fn append(
        segment_id: u64,
        writer: &mut SegmentWriter,
        key: &[u8],
        value: &[u8],
        strategy: FlushStrategy,
    ) -> Result<KeydirEntry> {
        let timestamp = log::now_millis();
        let block = log::encode(timestamp, key, value)?;

        let position = writer.next_offset();
        writer.write(&block)?;
        if strategy == FlushStrategy::EveryWrite {
            writer.flush()?;
        }

        Ok(KeydirEntry {
            segment_id,
            value_size: value.len() as u32,
            value_position: position,
            timestamp,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn lookup(&self, key: &[u8]) -> Option<&KeydirEntry> {
        self.entries.get(key)
    }

    /// Read the value for `key` from `file` with a positional read
    ///
    /// Returns `Ok(None)` if the key is absent or the file is shorter than
    /// the indexed record.
    pub fn get(&self, file: &File, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };

        let mut buf = vec![0u8; entry.record_len(key.len())];
        let read = read_at(file, &mut buf, entry.value_position)?;
        if read != buf.len() {
            tracing::warn!(
                "Short read for segment {} at offset {}: {} of {} bytes",
                entry.segment_id,
                entry.value_position,
                read,
                buf.len()
            );
            return Ok(None);
        }

        let record = log::decode(&buf)?;
        Ok(Some(record.value))
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tombstones remembered from replay
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &KeydirEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_slice(), e))
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Rebuild the index of one segment by replaying it from byte 0
    pub fn load_from_data(segment_id: u64, mut file: &File) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        Self::load_from_reader(segment_id, BufReader::new(file))
    }

    /// Rebuild the index of one segment from any forward stream of records
    pub fn load_from_reader<R: Read>(segment_id: u64, reader: R) -> Result<Self> {
        let mut keydir = Self::new();
        for item in SegmentReader::new(reader) {
            let (offset, record) = item?;
            keydir.apply_record(segment_id, offset, record);
        }
        Ok(keydir)
    }

    /// Rebuild the index of one segment from its hint file
    pub fn load_from_hint<R: Read>(segment_id: u64, reader: R) -> Result<Self> {
        let mut keydir = Self::new();
        for item in HintReader::new(BufReader::new(reader)) {
            let hint = item?;
            let entry = KeydirEntry {
                segment_id,
                value_size: if hint.tombstone {
                    TOMBSTONE.len() as u32
                } else {
                    hint.value_size
                },
                value_position: hint.value_position,
                timestamp: hint.timestamp,
            };
            keydir.apply(hint.key, entry, hint.tombstone);
        }
        Ok(keydir)
    }

    /// Index one replayed record; later records for a key replace earlier ones
    pub fn apply_record(&mut self, segment_id: u64, offset: u64, record: Record) {
        let tombstone = record.is_tombstone();
        let entry = KeydirEntry {
            segment_id,
            value_size: record.value.len() as u32,
            value_position: offset,
            timestamp: record.timestamp,
        };
        self.apply(record.key, entry, tombstone);
    }

    fn apply(&mut self, key: Vec<u8>, entry: KeydirEntry, tombstone: bool) {
        if tombstone {
            self.entries.remove(&key);
            self.tombstones.insert(key, entry);
        } else {
            self.tombstones.remove(&key);
            self.entries.insert(key, entry);
        }
    }

    /// Copy across every key of `other` this keydir knows nothing about
    ///
    /// Existing entries and tombstones are never overwritten, so merging
    /// segments newest first leaves each key at its most recent record.
    pub fn merge(&mut self, other: Keydir) {
        for (key, entry) in other.entries {
            if !self.knows(&key) {
                self.entries.insert(key, entry);
            }
        }
        for (key, entry) in other.tombstones {
            if !self.knows(&key) {
                self.tombstones.insert(key, entry);
            }
        }
    }

    fn knows(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key) || self.tombstones.contains_key(key)
    }

    /// Forget replayed tombstones once recovery is complete
    pub fn clear_tombstones(&mut self) {
        self.tombstones.clear();
    }

    /// Entries and tombstones in hint-file form
    pub fn hint_entries(&self) -> impl Iterator<Item = HintEntry> + '_ {
        let live = self.iter().map(|(key, e)| HintEntry {
            timestamp: e.timestamp,
            key: key.to_vec(),
            value_size: e.value_size,
            value_position: e.value_position,
            tombstone: false,
        });
        let dead = self.tombstones.iter().map(|(key, e)| HintEntry {
            timestamp: e.timestamp,
            key: key.clone(),
            value_size: 0,
            value_position: e.value_position,
            tombstone: true,
        });
        live.chain(dead)
    }
}
