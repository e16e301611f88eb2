//! Engine Module
//!
//! The storage engine that coordinates the segment log, the keydir, and the
//! segment handle table.
//!
//! ## Responsibilities
//! - Recover the keydir from segments on open
//! - Serve reads from the staging buffer or a positional file read
//! - Append writes and rotate the active segment by size
//! - Release every handle on close

use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{CaskError, Result};
use crate::keydir::Keydir;
use crate::log::{self, SegmentWriter, TOMBSTONE};
use crate::storage::segment::{self, SegmentListing};
use crate::storage::SegmentSet;

/// The main storage engine
///
/// ## Concurrency Model
///
/// One `RwLock` guards all mutable state (keydir, writer, handle table).
/// - **Reads** (get): shared lock, many at once
/// - **Writes** (put/delete/flush, including rotation): exclusive lock
///
/// A `get` that takes the lock after a `put` returns observes that write.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Everything the lock protects
    state: RwLock<EngineState>,
}

struct EngineState {
    segments: SegmentSet,
    keydir: Keydir,
    writer: SegmentWriter,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. List the data directory
    /// 2. Open (or create) `active.dat` under id = highest sealed id + 1
    /// 3. Replay the active segment
    /// 4. Replay sealed segments newest → oldest, merging first-writer-wins
    ///
    /// Any I/O or decode error during replay fails the open.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;
        let dir = config.data_dir.as_path();

        let listing = segment::list_segments(dir)?;
        if let Some(&orphan) = listing.hint_ids.difference(&listing.data_ids).next() {
            return Err(CaskError::OrphanHint(orphan));
        }

        let active_id = listing.next_active_id();
        let active = segment::open_active(&segment::active_path(dir))?;
        let writer = SegmentWriter::new(active, config.buffer_capacity)?;

        let mut keydir = Keydir::load_from_data(active_id, writer.file())?;
        tracing::debug!(
            "Replayed active segment {}: {} keys",
            active_id,
            keydir.len()
        );

        let mut segments = SegmentSet::new(dir, active_id);
        for &id in listing.data_ids.iter().rev() {
            let file = segment::open_sealed(&segment::data_path(dir, id))?;
            let recovered = Self::recover_segment(dir, &listing, id, &file)?;
            tracing::debug!("Replayed segment {}: {} keys", id, recovered.len());
            keydir.merge(recovered);
            segments.insert(id, file);
        }
        keydir.clear_tombstones();

        tracing::info!(
            "Opened {}: {} segments, {} keys, active segment {}",
            dir.display(),
            segments.count(),
            keydir.len(),
            active_id
        );

        Ok(Self {
            config,
            state: RwLock::new(EngineState {
                segments,
                keydir,
                writer,
            }),
        })
    }

    /// Open with a path and staging buffer capacity (convenience method)
    ///
    /// Uses default config otherwise.
    pub fn open_path(path: &Path, buffer_capacity: usize) -> Result<Self> {
        let config = Config::builder()
            .data_dir(path)
            .buffer_capacity(buffer_capacity)
            .build();
        Self::open(config)
    }

    /// Index of one sealed segment, from its hint file when one is usable
    fn recover_segment(
        dir: &Path,
        listing: &SegmentListing,
        id: u64,
        file: &fs::File,
    ) -> Result<Keydir> {
        if listing.has_hint(id) {
            let hint = fs::File::open(segment::hint_path(dir, id))?;
            match Keydir::load_from_hint(id, hint) {
                Ok(keydir) => return Ok(keydir),
                Err(e) if e.is_corruption() => {
                    tracing::warn!(
                        "Hint file for segment {} is unusable ({}), replaying data file",
                        id,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Keydir::load_from_data(id, file)
    }

    /// Get a value by key
    ///
    /// Records still in the staging buffer are decoded from it; everything
    /// else is a positional read on the owning segment.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();
        let key = key.as_bytes();

        let Some(entry) = state.keydir.lookup(key) else {
            return Ok(None);
        };

        if entry.segment_id == state.segments.active_id() {
            let durable = state.writer.durable_len();
            if entry.value_position >= durable {
                let start = (entry.value_position - durable) as usize;
                let end = start + entry.record_len(key.len());
                let staged = state.writer.staged().get(start..end).unwrap_or(&[]);
                let record = log::decode(staged)?;
                return Ok(Some(record.value));
            }
            return state.keydir.get(state.writer.file(), key);
        }

        let file = state
            .segments
            .get(entry.segment_id)
            .ok_or(CaskError::MissingSegment(entry.segment_id))?;
        state.keydir.get(file, key)
    }

    /// Put a key-value pair
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        if value == TOMBSTONE {
            return Err(CaskError::ReservedValue);
        }

        let mut state = self.state.write();
        self.set(&mut state, key.as_bytes(), Some(value))
    }

    /// Delete a key
    ///
    /// Appends a tombstone and removes the key from the keydir at once.
    /// Deleting an absent key still writes the tombstone.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.write();
        self.set(&mut state, key.as_bytes(), None)
    }

    /// Rotation-aware append shared by put and delete (`None` = tombstone)
    fn set(&self, state: &mut EngineState, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        let EngineState {
            segments,
            keydir,
            writer,
        } = state;

        let projected = writer.durable_len() + writer.staged_len() as u64;
        if projected > self.config.max_segment_size {
            segments.rotate(writer, &self.config)?;
        }

        let segment_id = segments.active_id();
        let strategy = self.config.flush_strategy;
        match value {
            Some(value) => {
                keydir.put(segment_id, writer, key, value, strategy)?;
            }
            None => keydir.delete(segment_id, writer, key, strategy)?,
        }
        Ok(())
    }

    /// Write staged bytes to the active segment
    pub fn flush(&self) -> Result<()> {
        self.state.write().writer.flush()
    }

    /// Flush, fsync, and release every segment handle
    pub fn close(mut self) -> Result<()> {
        let state = self.state.get_mut();
        state.writer.sync()?;
        state.segments.close();
        tracing::debug!("Closed {}", self.config.data_dir.display());
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether `key` is live
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.read().keydir.contains_key(key.as_bytes())
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().keydir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().keydir.is_empty()
    }

    /// Id of the writable segment
    pub fn active_segment_id(&self) -> u64 {
        self.state.read().segments.active_id()
    }

    /// Number of segments, the active one included
    pub fn segment_count(&self) -> usize {
        self.state.read().segments.count()
    }

    /// Bytes staged in the writer, not yet in the active file
    pub fn staged_bytes(&self) -> usize {
        self.state.read().writer.staged_len()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.state.get_mut().writer.flush() {
            tracing::warn!("Failed to flush staged bytes on drop: {}", e);
        }
    }
}
