//! Segment Set
//!
//! Tracks the active segment id and the open handles of sealed segments.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::keydir::Keydir;
use crate::log::{HintWriter, SegmentWriter};

use super::segment::{active_path, data_path, hint_path, open_active, open_sealed};

/// Handle table for one data directory
///
/// Exactly one segment, `active_id`, is writable; it is owned by the
/// engine's `SegmentWriter`. Every other segment here is read-only.
pub struct SegmentSet {
    /// Directory holding the segment files
    dir: PathBuf,

    /// Id the active segment will be sealed under
    active_id: u64,

    /// Read-only handles, keyed by segment id
    sealed: BTreeMap<u64, File>,
}

impl SegmentSet {
    pub fn new(dir: &Path, active_id: u64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            active_id,
            sealed: BTreeMap::new(),
        }
    }

    /// Register the read-only handle of a sealed segment
    pub fn insert(&mut self, id: u64, file: File) {
        self.sealed.insert(id, file);
    }

    /// Read-only handle for a sealed segment
    pub fn get(&self, id: u64) -> Option<&File> {
        self.sealed.get(&id)
    }

    pub fn active_id(&self) -> u64 {
        self.active_id
    }

    /// Sealed segment ids, ascending
    pub fn sealed_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.sealed.keys().copied()
    }

    /// Number of segments, the active one included
    pub fn count(&self) -> usize {
        self.sealed.len() + 1
    }

    /// Seal the active segment and replace `writer` with one over a fresh file
    ///
    /// 1. Flush (and optionally fsync) the active segment
    /// 2. Rename `active.dat` → `{id}.dat`, reopen it read-only
    /// 3. Write `{id}.hint` if enabled
    /// 4. Create a new `active.dat` under the next id
    ///
    /// A failure part way leaves the directory as far as it got; nothing is
    /// rolled back.
    pub fn rotate(&mut self, writer: &mut SegmentWriter, config: &Config) -> Result<u64> {
        let sealed_id = self.active_id;

        if config.sync_on_rotate {
            writer.sync()?;
        } else {
            writer.flush()?;
        }

        let sealed_path = data_path(&self.dir, sealed_id);
        fs::rename(active_path(&self.dir), &sealed_path)?;
        let file = open_sealed(&sealed_path)?;

        if config.write_hints {
            if let Err(e) = self.write_hint(sealed_id, &file) {
                tracing::warn!(
                    "Failed to write hint file for segment {}: {}",
                    sealed_id,
                    e
                );
            }
        }
        self.sealed.insert(sealed_id, file);

        let active = open_active(&active_path(&self.dir))?;
        let previous = std::mem::replace(writer, SegmentWriter::new(active, config.buffer_capacity)?);
        drop(previous.into_inner()?);
        self.active_id = sealed_id + 1;

        tracing::info!(
            "Sealed segment {} ({} segments open), active segment is now {}",
            sealed_id,
            self.count(),
            self.active_id
        );

        Ok(sealed_id)
    }

    /// Replay a sealed segment and persist its index as a hint file
    fn write_hint(&self, id: u64, file: &File) -> Result<()> {
        let keydir = Keydir::load_from_data(id, file)?;
        let mut hints = HintWriter::create(&hint_path(&self.dir, id))?;
        for entry in keydir.hint_entries() {
            hints.add(&entry)?;
        }
        let count = hints.finish()?;
        tracing::debug!("Wrote hint file for segment {} ({} entries)", id, count);
        Ok(())
    }

    /// Release every sealed handle
    pub fn close(&mut self) {
        self.sealed.clear();
    }
}
