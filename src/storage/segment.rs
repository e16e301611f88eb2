//! Segment files
//!
//! Naming, discovery, opening, and positional reads of segment files.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CaskError, Result};

/// Name of the writable segment
pub const ACTIVE_FILENAME: &str = "active.dat";

const DATA_EXT: &str = "dat";
const HINT_EXT: &str = "hint";

/// Classification of a file found in the data directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentFile {
    Active,
    Data(u64),
    Hint(u64),
}

/// Segment files present in a data directory
#[derive(Debug, Default)]
pub struct SegmentListing {
    pub has_active: bool,
    pub data_ids: BTreeSet<u64>,
    pub hint_ids: BTreeSet<u64>,
}

impl SegmentListing {
    /// Highest sealed segment id, if any
    pub fn max_id(&self) -> Option<u64> {
        self.data_ids.iter().next_back().copied()
    }

    /// Id the active segment takes: one past the highest sealed id
    pub fn next_active_id(&self) -> u64 {
        self.max_id().map(|id| id + 1).unwrap_or(0)
    }

    pub fn has_hint(&self, id: u64) -> bool {
        self.hint_ids.contains(&id)
    }
}

/// Classify a directory entry by name
///
/// Returns `Ok(None)` for files that are not segments. A `.dat` or `.hint`
/// whose stem is not a decimal id is an error.
pub fn parse_file_name(name: &str) -> Result<Option<SegmentFile>> {
    if name == ACTIVE_FILENAME {
        return Ok(Some(SegmentFile::Active));
    }

    let Some((stem, ext)) = name.rsplit_once('.') else {
        return Ok(None);
    };
    if ext != DATA_EXT && ext != HINT_EXT {
        return Ok(None);
    }

    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CaskError::InvalidSegmentName(name.to_string()));
    }
    let id: u64 = stem
        .parse()
        .map_err(|_| CaskError::InvalidSegmentName(name.to_string()))?;

    Ok(Some(if ext == DATA_EXT {
        SegmentFile::Data(id)
    } else {
        SegmentFile::Hint(id)
    }))
}

/// List the segment files in `dir`
pub fn list_segments(dir: &Path) -> Result<SegmentListing> {
    let mut listing = SegmentListing::default();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        match parse_file_name(name)? {
            Some(SegmentFile::Active) => listing.has_active = true,
            Some(SegmentFile::Data(id)) => {
                listing.data_ids.insert(id);
            }
            Some(SegmentFile::Hint(id)) => {
                listing.hint_ids.insert(id);
            }
            None => {}
        }
    }

    Ok(listing)
}

pub fn active_path(dir: &Path) -> PathBuf {
    dir.join(ACTIVE_FILENAME)
}

/// "7" → "{dir}/7.dat"
pub fn data_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{}.{}", id, DATA_EXT))
}

/// "7" → "{dir}/7.hint"
pub fn hint_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{}.{}", id, HINT_EXT))
}

/// Open (or create) the active segment for reading and appending
pub fn open_active(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
}

/// Open a sealed segment read-only
pub fn open_sealed(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

/// Read into `buf` at `offset` without touching the file cursor
///
/// Returns the number of bytes read, short only at end of file.
pub fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match positional_read(file, &mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(unix)]
fn positional_read(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn positional_read(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}
