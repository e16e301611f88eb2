//! Hint files
//!
//! A hint file holds the index of one sealed segment without its values, so
//! recovery can rebuild the keydir without reading every value byte.
//!
//! ## Entry Format
//! ```text
//! ┌─────────┬───────────────┬────────────┬──────────────┬──────────────┬─────┐
//! │ CRC (4) │ Timestamp (8) │ KeyLen (4) │ ValueLen (4) │ Position (8) │ Key │
//! └─────────┴───────────────┴────────────┴──────────────┴──────────────┴─────┘
//! ```
//! `ValueLen == u32::MAX` marks a tombstone. The CRC covers everything after it.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CaskError, Result};

use super::record::read_full;

/// Header size: CRC (4) + Timestamp (8) + KeyLen (4) + ValueLen (4) + Position (8)
pub const HINT_HEADER_SIZE: usize = 28;

/// Sentinel value length marking a tombstone entry
const TOMBSTONE_MARKER: u32 = u32::MAX;

/// Upper bound on the up-front allocation for a key read from a hint file
const KEY_PREALLOC: usize = 4 * 1024;

/// One keydir entry as persisted in a hint file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintEntry {
    pub timestamp: i64,
    pub key: Vec<u8>,
    pub value_size: u32,
    /// Offset of the record within the data file
    pub value_position: u64,
    pub tombstone: bool,
}

impl HintEntry {
    fn encode(&self) -> Result<BytesMut> {
        let key_len =
            u32::try_from(self.key.len()).map_err(|_| CaskError::KeyTooLarge(self.key.len()))?;
        let value_len = if self.tombstone {
            TOMBSTONE_MARKER
        } else {
            self.value_size
        };

        let mut buf = BytesMut::with_capacity(HINT_HEADER_SIZE + self.key.len());
        buf.put_u32_le(0);
        buf.put_i64_le(self.timestamp);
        buf.put_u32_le(key_len);
        buf.put_u32_le(value_len);
        buf.put_u64_le(self.value_position);
        buf.put_slice(&self.key);

        let crc = crc32fast::hash(&buf[4..]);
        buf[0..4].copy_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Writes a hint file under a temporary name, renamed into place on `finish`
pub struct HintWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    writer: BufWriter<File>,
    entry_count: u64,
}

impl HintWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let tmp_path = path.with_extension("hint.tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer: BufWriter::new(file),
            entry_count: 0,
        })
    }

    pub fn add(&mut self, entry: &HintEntry) -> Result<()> {
        let bytes = entry.encode()?;
        self.writer.write_all(&bytes)?;
        self.entry_count += 1;
        Ok(())
    }

    /// Flush, fsync and atomically publish the hint file
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(self.entry_count)
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Iterator over the entries of a hint file
pub struct HintReader<R> {
    reader: R,
    done: bool,
}

impl<R: Read> HintReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    fn read_entry(&mut self) -> Result<Option<HintEntry>> {
        let mut head = [0u8; HINT_HEADER_SIZE];
        let read = read_full(&mut self.reader, &mut head)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HINT_HEADER_SIZE {
            return Err(CaskError::Truncated {
                needed: HINT_HEADER_SIZE,
                available: read,
            });
        }

        let mut cursor = &head[..];
        let crc = cursor.get_u32_le();
        let timestamp = cursor.get_i64_le();
        let key_len = cursor.get_u32_le() as usize;
        let value_len = cursor.get_u32_le();
        let value_position = cursor.get_u64_le();

        // The declared length is untrusted until the CRC passes
        let mut key = Vec::with_capacity(key_len.min(KEY_PREALLOC));
        (&mut self.reader)
            .take(key_len as u64)
            .read_to_end(&mut key)?;
        if key.len() < key_len {
            return Err(CaskError::Truncated {
                needed: HINT_HEADER_SIZE + key_len,
                available: HINT_HEADER_SIZE + key.len(),
            });
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&head[4..]);
        hasher.update(&key);
        let actual = hasher.finalize();
        if actual != crc {
            return Err(CaskError::ChecksumMismatch {
                expected: crc,
                actual,
            });
        }

        let tombstone = value_len == TOMBSTONE_MARKER;
        Ok(Some(HintEntry {
            timestamp,
            key,
            value_size: if tombstone { 0 } else { value_len },
            value_position,
            tombstone,
        }))
    }
}

impl<R: Read> Iterator for HintReader<R> {
    type Item = Result<HintEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
