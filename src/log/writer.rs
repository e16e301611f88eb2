//! Segment Writer
//!
//! Buffered appends to the active segment file.

use std::fs::File;
use std::io::Write;

use crate::error::Result;

/// Appends byte blocks to a segment through a fixed-capacity staging buffer
///
/// Keeps an exact count of bytes that reached the file (`durable_len`) and
/// bytes still held in memory (`staged_len`); the keydir derives record
/// offsets from their sum.
pub struct SegmentWriter {
    /// Writable handle (opened in append mode, also used for positional reads)
    file: File,
    /// Staged bytes, never grown past `capacity`
    buffer: Vec<u8>,
    /// Staging capacity (0 = write through)
    capacity: usize,
    /// Bytes written to the file so far
    file_len: u64,
}

impl SegmentWriter {
    /// Wrap an open segment file, picking up its current length
    pub fn new(file: File, capacity: usize) -> Result<Self> {
        let file_len = file.metadata()?.len();
        Ok(Self {
            file,
            buffer: Vec::with_capacity(capacity),
            capacity,
            file_len,
        })
    }

    /// Stage `data` if it fits, otherwise flush and then stage or write through
    ///
    /// A block larger than the whole buffer bypasses staging entirely.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.buffer.len() + data.len() <= self.capacity {
            self.buffer.extend_from_slice(data);
            return Ok(data.len());
        }

        self.flush()?;

        if data.len() > self.capacity {
            self.file.write_all(data)?;
            self.file_len += data.len() as u64;
        } else {
            self.buffer.extend_from_slice(data);
        }
        Ok(data.len())
    }

    /// Write all staged bytes to the file
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.file.write_all(&self.buffer)?;
        self.file_len += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    /// Flush, then fsync the file
    pub fn sync(&mut self) -> Result<()> {
        self.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Bytes held in memory, not yet written to the file
    pub fn staged_len(&self) -> usize {
        self.buffer.len()
    }

    /// Read-only view of the staged bytes
    pub fn staged(&self) -> &[u8] {
        &self.buffer
    }

    /// Bytes already written to the file
    pub fn durable_len(&self) -> u64 {
        self.file_len
    }

    /// Offset the next appended block will occupy once flushed
    pub fn next_offset(&self) -> u64 {
        self.file_len + self.buffer.len() as u64
    }

    /// The underlying file handle
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Flush and hand back the file handle
    pub fn into_inner(mut self) -> Result<File> {
        self.flush()?;
        Ok(self.file)
    }
}
