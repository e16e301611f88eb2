//! Segment Reader
//!
//! Sequential iteration over every record in a segment.

use std::io::Read;

use crate::error::Result;

use super::record::{decode_from, Record};

/// Iterator over `(offset, record)` pairs, front to back
///
/// Stops after the first error; a clean end of input ends iteration.
pub struct SegmentReader<R> {
    reader: R,
    /// Offset of the next record
    position: u64,
    done: bool,
}

impl<R: Read> SegmentReader<R> {
    /// Start reading at the reader's current position, treated as offset 0
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
            done: false,
        }
    }

    /// Offset just past the last record read
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read> Iterator for SegmentReader<R> {
    type Item = Result<(u64, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match decode_from(&mut self.reader) {
            Ok(Some(record)) => {
                let offset = self.position;
                self.position += record.encoded_len() as u64;
                Some(Ok((offset, record)))
            }
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
