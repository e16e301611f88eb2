//! Record codec
//!
//! Stateless encoding and decoding of a single `(timestamp, key, value)` record.

use std::io::{ErrorKind, Read};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CaskError, Result};

/// Header size: CRC (4) + Timestamp (8) + KeyLen (4) + ValueLen (4) = 20 bytes
pub const HEADER_SIZE: usize = 20;

/// Value written in place of a real value when a key is deleted
pub const TOMBSTONE: &[u8] = &[0xDE, 0xAD];

/// Upper bound on the up-front allocation for a record body read from a stream
const BODY_PREALLOC: usize = 64 * 1024;

/// A single log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Unix millis at write time
    pub timestamp: i64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    pub fn new(timestamp: i64, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether this record marks its key as deleted
    pub fn is_tombstone(&self) -> bool {
        self.value == TOMBSTONE
    }

    /// Size of this record on disk
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }
}

/// Encode a record into its on-disk layout
pub fn encode(timestamp: i64, key: &[u8], value: &[u8]) -> Result<Bytes> {
    let key_len = u32::try_from(key.len()).map_err(|_| CaskError::KeyTooLarge(key.len()))?;
    let value_len =
        u32::try_from(value.len()).map_err(|_| CaskError::ValueTooLarge(value.len()))?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + key.len() + value.len());
    buf.put_u32_le(0); // CRC placeholder
    buf.put_i64_le(timestamp);
    buf.put_u32_le(key_len);
    buf.put_u32_le(value_len);
    buf.put_slice(key);
    buf.put_slice(value);

    let crc = crc32fast::hash(&buf[4..]);
    buf[0..4].copy_from_slice(&crc.to_le_bytes());

    Ok(buf.freeze())
}

/// Decode exactly one record from `buf`
///
/// `buf` is the record's full span as recorded by the index. The CRC is
/// checked over `buf[4..]` before the length fields are trusted, so a
/// corrupted length is a `ChecksumMismatch` like any other flipped bit.
pub fn decode(buf: &[u8]) -> Result<Record> {
    let header = parse_header(buf)?;
    header.verify(buf)?;
    if header.record_len() != Some(buf.len()) {
        return Err(CaskError::ChecksumMismatch {
            expected: header.crc,
            actual: header.crc,
        });
    }
    Ok(header.split(buf))
}

/// Decode the next record from a forward stream
///
/// Returns `Ok(None)` when the stream ends cleanly on a record boundary.
/// A partial header is `Truncated`. A partial body is `ChecksumMismatch`
/// when the bytes that were read form an intact record under a single
/// corrupted length field, and `Truncated` otherwise.
pub fn decode_from<R: Read>(reader: &mut R) -> Result<Option<Record>> {
    let mut head = [0u8; HEADER_SIZE];
    let read = read_full(reader, &mut head)?;
    if read == 0 {
        return Ok(None);
    }
    if read < HEADER_SIZE {
        return Err(CaskError::Truncated {
            needed: HEADER_SIZE,
            available: read,
        });
    }

    let header = parse_header(&head)?;
    let body_len = header.key_len as u64 + header.value_len as u64;

    // The declared length is untrusted until the CRC passes
    let mut data = Vec::with_capacity(HEADER_SIZE + (body_len as usize).min(BODY_PREALLOC));
    data.extend_from_slice(&head);
    reader.take(body_len).read_to_end(&mut data)?;

    let body = data.len() - HEADER_SIZE;
    if (body as u64) < body_len {
        if header.fits_with_one_length(&data) {
            return Err(CaskError::ChecksumMismatch {
                expected: header.crc,
                actual: crc32fast::hash(&data[4..]),
            });
        }
        return Err(CaskError::Truncated {
            needed: HEADER_SIZE.saturating_add(body_len as usize),
            available: data.len(),
        });
    }

    header.verify(&data)?;
    Ok(Some(header.split(&data)))
}

/// Current unix time in milliseconds
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Fill `buf` from `reader`, stopping early only at end of input
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

// =============================================================================
// Private Helpers
// =============================================================================

struct Header {
    crc: u32,
    timestamp: i64,
    key_len: usize,
    value_len: usize,
}

impl Header {
    /// Declared record size, `None` if it cannot be addressed
    fn record_len(&self) -> Option<usize> {
        HEADER_SIZE
            .checked_add(self.key_len)?
            .checked_add(self.value_len)
    }

    /// Check the stored CRC against `data[4..]`
    fn verify(&self, data: &[u8]) -> Result<()> {
        let actual = crc32fast::hash(&data[4..]);
        if actual != self.crc {
            return Err(CaskError::ChecksumMismatch {
                expected: self.crc,
                actual,
            });
        }
        Ok(())
    }

    /// Split a verified record of exactly `record_len` bytes
    fn split(&self, data: &[u8]) -> Record {
        let key_end = HEADER_SIZE + self.key_len;
        Record {
            timestamp: self.timestamp,
            key: data[HEADER_SIZE..key_end].to_vec(),
            value: data[key_end..].to_vec(),
        }
    }

    /// Whether `data` (header plus a short body) passes the CRC once one of
    /// the two length fields is replaced by the length actually present
    fn fits_with_one_length(&self, data: &[u8]) -> bool {
        let body = data.len() - HEADER_SIZE;
        let candidates = [
            body.checked_sub(self.key_len).map(|v| (self.key_len, v)),
            body.checked_sub(self.value_len).map(|k| (k, self.value_len)),
        ];
        candidates.into_iter().flatten().any(|(key_len, value_len)| {
            let (Ok(key_len), Ok(value_len)) = (u32::try_from(key_len), u32::try_from(value_len))
            else {
                return false;
            };
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&data[4..12]);
            hasher.update(&key_len.to_le_bytes());
            hasher.update(&value_len.to_le_bytes());
            hasher.update(&data[HEADER_SIZE..]);
            hasher.finalize() == self.crc
        })
    }
}

fn parse_header(buf: &[u8]) -> Result<Header> {
    if buf.len() < HEADER_SIZE {
        return Err(CaskError::Truncated {
            needed: HEADER_SIZE,
            available: buf.len(),
        });
    }

    let mut head = &buf[..HEADER_SIZE];
    Ok(Header {
        crc: head.get_u32_le(),
        timestamp: head.get_i64_le(),
        key_len: head.get_u32_le() as usize,
        value_len: head.get_u32_le() as usize,
    })
}
