//! Segment Log Module
//!
//! The append-only on-disk log: record layout, buffered appends, and the
//! forward readers used by recovery.
//!
//! ## Responsibilities
//! - Encode/decode records with a CRC32 checksum
//! - Stage small appends in memory before they reach the active file
//! - Replay a segment front to back
//! - Read and write per-segment hint files
//!
//! ## Record Format
//! ```text
//! ┌─────────┬───────────────┬──────────────┬──────────────┬─────┬───────┐
//! │ CRC (4) │ Timestamp (8) │ KeyLen (4)   │ ValueLen (4) │ Key │ Value │
//! └─────────┴───────────────┴──────────────┴──────────────┴─────┴───────┘
//!             └──────────────── covered by CRC ──────────────────────────┘
//! ```
//! All integers are little-endian. The timestamp is signed.

mod hint;
mod reader;
mod record;
mod writer;

pub use hint::{HintEntry, HintReader, HintWriter, HINT_HEADER_SIZE};
pub use reader::SegmentReader;
pub use record::{
    decode, decode_from, encode, now_millis, Record, HEADER_SIZE, TOMBSTONE,
};
pub use writer::SegmentWriter;
