//! Storage Module
//!
//! Segment files on disk and the table of open handles.
//!
//! ## Responsibilities
//! - Name and discover segment files
//! - Own one read-only handle per sealed segment
//! - Seal the active segment and start a new one (rotation)
//! - Positional reads that never move a shared cursor
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── active.dat    writable segment (id = highest sealed id + 1)
//!   ├── 0.dat         sealed, read-only
//!   ├── 0.hint        index of 0.dat without values
//!   ├── 1.dat
//!   └── ...
//! ```

pub mod segment;
mod manager;

pub use manager::SegmentSet;
pub use segment::{SegmentFile, SegmentListing};
