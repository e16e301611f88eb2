//! # CaskKV
//!
//! An embedded, append-only, log-structured key-value store (Bitcask model):
//! - Append-only segment log with CRC32-checked records
//! - In-memory keydir for O(1) point lookups
//! - Size-triggered segment rotation with optional hint files
//! - Full keydir recovery by replaying segments on open
//! - Single reader/writer lock for concurrent access
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │          get (shared lock) / put, delete (exclusive)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │   Keydir    │          │ SegmentWriter │
//!   │ key → entry │          │ (staging buf) │
//!   └──────┬──────┘          └──────┬───────┘
//!          │ positional read        │ append
//!          ▼                        ▼
//!   ┌─────────────────────────────────────────┐
//!   │  0.dat  1.dat  ...  N.dat   active.dat  │
//!   └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use caskkv::{Config, Engine};
//!
//! # fn main() -> caskkv::Result<()> {
//! let engine = Engine::open(Config::builder().data_dir("./data").build())?;
//! engine.put("hello", b"world")?;
//! assert_eq!(engine.get("hello")?, Some(b"world".to_vec()));
//! engine.delete("hello")?;
//! engine.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod log;
pub mod keydir;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CaskError, Result};
pub use config::{Config, FlushStrategy};
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CaskKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
