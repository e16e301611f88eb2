//! Tests for the Segment Writer
//!
//! These tests verify:
//! - Staging small writes without touching the file
//! - Flushing staged bytes, and write-through for oversized blocks
//! - Zero-capacity (unbuffered) mode
//! - Offset accounting (durable + staged)

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use caskkv::log::SegmentWriter;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_writer(capacity: usize) -> (TempDir, PathBuf, SegmentWriter) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("active.dat");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(&path)
        .unwrap();
    let writer = SegmentWriter::new(file, capacity).unwrap();
    (temp_dir, path, writer)
}

fn file_len(path: &PathBuf) -> u64 {
    fs::metadata(path).unwrap().len()
}

// =============================================================================
// Staging Tests
// =============================================================================

#[test]
fn test_small_write_is_staged() {
    let (_temp, path, mut writer) = setup_writer(16);

    assert_eq!(writer.write(b"hello").unwrap(), 5);

    assert_eq!(writer.staged_len(), 5);
    assert_eq!(writer.staged(), b"hello");
    assert_eq!(writer.durable_len(), 0);
    assert_eq!(file_len(&path), 0);
}

#[test]
fn test_writes_accumulate_until_full() {
    let (_temp, path, mut writer) = setup_writer(10);

    writer.write(b"abcde").unwrap();
    writer.write(b"fghij").unwrap();

    assert_eq!(writer.staged(), b"abcdefghij");
    assert_eq!(file_len(&path), 0);
}

#[test]
fn test_overflow_flushes_then_stages() {
    let (_temp, path, mut writer) = setup_writer(10);

    writer.write(b"abcdef").unwrap();
    writer.write(b"ghijk").unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"abcdef");
    assert_eq!(writer.staged(), b"ghijk");
    assert_eq!(writer.durable_len(), 6);
}

#[test]
fn test_oversized_write_bypasses_staging() {
    let (_temp, path, mut writer) = setup_writer(4);

    writer.write(b"ab").unwrap();
    writer.write(b"0123456789").unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"ab0123456789");
    assert_eq!(writer.staged_len(), 0);
    assert_eq!(writer.durable_len(), 12);
}

#[test]
fn test_zero_capacity_writes_through() {
    let (_temp, path, mut writer) = setup_writer(0);

    writer.write(b"x").unwrap();
    writer.write(b"yz").unwrap();

    assert_eq!(writer.staged_len(), 0);
    assert_eq!(fs::read(&path).unwrap(), b"xyz");
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_flush_writes_staged_bytes() {
    let (_temp, path, mut writer) = setup_writer(64);

    writer.write(b"staged").unwrap();
    writer.flush().unwrap();

    assert_eq!(writer.staged_len(), 0);
    assert_eq!(writer.durable_len(), 6);
    assert_eq!(fs::read(&path).unwrap(), b"staged");
}

#[test]
fn test_flush_with_nothing_staged_is_noop() {
    let (_temp, path, mut writer) = setup_writer(64);

    writer.flush().unwrap();

    assert_eq!(writer.durable_len(), 0);
    assert_eq!(file_len(&path), 0);
}

#[test]
fn test_into_inner_flushes() {
    let (_temp, path, mut writer) = setup_writer(64);

    writer.write(b"tail").unwrap();
    let _file = writer.into_inner().unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"tail");
}

// =============================================================================
// Offset Tests
// =============================================================================

#[test]
fn test_next_offset_counts_staged_and_durable() {
    let (_temp, _path, mut writer) = setup_writer(8);

    assert_eq!(writer.next_offset(), 0);
    writer.write(b"12345").unwrap();
    assert_eq!(writer.next_offset(), 5);
    writer.write(b"6789").unwrap(); // overflow: flush 5, stage 4
    assert_eq!(writer.durable_len(), 5);
    assert_eq!(writer.next_offset(), 9);
}

#[test]
fn test_reopen_picks_up_existing_length() {
    let (temp, path, mut writer) = setup_writer(0);
    writer.write(b"existing").unwrap();
    drop(writer);

    let file = OpenOptions::new().read(true).append(true).open(&path).unwrap();
    let writer = SegmentWriter::new(file, 0).unwrap();

    assert_eq!(writer.durable_len(), 8);
    drop(temp);
}
