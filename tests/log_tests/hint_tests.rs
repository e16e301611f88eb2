//! Tests for hint files
//!
//! These tests verify:
//! - Writing and reading back hint entries (live and tombstone)
//! - Atomic publish via temporary file
//! - Corruption and truncation detection

use std::fs::{self, File};

use caskkv::log::{HintEntry, HintReader, HintWriter, HINT_HEADER_SIZE};
use caskkv::CaskError;
use tempfile::TempDir;

fn sample_entries() -> Vec<HintEntry> {
    vec![
        HintEntry {
            timestamp: 100,
            key: b"alpha".to_vec(),
            value_size: 12,
            value_position: 0,
            tombstone: false,
        },
        HintEntry {
            timestamp: 101,
            key: b"beta".to_vec(),
            value_size: 0,
            value_position: 37,
            tombstone: true,
        },
    ]
}

fn write_hints(temp: &TempDir, entries: &[HintEntry]) -> std::path::PathBuf {
    let path = temp.path().join("3.hint");
    let mut writer = HintWriter::create(&path).unwrap();
    for entry in entries {
        writer.add(entry).unwrap();
    }
    assert_eq!(writer.finish().unwrap(), entries.len() as u64);
    path
}

#[test]
fn test_write_then_read() {
    let temp = TempDir::new().unwrap();
    let path = write_hints(&temp, &sample_entries());

    let read: Vec<HintEntry> = HintReader::new(File::open(&path).unwrap())
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(read, sample_entries());
}

#[test]
fn test_file_size_matches_layout() {
    let temp = TempDir::new().unwrap();
    let path = write_hints(&temp, &sample_entries());

    let expected = (HINT_HEADER_SIZE + 5) + (HINT_HEADER_SIZE + 4);
    assert_eq!(fs::metadata(&path).unwrap().len(), expected as u64);
}

#[test]
fn test_tmp_file_removed_after_finish() {
    let temp = TempDir::new().unwrap();
    write_hints(&temp, &sample_entries());

    assert!(temp.path().join("3.hint").exists());
    assert!(!temp.path().join("3.hint.tmp").exists());
}

#[test]
fn test_unfinished_writer_does_not_publish() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("3.hint");

    let mut writer = HintWriter::create(&path).unwrap();
    writer.add(&sample_entries()[0]).unwrap();
    drop(writer);

    assert!(!path.exists());
}

#[test]
fn test_corrupt_entry_detected() {
    let temp = TempDir::new().unwrap();
    let path = write_hints(&temp, &sample_entries());

    let mut bytes = fs::read(&path).unwrap();
    bytes[HINT_HEADER_SIZE] ^= 0x20; // first byte of the first key

    let first = HintReader::new(bytes.as_slice()).next().unwrap();
    assert!(matches!(first, Err(CaskError::ChecksumMismatch { .. })));
}

#[test]
fn test_truncated_hint_detected() {
    let temp = TempDir::new().unwrap();
    let path = write_hints(&temp, &sample_entries());

    let bytes = fs::read(&path).unwrap();
    let cut = &bytes[..bytes.len() - 2];

    let results: Vec<_> = HintReader::new(cut).collect();
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(CaskError::Truncated { .. })));
}

#[test]
fn test_huge_declared_key_length_detected() {
    let temp = TempDir::new().unwrap();
    let path = write_hints(&temp, &sample_entries());

    let mut bytes = fs::read(&path).unwrap();
    bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());

    let first = HintReader::new(bytes.as_slice()).next().unwrap();
    assert!(matches!(first, Err(CaskError::Truncated { .. })));
}
