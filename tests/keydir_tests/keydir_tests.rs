//! Tests for the Keydir
//!
//! These tests verify:
//! - put/get through a segment writer (buffered and unbuffered)
//! - Offsets computed from durable + staged bytes
//! - Replay of a segment (load_from_data)
//! - First-writer-wins merge, including tombstones
//! - Hint entries round-tripping through load_from_hint

use std::fs::{File, OpenOptions};
use std::io::Cursor;

use caskkv::config::FlushStrategy;
use caskkv::keydir::Keydir;
use caskkv::log::{encode, HintReader, HintWriter, SegmentWriter, HEADER_SIZE, TOMBSTONE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_active(capacity: usize) -> (TempDir, SegmentWriter) {
    let temp_dir = TempDir::new().unwrap();
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(temp_dir.path().join("active.dat"))
        .unwrap();
    (temp_dir, SegmentWriter::new(file, capacity).unwrap())
}

fn segment(records: &[(&str, &[u8])]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (key, value) in records {
        bytes.extend_from_slice(&encode(0, key.as_bytes(), value).unwrap());
    }
    bytes
}

// =============================================================================
// Put / Get Tests
// =============================================================================

#[test]
fn test_put_get_many() {
    let (_temp, mut writer) = setup_active(0);
    let mut keydir = Keydir::new();

    for i in 0..1000 {
        let key = i.to_string();
        let value = format!("value_{}", key);
        keydir
            .put(0, &mut writer, key.as_bytes(), value.as_bytes(), FlushStrategy::EveryWrite)
            .unwrap();
    }

    for i in 0..1000 {
        let key = i.to_string();
        let value = keydir.get(writer.file(), key.as_bytes()).unwrap();
        assert_eq!(value, Some(format!("value_{}", key).into_bytes()));
    }
    assert_eq!(keydir.len(), 1000);
}

#[test]
fn test_get_absent_key() {
    let (_temp, writer) = setup_active(0);
    let keydir = Keydir::new();

    assert_eq!(keydir.get(writer.file(), b"missing").unwrap(), None);
}

#[test]
fn test_put_records_offsets() {
    let (_temp, mut writer) = setup_active(0);
    let mut keydir = Keydir::new();

    let first = keydir
        .put(4, &mut writer, b"a", b"1", FlushStrategy::EveryWrite)
        .unwrap();
    let second = keydir
        .put(4, &mut writer, b"bb", b"22", FlushStrategy::EveryWrite)
        .unwrap();

    assert_eq!(first.segment_id, 4);
    assert_eq!(first.value_position, 0);
    assert_eq!(first.value_size, 1);
    assert_eq!(second.value_position, (HEADER_SIZE + 2) as u64);
    assert_eq!(keydir.lookup(b"bb"), Some(&second));
}

#[test]
fn test_every_write_flushes_through_buffer() {
    let (_temp, mut writer) = setup_active(4096);
    let mut keydir = Keydir::new();

    keydir
        .put(0, &mut writer, b"k", b"v", FlushStrategy::EveryWrite)
        .unwrap();

    assert_eq!(writer.staged_len(), 0);
    assert_eq!(writer.durable_len(), (HEADER_SIZE + 2) as u64);
}

#[test]
fn test_buffered_offsets_account_for_staged_bytes() {
    let (_temp, mut writer) = setup_active(4096);
    let mut keydir = Keydir::new();

    keydir
        .put(0, &mut writer, b"a", b"1", FlushStrategy::Buffered)
        .unwrap();
    let second = keydir
        .put(0, &mut writer, b"b", b"2", FlushStrategy::Buffered)
        .unwrap();

    assert_eq!(writer.durable_len(), 0);
    assert_eq!(second.value_position, (HEADER_SIZE + 2) as u64);

    writer.flush().unwrap();
    assert_eq!(keydir.get(writer.file(), b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_overwrite_points_at_latest() {
    let (_temp, mut writer) = setup_active(0);
    let mut keydir = Keydir::new();

    keydir.put(0, &mut writer, b"k", b"old", FlushStrategy::EveryWrite).unwrap();
    keydir.put(0, &mut writer, b"k", b"new", FlushStrategy::EveryWrite).unwrap();

    assert_eq!(keydir.len(), 1);
    assert_eq!(keydir.get(writer.file(), b"k").unwrap(), Some(b"new".to_vec()));
}

#[test]
fn test_delete_appends_tombstone_and_removes() {
    let (_temp, mut writer) = setup_active(0);
    let mut keydir = Keydir::new();

    keydir.put(0, &mut writer, b"k", b"v", FlushStrategy::EveryWrite).unwrap();
    keydir.delete(0, &mut writer, b"k", FlushStrategy::EveryWrite).unwrap();

    assert!(!keydir.contains_key(b"k"));
    assert_eq!(
        writer.durable_len(),
        (2 * HEADER_SIZE + 2 + 1 + TOMBSTONE.len()) as u64
    );
}

#[test]
fn test_short_read_returns_none() {
    let (temp, mut writer) = setup_active(0);
    let mut keydir = Keydir::new();
    keydir.put(0, &mut writer, b"k", b"value", FlushStrategy::EveryWrite).unwrap();

    let path = temp.path().join("empty.dat");
    File::create(&path).unwrap();
    let empty = File::open(&path).unwrap();

    assert_eq!(keydir.get(&empty, b"k").unwrap(), None);
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_load_from_data_matches_writes() {
    let (_temp, mut writer) = setup_active(0);
    let mut written = Keydir::new();
    for i in 0..500 {
        let key = i.to_string();
        written
            .put(2, &mut writer, key.as_bytes(), format!("value_{}", key).as_bytes(), FlushStrategy::EveryWrite)
            .unwrap();
    }

    let replayed = Keydir::load_from_data(2, writer.file()).unwrap();

    assert_eq!(replayed.len(), 500);
    for (key, entry) in written.iter() {
        let other = replayed.lookup(key).unwrap();
        assert_eq!(other.segment_id, 2);
        assert_eq!(other.value_position, entry.value_position);
        assert_eq!(other.value_size, entry.value_size);
        assert_eq!(other.timestamp, entry.timestamp);
    }
}

#[test]
fn test_replay_last_write_wins_within_segment() {
    let bytes = segment(&[("a", b"1"), ("a", b"2")]);

    let keydir = Keydir::load_from_reader(0, Cursor::new(bytes)).unwrap();

    let entry = keydir.lookup(b"a").unwrap();
    assert_eq!(entry.value_position, (HEADER_SIZE + 2) as u64);
}

#[test]
fn test_replay_tombstone_removes_key() {
    let bytes = segment(&[("a", b"1"), ("a", TOMBSTONE), ("b", b"2")]);

    let keydir = Keydir::load_from_reader(0, Cursor::new(bytes)).unwrap();

    assert!(!keydir.contains_key(b"a"));
    assert!(keydir.contains_key(b"b"));
    assert_eq!(keydir.tombstone_count(), 1);
}

#[test]
fn test_replay_put_after_tombstone_revives_key() {
    let bytes = segment(&[("a", TOMBSTONE), ("a", b"back")]);

    let keydir = Keydir::load_from_reader(0, Cursor::new(bytes)).unwrap();

    assert!(keydir.contains_key(b"a"));
    assert_eq!(keydir.tombstone_count(), 0);
}

#[test]
fn test_replay_fails_on_torn_tail() {
    let mut bytes = segment(&[("a", b"1"), ("b", b"2")]);
    bytes.pop();

    assert!(Keydir::load_from_reader(0, Cursor::new(bytes)).is_err());
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_is_first_writer_wins() {
    let newer = segment(&[("shared", b"new"), ("only_new", b"x")]);
    let older = segment(&[("shared", b"old"), ("only_old", b"y")]);

    let mut keydir = Keydir::load_from_reader(2, Cursor::new(newer)).unwrap();
    keydir.merge(Keydir::load_from_reader(1, Cursor::new(older)).unwrap());

    assert_eq!(keydir.len(), 3);
    assert_eq!(keydir.lookup(b"shared").unwrap().segment_id, 2);
    assert_eq!(keydir.lookup(b"only_old").unwrap().segment_id, 1);
}

#[test]
fn test_merge_tombstone_shadows_older_entry() {
    let newer = segment(&[("gone", TOMBSTONE)]);
    let older = segment(&[("gone", b"value"), ("kept", b"v")]);

    let mut keydir = Keydir::load_from_reader(2, Cursor::new(newer)).unwrap();
    keydir.merge(Keydir::load_from_reader(1, Cursor::new(older)).unwrap());
    keydir.clear_tombstones();

    assert!(!keydir.contains_key(b"gone"));
    assert!(keydir.contains_key(b"kept"));
    assert_eq!(keydir.tombstone_count(), 0);
}

#[test]
fn test_merge_older_tombstone_does_not_hide_newer_entry() {
    let newer = segment(&[("k", b"alive")]);
    let older = segment(&[("k", TOMBSTONE)]);

    let mut keydir = Keydir::load_from_reader(2, Cursor::new(newer)).unwrap();
    keydir.merge(Keydir::load_from_reader(1, Cursor::new(older)).unwrap());

    assert_eq!(keydir.lookup(b"k").unwrap().segment_id, 2);
}

// =============================================================================
// Hint Tests
// =============================================================================

#[test]
fn test_hint_entries_reload_identically() {
    let temp = TempDir::new().unwrap();
    let bytes = segment(&[("a", b"1"), ("b", b"22"), ("b", TOMBSTONE), ("c", b"333")]);
    let original = Keydir::load_from_reader(5, Cursor::new(bytes)).unwrap();

    let path = temp.path().join("5.hint");
    let mut hints = HintWriter::create(&path).unwrap();
    for entry in original.hint_entries() {
        hints.add(&entry).unwrap();
    }
    hints.finish().unwrap();

    let reloaded = Keydir::load_from_hint(5, File::open(&path).unwrap()).unwrap();

    assert_eq!(reloaded.len(), original.len());
    assert_eq!(reloaded.tombstone_count(), 1);
    for (key, entry) in original.iter() {
        assert_eq!(reloaded.lookup(key), Some(entry));
    }

    let raw: Vec<_> = HintReader::new(File::open(&path).unwrap())
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(raw.iter().filter(|h| h.tombstone).count(), 1);
}
