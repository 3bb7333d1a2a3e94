//! End-to-end tests for the log engine.

use reclog_core::{Log, LogConfig, LogError, Record};
use reclog_storage::FRAME_HEADER_SIZE;
use std::io::Read;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

const VALUE: &[u8] = b"hello world";

fn open_log(max_index_size: u64) -> (TempDir, Log) {
    let dir = tempdir().unwrap();
    let log = Log::open(dir.path(), LogConfig::new().max_index_size(max_index_size)).unwrap();
    (dir, log)
}

#[test]
fn append_and_read_record() {
    let (_dir, log) = open_log(3);

    let offset = log.append(VALUE).unwrap();
    assert_eq!(offset, 0);

    let record = log.read(offset).unwrap();
    assert_eq!(record.offset, 0);
    assert_eq!(record.value, VALUE);
}

#[test]
fn read_out_of_range() {
    let (_dir, log) = open_log(3);

    let result = log.read(1);
    assert!(matches!(
        result,
        Err(LogError::OffsetOutOfRange { offset: 1 })
    ));
}

#[test]
fn offsets_are_monotonic() {
    let (_dir, log) = open_log(3);

    for expected in 0..10 {
        assert_eq!(log.append(VALUE).unwrap(), expected);
    }
    assert_eq!(log.lowest_offset(), 0);
    assert_eq!(log.highest_offset(), 9);
}

#[test]
fn recovery_preserves_offsets_and_records() {
    let dir = tempdir().unwrap();
    let config = LogConfig::new().max_index_size(3);

    {
        let log = Log::open(dir.path(), config).unwrap();
        for _ in 0..5 {
            log.append(VALUE).unwrap();
        }
        assert_eq!(log.lowest_offset(), 0);
        assert_eq!(log.highest_offset(), 4);
        log.close().unwrap();
    }

    let log = Log::open(dir.path(), config).unwrap();
    assert_eq!(log.lowest_offset(), 0);
    assert_eq!(log.highest_offset(), 4);
    for offset in 0..5 {
        let record = log.read(offset).unwrap();
        assert_eq!(record.offset, offset);
        assert_eq!(record.value, VALUE);
    }
}

#[test]
fn recovery_continues_offset_sequence() {
    let dir = tempdir().unwrap();
    let config = LogConfig::new().max_index_size(3);

    {
        let log = Log::open(dir.path(), config).unwrap();
        for _ in 0..5 {
            log.append(VALUE).unwrap();
        }
        log.close().unwrap();
    }

    let log = Log::open(dir.path(), config).unwrap();
    assert_eq!(log.append(VALUE).unwrap(), 5);
}

#[test]
fn recovered_full_segment_rolls_over() {
    let dir = tempdir().unwrap();
    let config = LogConfig::new().max_index_size(3);

    {
        let log = Log::open(dir.path(), config).unwrap();
        for _ in 0..3 {
            log.append(VALUE).unwrap();
        }
        log.close().unwrap();
    }

    // The recovered active segment is at capacity; the next append must
    // land in a fresh segment.
    let log = Log::open(dir.path(), config).unwrap();
    assert_eq!(log.append(VALUE).unwrap(), 3);
    assert_eq!(log.read(3).unwrap().value, VALUE);
}

#[test]
fn streaming_reader_yields_framed_records() {
    let (_dir, log) = open_log(3);
    log.append(VALUE).unwrap();

    let mut stream = Vec::new();
    log.reader().read_to_end(&mut stream).unwrap();

    let header_size = FRAME_HEADER_SIZE as usize;
    let frame_len = u64::from_be_bytes(stream[..header_size].try_into().unwrap()) as usize;
    assert_eq!(frame_len, 8 + VALUE.len());
    assert_eq!(stream.len(), header_size + frame_len);

    let record = Record::decode(&stream[header_size..]).unwrap();
    assert_eq!(record.offset, 0);
    assert_eq!(record.value, VALUE);
}

#[test]
fn streaming_reader_spans_segments() {
    let (_dir, log) = open_log(2);
    let payloads: [&[u8]; 5] = [b"one", b"two", b"three", b"four", b"five"];
    for payload in payloads {
        log.append(payload).unwrap();
    }

    let mut stream = Vec::new();
    log.reader().read_to_end(&mut stream).unwrap();

    let header_size = FRAME_HEADER_SIZE as usize;
    let mut cursor = 0;
    for (i, payload) in payloads.iter().enumerate() {
        let frame_len =
            u64::from_be_bytes(stream[cursor..cursor + header_size].try_into().unwrap()) as usize;
        cursor += header_size;

        let record = Record::decode(&stream[cursor..cursor + frame_len]).unwrap();
        assert_eq!(record.offset, i as u64);
        assert_eq!(&record.value, payload);
        cursor += frame_len;
    }
    assert_eq!(cursor, stream.len());
}

#[test]
fn truncate_removes_whole_prefix_segments() {
    let (_dir, log) = open_log(3);
    for _ in 0..4 {
        log.append(VALUE).unwrap();
    }

    // Segments are [0..2] and [3..3]; truncating at 2 drops the first.
    log.truncate(2).unwrap();

    assert!(matches!(
        log.read(0),
        Err(LogError::OffsetOutOfRange { offset: 0 })
    ));
    assert_eq!(log.read(3).unwrap().value, VALUE);
    assert_eq!(log.lowest_offset(), 3);
    assert_eq!(log.highest_offset(), 3);
}

#[test]
fn truncate_below_segment_boundary_keeps_segment() {
    let (_dir, log) = open_log(3);
    for _ in 0..4 {
        log.append(VALUE).unwrap();
    }

    // Offset 1 is inside segment [0..2]; truncation is segment-grained, so
    // nothing is removed.
    log.truncate(1).unwrap();
    assert_eq!(log.lowest_offset(), 0);
    assert_eq!(log.read(0).unwrap().value, VALUE);
}

#[test]
fn truncate_can_remove_active_segment() {
    let (_dir, log) = open_log(3);
    log.append(VALUE).unwrap();
    log.append(VALUE).unwrap();

    // The lone active segment is [0..1] with next_offset 2, so it
    // qualifies and is dropped; the log continues at offset 2.
    log.truncate(1).unwrap();

    assert!(matches!(
        log.read(0),
        Err(LogError::OffsetOutOfRange { offset: 0 })
    ));
    assert!(matches!(
        log.read(1),
        Err(LogError::OffsetOutOfRange { offset: 1 })
    ));
    assert_eq!(log.lowest_offset(), 2);
    assert_eq!(log.append(VALUE).unwrap(), 2);
}

#[test]
fn truncate_everything_continues_offset_sequence() {
    let (_dir, log) = open_log(3);
    for _ in 0..4 {
        log.append(VALUE).unwrap();
    }

    log.truncate(100).unwrap();

    for offset in 0..4 {
        assert!(matches!(
            log.read(offset),
            Err(LogError::OffsetOutOfRange { .. })
        ));
    }
    assert_eq!(log.lowest_offset(), 4);
    assert_eq!(log.append(VALUE).unwrap(), 4);
}

#[test]
fn rollover_layout_on_disk() {
    let (dir, log) = open_log(3);
    for _ in 0..9 {
        log.append(VALUE).unwrap();
    }

    // 9 appends at capacity 3 fill exactly three segments; the next
    // segment is not created until an append needs it.
    let filers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| {
            let path = entry.unwrap().path();
            (path.extension().and_then(|ext| ext.to_str()) == Some("filer"))
                .then(|| path.file_stem().unwrap().to_str().unwrap().parse::<u64>().unwrap())
        })
        .collect();

    let mut bases = filers;
    bases.sort_unstable();
    assert_eq!(bases, vec![0, 3, 6]);

    assert_eq!(log.append(VALUE).unwrap(), 9);
    assert_eq!(log.highest_offset(), 9);
}

#[test]
fn reset_reinitializes_empty() {
    let (_dir, log) = open_log(3);
    for _ in 0..5 {
        log.append(VALUE).unwrap();
    }

    log.reset().unwrap();
    assert_eq!(log.lowest_offset(), 0);
    assert_eq!(log.highest_offset(), 0);
    assert!(matches!(log.read(0), Err(LogError::OffsetOutOfRange { .. })));
    assert_eq!(log.append(VALUE).unwrap(), 0);
}

#[test]
fn remove_deletes_directory() {
    let dir = tempdir().unwrap();
    let log_dir = dir.path().join("log");
    let log = Log::open(&log_dir, LogConfig::new()).unwrap();
    log.append(VALUE).unwrap();

    log.remove().unwrap();
    assert!(!log_dir.exists());
}

#[test]
fn directory_lock_is_exclusive() {
    let dir = tempdir().unwrap();
    let log = Log::open(dir.path(), LogConfig::new()).unwrap();

    let result = Log::open(dir.path(), LogConfig::new());
    assert!(matches!(result, Err(LogError::DirectoryLocked)));

    drop(log);
    Log::open(dir.path(), LogConfig::new()).unwrap();
}

#[test]
fn non_segment_files_are_ignored() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"not a segment").unwrap();

    let log = Log::open(dir.path(), LogConfig::new()).unwrap();
    assert_eq!(log.append(VALUE).unwrap(), 0);
    assert_eq!(log.read(0).unwrap().value, VALUE);
}

#[test]
fn concurrent_appends_round_trip() {
    let (_dir, log) = open_log(8);
    let log = Arc::new(log);

    let payloads: Vec<Vec<u8>> = (0..4).map(|i| vec![i as u8; 16]).collect();
    let mut handles = Vec::new();
    for payload in payloads.clone() {
        let log = Arc::clone(&log);
        handles.push(std::thread::spawn(move || {
            for _ in 0..25 {
                log.append(&payload).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(log.lowest_offset(), 0);
    assert_eq!(log.highest_offset(), 99);
    for offset in 0..100 {
        let record = log.read(offset).unwrap();
        assert_eq!(record.offset, offset);
        assert!(payloads.contains(&record.value));
    }
}

#[test]
fn reads_proceed_while_streaming() {
    let (_dir, log) = open_log(4);
    for _ in 0..6 {
        log.append(VALUE).unwrap();
    }

    // Hold a reader mid-stream while serving offset reads.
    let mut reader = log.reader();
    let mut first = [0u8; 10];
    reader.read(&mut first).unwrap();

    assert_eq!(log.read(5).unwrap().value, VALUE);

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).unwrap();
    let total = first.len() + rest.len();
    assert_eq!(total as u64, 6 * (FRAME_HEADER_SIZE + 8 + VALUE.len() as u64));
}
