//! Integration tests for the core read/write path.

use std::fs::OpenOptions;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use ringstore::{RingStore, StoreError, StoreOptions};
use tempfile::tempdir;

fn test_opts(min_id: u64, max_id: u64, record_size: usize) -> StoreOptions {
    StoreOptions {
        min_id,
        max_id,
        record_size,
        use_mmap: false,
        shard_count: 1,
        buffer_pool_size: 10,
        prefetch_size: 0,
    }
}

/// Deterministic pseudo-random payload for a given seed.
fn payload(seed: u64, len: usize) -> Vec<u8> {
    let mut x = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x as u8
        })
        .collect()
}

#[test]
fn write_read_round_trip() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let store = RingStore::open(&base, test_opts(1, 100, 32)).unwrap();

    for id in 1..=100u64 {
        let p = payload(id, 32);
        store.write(id, &p, id == 100).unwrap();
        assert_eq!(store.read(id).unwrap(), p, "payload mismatch at id {id}");
    }

    let st = store.stats();
    assert_eq!(st.hits, 100);
    assert_eq!(st.misses, 0);
    assert!((st.hit_ratio - 100.0).abs() < f64::EPSILON);

    store.close().unwrap();
}

#[test]
fn bulk_write_read() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let store = RingStore::open(&base, test_opts(1, 50, 16)).unwrap();

    let payloads: Vec<&[u8]> = vec![
        b"abcdefghijklmnop",
        b"qrstuvwxyzABCDEF",
        b"GHIJKLMNOPQRSTUV",
    ];
    store.bulk_write(10, &payloads, true).unwrap();

    let got = store.bulk_read(10, payloads.len()).unwrap();
    assert_eq!(got.len(), 3);
    for (i, want) in payloads.iter().enumerate() {
        assert_eq!(got[i], *want, "payload mismatch at idx {i}");
    }
}

#[test]
fn corrupted_payload_byte_fails_read() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let store = RingStore::open(&base, test_opts(1, 10, 8)).unwrap();

    store.write(1, b"12345678", true).unwrap();

    // Flip the first payload byte on disk (offset 4, just past the CRC).
    let f = OpenOptions::new().write(true).open(&base).unwrap();
    f.write_all_at(&[0xFF], 4).unwrap();

    match store.read(1) {
        Err(StoreError::CorruptSlot { id: 1 }) => {}
        other => panic!("expected CorruptSlot, got {:?}", other.map(|_| ())),
    }
    assert!(store.stats().misses >= 1);
}

#[test]
fn unwritten_slot_reads_as_corrupt() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let store = RingStore::open(&base, test_opts(1, 10, 8)).unwrap();

    assert!(matches!(
        store.read(5),
        Err(StoreError::CorruptSlot { id: 5 })
    ));
}

#[test]
fn flush_close_reopen_persists() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");

    let store = RingStore::open(&base, test_opts(1, 5, 12)).unwrap();
    store.write(3, b"HelloWorld!!", false).unwrap();
    store.flush().unwrap();
    store.close().unwrap();

    let reopened = RingStore::open(&base, test_opts(1, 5, 12)).unwrap();
    assert_eq!(reopened.read(3).unwrap(), b"HelloWorld!!");
    reopened.close().unwrap();
}

#[test]
fn persisted_layout_overrides_reopen_options() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");

    let store = RingStore::open(&base, test_opts(1, 20, 16)).unwrap();
    let p = payload(7, 16);
    store.write(7, &p, true).unwrap();
    store.close().unwrap();

    // Conflicting layout on reopen: the on-disk descriptor wins.
    let reopened = RingStore::open(&base, test_opts(5, 99, 32)).unwrap();
    assert_eq!(reopened.record_size(), 16);
    assert_eq!(reopened.size(), 20);
    assert_eq!(reopened.shard_count(), 1);
    assert_eq!(reopened.read(7).unwrap(), p);
}

#[test]
fn mmap_round_trip() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let mut opts = test_opts(1, 64, 24);
    opts.use_mmap = true;
    let store = RingStore::open(&base, opts).unwrap();

    for id in 1..=64u64 {
        let p = payload(id, 24);
        store.write(id, &p, false).unwrap();
        assert_eq!(store.read(id).unwrap(), p);
    }
    store.flush().unwrap();
    store.close().unwrap();
}

#[test]
fn multi_shard_writes_stay_inside_their_shard() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.dat");

    // 10 slots over 2 shards of 5; slot 6 is the first slot of shard 1 and
    // must land at byte offset 0 of that file.
    let mut opts = test_opts(1, 10, 2048);
    opts.shard_count = 2;
    opts.use_mmap = true;
    let store = RingStore::open(&base, opts).unwrap();

    for i in 0..6u64 {
        let p = payload(i, 2048);
        let id = store.advance_head(&p, false).unwrap();
        assert_eq!(id, i + 1);
        assert_eq!(store.read(id).unwrap(), p);
    }

    // Both shard files exist with 5 slots each.
    let slot_bytes: u64 = 2048 + 4;
    for i in 0..2 {
        let path = PathBuf::from(format!("{}.{i}", base.display()));
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, 5 * slot_bytes);
    }
    store.close().unwrap();
}

#[test]
fn out_of_range_and_payload_errors() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let store = RingStore::open(&base, test_opts(10, 20, 8)).unwrap();

    assert!(matches!(
        store.write(9, b"12345678", false),
        Err(StoreError::OutOfRange { id: 9, min: 10, max: 20 })
    ));
    assert!(matches!(
        store.read(21),
        Err(StoreError::OutOfRange { id: 21, .. })
    ));
    assert!(matches!(
        store.write(10, b"short", false),
        Err(StoreError::PayloadSize { got: 5, want: 8 })
    ));

    // Bulk ranges are validated before any element is touched.
    let batch: Vec<&[u8]> = vec![b"aaaaaaaa"; 3];
    assert!(matches!(
        store.bulk_write(19, &batch, false),
        Err(StoreError::OutOfRange { .. })
    ));
    assert!(matches!(
        store.bulk_read(9, 2),
        Err(StoreError::OutOfRange { .. })
    ));
}

#[test]
fn bulk_read_reports_partial_progress() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let store = RingStore::open(&base, test_opts(1, 10, 8)).unwrap();

    for id in 1..=3u64 {
        store.write(id, &payload(id, 8), false).unwrap();
    }

    // Slot 4 was never written, so the bulk read stops there.
    match store.bulk_read(1, 5) {
        Err(StoreError::Bulk { id, partial, source }) => {
            assert_eq!(id, 4);
            assert_eq!(partial.len(), 3);
            for (i, p) in partial.iter().enumerate() {
                assert_eq!(*p, payload(i as u64 + 1, 8));
            }
            assert!(matches!(*source, StoreError::CorruptSlot { id: 4 }));
        }
        other => panic!("expected Bulk error, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn disabled_buffer_pool_still_works() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let mut opts = test_opts(1, 10, 16);
    opts.buffer_pool_size = 0;
    let store = RingStore::open(&base, opts).unwrap();

    let p = payload(1, 16);
    store.write(1, &p, true).unwrap();
    assert_eq!(store.read(1).unwrap(), p);
}

#[test]
fn prefetch_is_transparent() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let mut opts = test_opts(1, 40, 16);
    opts.prefetch_size = 4;
    let store = RingStore::open(&base, opts).unwrap();

    for id in 1..=40u64 {
        store.write(id, &payload(id, 16), false).unwrap();
    }
    for id in (1..=40u64).step_by(5) {
        assert_eq!(store.read(id).unwrap(), payload(id, 16));
    }

    // Close drains whatever read-ahead is still in flight.
    store.close().unwrap();
}

#[test]
fn stats_reset() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let store = RingStore::open(&base, test_opts(1, 10, 8)).unwrap();

    store.write(1, b"abcdefgh", false).unwrap();
    store.read(1).unwrap();
    let _ = store.read(2); // unwritten, counts as miss

    let st = store.stats();
    assert_eq!(st.hits, 1);
    assert_eq!(st.misses, 1);

    store.reset_stats();
    let st = store.stats();
    assert_eq!((st.hits, st.misses), (0, 0));
    assert_eq!(st.hit_ratio, 0.0);
}

#[test]
fn concurrent_reader_and_writer() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("cache.data");
    let store = Arc::new(RingStore::open(&base, test_opts(1, 200, 24)).unwrap());

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for id in 1..=200u64 {
                store.write(id, &payload(id, 24), false).unwrap();
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for id in 1..=200u64 {
                // Reads may race ahead of the writer and fail; that only
                // shows up as misses, never as bad payload bytes.
                if let Ok(p) = store.read(id) {
                    assert_eq!(p, payload(id, 24));
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}
