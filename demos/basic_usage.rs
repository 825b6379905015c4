//! Basic usage example for the ring store
//!
//! This example demonstrates:
//! 1. Opening a sharded, memory-mapped store
//! 2. Appending records through the producer advance-head path
//! 3. Random-access reads and bulk reads from concurrent threads
//! 4. Wrap-around behaviour once the ring is full
//! 5. Hit/miss statistics and durable shutdown
//!
//! The example uses a temporary directory for the shard files, which is
//! cleaned up at the end.

use ringstore::{RingStore, StoreOptions};

use std::sync::Arc;
use std::thread;

const RECORD_SIZE: usize = 64;
const RING_SLOTS: u64 = 500;

fn main() -> ringstore::Result<()> {
    let dir = std::env::temp_dir().join("ringstore_example");
    let base = dir.join("ring.dat");
    println!("Using store at: {:?}", base);

    let options = StoreOptions {
        min_id: 1,
        max_id: RING_SLOTS,
        record_size: RECORD_SIZE,
        shard_count: 2,
        use_mmap: true,
        buffer_pool_size: 100,
        prefetch_size: 4,
    };
    let store = Arc::new(RingStore::open(&base, options)?);

    // Fill the ring twice over so the producer wraps and overwrites the
    // oldest records.
    let total_appends = RING_SLOTS * 2;
    println!("Appending {} records ({} slots, so one full wrap)", total_appends, RING_SLOTS);

    for i in 0..total_appends {
        let mut payload = [0u8; RECORD_SIZE];
        payload[..8].copy_from_slice(&i.to_le_bytes());
        let flush = i == total_appends - 1;
        let id = store.advance_head(&payload, flush)?;
        if i % 250 == 0 {
            println!("  append #{} landed at id {} (head {}, tail {})", i, id, store.head(), store.tail());
        }
    }

    println!("After wrap: head = {}, tail = {}", store.head(), store.tail());

    // Read back from a few threads in parallel.
    let num_threads = 4;
    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut newest = 0u64;
                for id in 1..=RING_SLOTS {
                    let payload = store.read(id).expect("slot should verify");
                    let mut seq = [0u8; 8];
                    seq.copy_from_slice(&payload[..8]);
                    newest = newest.max(u64::from_le_bytes(seq));
                }
                println!("Thread {} done, newest sequence seen: {}", thread_id, newest);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Bulk read a small window around the tail.
    let window = store.bulk_read(store.tail(), 8)?;
    println!("Bulk read {} records starting at tail", window.len());

    let stats = store.stats();
    println!(
        "Stats: {} hits, {} misses, hit ratio {:.1}%",
        stats.hits, stats.misses, stats.hit_ratio
    );

    store.flush()?;
    match Arc::try_unwrap(store) {
        Ok(store) => store.close()?,
        Err(_) => unreachable!("all reader threads joined"),
    }

    // Cleanup - delete the temporary directory
    std::fs::remove_dir_all(&dir).ok();
    println!("Example completed successfully");
    Ok(())
}
