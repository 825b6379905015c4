//! Ringstore - a persistent, fixed-record, disk-backed ring buffer for
//! record streams larger than RAM.
//!
//! # Overview
//!
//! Records live on disk in one or more shard files as fixed-size slots, each
//! protected by a CRC-32 checksum. The buffer is addressed by monotonically
//! advancing identifiers in a configured `[min_id, max_id]` range; when the
//! producer reaches the upper bound it wraps back to the lower bound,
//! overwriting the oldest slot. Hot pages stay resident through the
//! operating system's page cache, optionally via shared memory maps.
//!
//! # Key Features
//!
//! - Fixed on-disk slot format with per-record CRC-32 integrity checks
//! - Optional memory-mapped I/O per shard, syscall-based otherwise
//! - Sharded files with strict slot-to-shard confinement
//! - 256-way striped reader-writer locks for low-contention concurrency
//! - Single-producer advance-head writes with persisted head/tail metadata
//! - Best-effort background read-ahead after successful reads
//! - Hit/miss statistics and a reusable buffer pool
//!
//! # Usage
//!
//! ```no_run
//! use ringstore::{RingStore, StoreOptions};
//!
//! let options = StoreOptions {
//!     min_id: 1,
//!     max_id: 1_000,
//!     record_size: 32,
//!     ..StoreOptions::default()
//! };
//! let store = RingStore::open("/tmp/ringstore/data", options)?;
//!
//! let payload = [7u8; 32];
//! let id = store.advance_head(&payload, true)?;
//! assert_eq!(store.read(id)?, payload);
//! store.close()?;
//! # Ok::<(), ringstore::StoreError>(())
//! ```
//!
//! See the `demos` directory for a complete walk-through.

#![deny(missing_docs)]

mod error;
mod format;
mod store;

pub use error::{Result, StoreError};
pub use store::options::StoreOptions;
pub use store::{RingStore, Stats};

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;

/// Global instance for applications that want one process-wide store.
static GLOBAL_STORE: OnceCell<Arc<RingStore>> = OnceCell::new();

/// Open the process-wide store, or return the already-installed one.
///
/// The first successful call wins; later calls get the same instance and
/// their arguments are ignored.
pub fn init_global<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Arc<RingStore>> {
    GLOBAL_STORE
        .get_or_try_init(|| RingStore::open(path, options).map(Arc::new))
        .cloned()
}

/// The process-wide store, if [`init_global`] has installed one.
pub fn global() -> Option<Arc<RingStore>> {
    GLOBAL_STORE.get().cloned()
}
