//! The ring store engine: shard assembly, routing, locking, lifecycle.

pub(crate) mod head;
pub(crate) mod io;
pub(crate) mod options;
pub(crate) mod pool;
pub(crate) mod shard;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use log::{info, warn};
use memmap2::MmapOptions;
use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::format::{self, config, meta};
use self::options::StoreOptions;
use self::pool::BufferPool;
use self::shard::Shard;

/// Number of reader-writer lock stripes; identifier `i` maps to stripe
/// `i % N_LOCKS`.
const N_LOCKS: usize = 256;

/// Hit/miss counters snapshot. `hit_ratio` is a percentage (0-100).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    /// Successful reads.
    pub hits: u64,
    /// Reads that failed on I/O or checksum verification.
    pub misses: u64,
    /// `hits / (hits + misses)` in percent; 0 when no reads happened.
    pub hit_ratio: f64,
}

/// A persistent, fixed-record, disk-backed ring buffer.
///
/// Records live in one or more shard files, each slot framed by a CRC-32
/// checksum. Identifiers from a fixed `[min_id, max_id]` range map to slots;
/// a single producer appends through [`RingStore::advance_head`], wrapping to
/// `min_id` after `max_id` and overwriting the oldest slots. Any number of
/// threads may read concurrently.
///
/// Dropping the handle releases all resources; [`RingStore::close`] does the
/// same after quiescing background read-ahead.
pub struct RingStore {
    pub(crate) inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    shards: Vec<Shard>,
    /// Total slot count `N = max_id - min_id + 1`.
    slots: u64,
    record_size: usize,
    /// Bytes per on-disk slot: `record_size` plus the checksum prefix.
    slot_bytes: usize,
    min_id: u64,
    max_id: u64,
    prefetch_size: usize,
    locks: Box<[RwLock<()>]>,
    pool: Option<BufferPool>,
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
    hits: CachePadded<AtomicU64>,
    misses: CachePadded<AtomicU64>,
    meta_path: PathBuf,
    prefetch: io::PrefetchTracker,
    closed: AtomicBool,
}

fn validate(opts: &StoreOptions) -> std::result::Result<(), String> {
    if opts.record_size == 0 {
        return Err("record_size must be positive".into());
    }
    if opts.min_id == 0 {
        return Err("min_id must be >= 1".into());
    }
    if opts.max_id <= opts.min_id {
        return Err("max_id must be > min_id".into());
    }
    Ok(())
}

fn shard_path(base: &Path, index: usize, shard_count: usize) -> PathBuf {
    if shard_count == 1 {
        return base.to_path_buf();
    }
    let mut os = base.as_os_str().to_os_string();
    os.push(format!(".{index}"));
    PathBuf::from(os)
}

impl RingStore {
    /// Open or create a store rooted at `base`.
    ///
    /// Creates the parent directory and shard files as needed, truncating
    /// each shard to its computed length. When a `.cfg` descriptor already
    /// exists at `base`, its layout overrides the layout fields of
    /// `options`. A `.meta` sidecar, when present and readable, restores the
    /// producer's head/tail; otherwise both start fresh at
    /// `(min_id - 1, min_id)`.
    pub fn open<P: AsRef<Path>>(base: P, options: StoreOptions) -> Result<Self> {
        let base = base.as_ref();
        let mut opts = options;

        validate(&opts).map_err(StoreError::Invalid)?;
        opts.shard_count = opts.shard_count.max(1);

        if let Some(parent) = base.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        config::verify_or_write(&config::cfg_path(base), &mut opts)?;
        // The descriptor may have replaced the layout; it must still satisfy
        // the construction invariants.
        validate(&opts).map_err(StoreError::ConfigMismatch)?;

        let shard_count = opts.shard_count.max(1);
        let slots = opts.max_id - opts.min_id + 1;
        let slot_bytes = opts.record_size + format::SLOT_OVERHEAD;

        let per_shard = if shard_count > 1 {
            slots.div_ceil(shard_count as u64)
        } else {
            slots
        };

        let mut shards = Vec::with_capacity(shard_count);
        let mut offset = 0u64;
        for i in 0..shard_count {
            let remaining = slots - offset;
            let shard_slots = if i == shard_count - 1 {
                remaining
            } else {
                per_shard.min(remaining)
            };

            let path = shard_path(base, i, shard_count);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&path)?;

            let disk_len = shard_slots * slot_bytes as u64;
            file.set_len(disk_len)?;

            let map = if opts.use_mmap && disk_len > 0 {
                Some(unsafe { MmapOptions::new().len(disk_len as usize).map_mut(&file)? })
            } else {
                None
            };

            shards.push(Shard::new(file, map, path, shard_slots, offset));
            offset += shard_slots;
        }

        let meta_path = meta::meta_path(base);
        let fresh = (opts.min_id - 1, opts.min_id);
        let (head, tail) = match meta::load(&meta_path) {
            Ok((h, t))
                if h >= opts.min_id - 1
                    && h <= opts.max_id
                    && t >= opts.min_id
                    && t <= opts.max_id =>
            {
                (h, t)
            }
            Ok((h, t)) => {
                warn!(
                    "meta sidecar {} out of range (head {h}, tail {t}); starting fresh",
                    meta_path.display()
                );
                fresh
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "unusable meta sidecar {}: {e}; starting fresh",
                        meta_path.display()
                    );
                }
                fresh
            }
        };

        let locks = (0..N_LOCKS)
            .map(|_| RwLock::new(()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let pool = (opts.buffer_pool_size > 0)
            .then(|| BufferPool::new(slot_bytes, opts.buffer_pool_size));

        info!(
            "opened ring store at {} ({} slots of {} bytes across {} shard(s), mmap {})",
            base.display(),
            slots,
            opts.record_size,
            shard_count,
            if opts.use_mmap { "on" } else { "off" },
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                shards,
                slots,
                record_size: opts.record_size,
                slot_bytes,
                min_id: opts.min_id,
                max_id: opts.max_id,
                prefetch_size: opts.prefetch_size,
                locks,
                pool,
                head: CachePadded::new(AtomicU64::new(head)),
                tail: CachePadded::new(AtomicU64::new(tail)),
                hits: CachePadded::new(AtomicU64::new(0)),
                misses: CachePadded::new(AtomicU64::new(0)),
                meta_path,
                prefetch: io::PrefetchTracker::new(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Force every shard to durable storage: msync for mapped shards, fsync
    /// for unmapped ones. All shards are attempted; the first error wins.
    pub fn flush(&self) -> Result<()> {
        let mut first_err = None;
        for (i, s) in self.inner.shards.iter().enumerate() {
            if let Err(e) = s.sync() {
                if first_err.is_none() {
                    first_err = Some(StoreError::Io(std::io::Error::new(
                        e.kind(),
                        format!("sync shard {i}: {e}"),
                    )));
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Quiesce background read-ahead and release the handle. Shard maps are
    /// unmapped and descriptors closed as the last internal reference drops.
    ///
    /// Consuming `self` makes the handle unusable afterwards; no flush is
    /// performed, call [`RingStore::flush`] first for durability.
    pub fn close(self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.prefetch.drain();
        Ok(())
    }

    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> Stats {
        let hits = self.inner.hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_ratio = if total > 0 {
            hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Stats {
            hits,
            misses,
            hit_ratio,
        }
    }

    /// Zero the hit/miss counters.
    pub fn reset_stats(&self) {
        self.inner.hits.store(0, Ordering::Relaxed);
        self.inner.misses.store(0, Ordering::Relaxed);
    }

    /// Total slot count of the ring.
    pub fn size(&self) -> u64 {
        self.inner.slots
    }

    /// Payload bytes per record.
    pub fn record_size(&self) -> usize {
        self.inner.record_size
    }

    /// Number of shard files backing the ring.
    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }
}

impl StoreInner {
    /// Translate an absolute identifier to its 1-based relative position.
    pub(crate) fn rel_of(&self, id: u64) -> Result<u64> {
        if id < self.min_id || id > self.max_id {
            return Err(StoreError::OutOfRange {
                id,
                min: self.min_id,
                max: self.max_id,
            });
        }
        Ok(id - self.min_id + 1)
    }

    /// Locate the shard holding relative position `rel`, returning it with
    /// the 1-based slot index inside that shard.
    pub(crate) fn shard_for(&self, rel: u64) -> Result<(&Shard, u64)> {
        if rel >= 1 && rel <= self.slots {
            for s in &self.shards {
                if rel > s.offset() && rel <= s.offset() + s.slots() {
                    return Ok((s, rel - s.offset()));
                }
            }
        }
        Err(StoreError::OutOfRange {
            id: self.min_id - 1 + rel,
            min: self.min_id,
            max: self.max_id,
        })
    }

    /// Stripe lock for an identifier.
    pub(crate) fn stripe(&self, id: u64) -> &RwLock<()> {
        &self.locks[(id % N_LOCKS as u64) as usize]
    }

    pub(crate) fn acquire_buf(&self) -> Vec<u8> {
        match &self.pool {
            Some(pool) => pool.acquire(),
            None => vec![0u8; self.slot_bytes],
        }
    }

    pub(crate) fn release_buf(&self, buf: Vec<u8>) {
        if let Some(pool) = &self.pool {
            pool.release(buf);
        }
    }
}
