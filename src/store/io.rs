//! Read/write data path, bulk operations, and read-ahead dispatch.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::error::{Result, StoreError};
use crate::format;
use crate::store::{RingStore, StoreInner};

impl RingStore {
    /// Write `payload` to the slot for `id`, overwriting any prior contents.
    ///
    /// `payload` must be exactly `record_size` bytes. With `flush` set, the
    /// shard is pushed to durable storage before returning.
    pub fn write(&self, id: u64, payload: &[u8], flush: bool) -> Result<()> {
        write_slot(&self.inner, id, payload, flush)
    }

    /// Read the payload stored at `id`.
    ///
    /// Verifies the slot checksum; a slot that was never written fails with
    /// [`StoreError::CorruptSlot`]. The returned buffer is freshly owned and
    /// independent of any internal map or pool. A successful read may
    /// schedule background reads of the following identifiers when
    /// `prefetch_size` is configured.
    pub fn read(&self, id: u64) -> Result<Vec<u8>> {
        read_slot(&self.inner, id, true)
    }

    /// Write consecutive payloads starting at `start_id`, requesting
    /// durability only for the last element when `flush` is set.
    ///
    /// The whole range and every payload length are validated up front, but
    /// the writes themselves are not atomic across slots: a failure or crash
    /// may leave any prefix written.
    pub fn bulk_write<P: AsRef<[u8]>>(
        &self,
        start_id: u64,
        payloads: &[P],
        flush: bool,
    ) -> Result<()> {
        if payloads.is_empty() {
            return Ok(());
        }
        let inner = &self.inner;
        let last = start_id + payloads.len() as u64 - 1;
        if start_id < inner.min_id || last > inner.max_id {
            return Err(StoreError::OutOfRange {
                id: if start_id < inner.min_id { start_id } else { last },
                min: inner.min_id,
                max: inner.max_id,
            });
        }
        for p in payloads {
            let got = p.as_ref().len();
            if got != inner.record_size {
                return Err(StoreError::PayloadSize {
                    got,
                    want: inner.record_size,
                });
            }
        }
        for (i, p) in payloads.iter().enumerate() {
            let id = start_id + i as u64;
            let flush_this = flush && i == payloads.len() - 1;
            write_slot(inner, id, p.as_ref(), flush_this)?;
        }
        Ok(())
    }

    /// Read `count` consecutive payloads starting at `start_id`.
    ///
    /// On failure, the returned [`StoreError::Bulk`] carries the payloads
    /// collected before the failing element.
    pub fn bulk_read(&self, start_id: u64, count: usize) -> Result<Vec<Vec<u8>>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let inner = &self.inner;
        let last = start_id + count as u64 - 1;
        if start_id < inner.min_id || last > inner.max_id {
            return Err(StoreError::OutOfRange {
                id: if start_id < inner.min_id { start_id } else { last },
                min: inner.min_id,
                max: inner.max_id,
            });
        }
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let id = start_id + i as u64;
            match read_slot(inner, id, true) {
                Ok(p) => out.push(p),
                Err(e) => {
                    return Err(StoreError::Bulk {
                        id,
                        partial: out,
                        source: Box::new(e),
                    })
                }
            }
        }
        Ok(out)
    }
}

pub(crate) fn write_slot(inner: &StoreInner, id: u64, payload: &[u8], flush: bool) -> Result<()> {
    let rel = inner.rel_of(id)?;
    if payload.len() != inner.record_size {
        return Err(StoreError::PayloadSize {
            got: payload.len(),
            want: inner.record_size,
        });
    }
    let (shard, slot) = inner.shard_for(rel)?;
    let offset = (slot - 1) * inner.slot_bytes as u64;

    let _guard = inner.stripe(id).write();

    let mut buf = inner.acquire_buf();
    format::encode_slot(&mut buf, payload);
    let res = shard
        .write_at(&buf, offset)
        .and_then(|()| if flush { shard.sync() } else { Ok(()) });
    inner.release_buf(buf);

    res.map_err(StoreError::from)
}

pub(crate) fn read_slot(
    inner: &Arc<StoreInner>,
    id: u64,
    allow_prefetch: bool,
) -> Result<Vec<u8>> {
    let rel = inner.rel_of(id)?;
    let (shard, slot) = inner.shard_for(rel)?;
    let offset = (slot - 1) * inner.slot_bytes as u64;

    let mut buf = inner.acquire_buf();
    let decoded = {
        let _guard = inner.stripe(id).read();
        if let Err(e) = shard.read_at(&mut buf, offset) {
            inner.misses.fetch_add(1, Ordering::Relaxed);
            inner.release_buf(buf);
            return Err(e.into());
        }
        format::decode_slot(&buf).map(|p| p.to_vec())
    };
    inner.release_buf(buf);

    let payload = match decoded {
        Some(p) => p,
        None => {
            inner.misses.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::CorruptSlot { id });
        }
    };
    inner.hits.fetch_add(1, Ordering::Relaxed);

    if allow_prefetch && inner.prefetch_size > 0 && !inner.closed.load(Ordering::Acquire) {
        // Fan out within the current shard only.
        let mut ids = Vec::with_capacity(inner.prefetch_size);
        for i in 1..=inner.prefetch_size as u64 {
            let next = slot + i;
            if next > shard.slots() {
                break;
            }
            ids.push(inner.min_id - 1 + shard.offset() + next);
        }
        spawn_prefetch(inner, ids);
    }

    Ok(payload)
}

/// Dispatch one background worker reading `ids` in order.
///
/// Identifiers already being prefetched are skipped. Results and errors are
/// dropped; only the hit/miss counters observe the reads. Workers never fan
/// out further and stop early once the store is closing.
fn spawn_prefetch(inner: &Arc<StoreInner>, mut ids: Vec<u64>) {
    {
        let mut pending = inner.prefetch.pending.lock();
        ids.retain(|id| pending.insert(*id));
    }
    if ids.is_empty() {
        return;
    }

    inner.prefetch.begin();
    let worker = Arc::clone(inner);
    let worker_ids = ids.clone();
    let spawned = thread::Builder::new()
        .name("ringstore-prefetch".to_string())
        .spawn(move || {
            for &id in &worker_ids {
                if !worker.closed.load(Ordering::Acquire) {
                    let _ = read_slot(&worker, id, false);
                }
                worker.prefetch.pending.lock().remove(&id);
            }
            worker.prefetch.finish();
        });

    if let Err(e) = spawned {
        debug!("prefetch worker spawn failed: {e}");
        let mut pending = inner.prefetch.pending.lock();
        for id in &ids {
            pending.remove(id);
        }
        drop(pending);
        inner.prefetch.finish();
    }
}

/// Tracks in-flight read-ahead so duplicates are suppressed and close can
/// wait for background work to settle.
pub(crate) struct PrefetchTracker {
    /// Identifiers currently scheduled or being read.
    pending: Mutex<HashSet<u64>>,
    /// Number of live worker threads.
    inflight: Mutex<usize>,
    idle: Condvar,
}

impl PrefetchTracker {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(HashSet::new()),
            inflight: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    fn begin(&self) {
        *self.inflight.lock() += 1;
    }

    fn finish(&self) {
        let mut n = self.inflight.lock();
        *n -= 1;
        if *n == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until no worker threads remain.
    pub(crate) fn drain(&self) {
        let mut n = self.inflight.lock();
        while *n > 0 {
            self.idle.wait(&mut n);
        }
    }
}
