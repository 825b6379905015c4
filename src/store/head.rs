//! Producer head/tail tracking and the advance-head write path.
//!
//! `head` is the last written identifier, `tail` the oldest still-valid one.
//! Both live in atomics and, when the producer requests a durable advance,
//! are persisted to the 16-byte `.meta` sidecar.

use std::sync::atomic::Ordering;

use crate::error::Result;
use crate::format::meta;
use crate::store::{io, RingStore};

impl RingStore {
    /// Last written identifier. `min_id - 1` on a fresh store.
    pub fn head(&self) -> u64 {
        self.inner.head.load(Ordering::SeqCst)
    }

    /// Oldest still-valid identifier. `min_id` on a fresh store.
    pub fn tail(&self) -> u64 {
        self.inner.tail.load(Ordering::SeqCst)
    }

    /// Write `payload` at the next ring position and return its identifier.
    ///
    /// Computes `head + 1`, wrapping back to `min_id` past `max_id` and
    /// overwriting the oldest slot from then on; `tail` tracks the oldest
    /// identifier the ring still holds. With `flush` set, the slot write is
    /// durable and the head/tail sidecar is persisted in one write call.
    ///
    /// Only one producer may call this at a time; readers may observe
    /// [`RingStore::head`] and [`RingStore::tail`] concurrently.
    pub fn advance_head(&self, payload: &[u8], flush: bool) -> Result<u64> {
        let inner = &self.inner;

        let mut next = inner.head.fetch_add(1, Ordering::SeqCst) + 1;
        if next > inner.max_id {
            inner.head.store(inner.min_id, Ordering::SeqCst);
            next = inner.min_id;
        }

        let old_tail = inner.tail.load(Ordering::SeqCst);
        if next == inner.min_id {
            // Wrap transition: the slot at min_id is being overwritten, the
            // oldest survivor is the one after it.
            inner.tail.store(inner.min_id + 1, Ordering::SeqCst);
        } else if old_tail != inner.min_id {
            // Ring already full once; tail stays one ahead of head.
            let mut tail = next + 1;
            if tail > inner.max_id {
                tail = inner.min_id;
            }
            inner.tail.store(tail, Ordering::SeqCst);
        }

        io::write_slot(inner, next, payload, flush)?;

        if flush {
            meta::save(
                &inner.meta_path,
                inner.head.load(Ordering::SeqCst),
                inner.tail.load(Ordering::SeqCst),
            )?;
        }
        Ok(next)
    }
}
