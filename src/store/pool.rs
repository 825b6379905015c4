//! Reusable slot-sized buffers.

use parking_lot::Mutex;

/// A bounded stack of byte buffers, all exactly one on-disk slot long.
///
/// Purely an allocation optimization: an empty pool hands out fresh buffers,
/// and only exact-length buffers are taken back. Correctness never depends
/// on what the pool holds.
pub(crate) struct BufferPool {
    bufs: Mutex<Vec<Vec<u8>>>,
    buf_len: usize,
    max_retained: usize,
}

impl BufferPool {
    pub(crate) fn new(buf_len: usize, max_retained: usize) -> Self {
        Self {
            bufs: Mutex::new(Vec::new()),
            buf_len,
            max_retained,
        }
    }

    /// Take a zero-initialized or recycled buffer of the slot length.
    pub(crate) fn acquire(&self) -> Vec<u8> {
        if let Some(buf) = self.bufs.lock().pop() {
            return buf;
        }
        vec![0u8; self.buf_len]
    }

    /// Hand a buffer back. Wrong-length buffers are dropped.
    pub(crate) fn release(&self, buf: Vec<u8>) {
        if buf.len() != self.buf_len {
            return;
        }
        let mut bufs = self.bufs.lock();
        if bufs.len() < self.max_retained {
            bufs.push(buf);
        }
    }
}
