//! Store configuration.

/// Configuration for [`crate::RingStore`].
///
/// - `use_mmap`: map shard files read/write shared instead of issuing
///   positional syscalls
/// - `shard_count`: number of files backing the slot array (0 = single file)
/// - `buffer_pool_size`: buffers retained for reuse across calls (0 = off)
/// - `prefetch_size`: records read ahead after each successful read (0 = off)
///
/// `record_size`, `min_id`, `max_id` and `shard_count` fix the on-disk layout
/// and are persisted to the `.cfg` sidecar on first open; on reopen the
/// sidecar wins over whatever is supplied here.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// First identifier of the ring (must be >= 1).
    pub min_id: u64,
    /// Last identifier of the ring (must be > `min_id`).
    pub max_id: u64,
    /// Memory-map shard files for in-process byte copies.
    pub use_mmap: bool,
    /// Number of shard files (0 is treated as 1).
    pub shard_count: usize,
    /// Payload bytes per record, required > 0.
    pub record_size: usize,
    /// Maximum pooled buffers (0 disables pooling).
    pub buffer_pool_size: usize,
    /// Read-ahead depth after a successful read (0 disables prefetch).
    pub prefetch_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            min_id: 1,
            max_id: 1_000_000,
            use_mmap: true,
            shard_count: 4,
            record_size: 32,
            buffer_pool_size: 1000,
            prefetch_size: 4,
        }
    }
}
