//! Error types surfaced by the store.

use std::io;

use thiserror::Error;

/// Errors produced by [`crate::RingStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier falls outside the configured `[min_id, max_id]` range,
    /// or a bulk range exceeds it.
    #[error("id {id} out of range (allowed {min}..={max})")]
    OutOfRange {
        /// Offending identifier.
        id: u64,
        /// Lowest valid identifier.
        min: u64,
        /// Highest valid identifier.
        max: u64,
    },

    /// The payload length does not match the configured record size.
    #[error("payload size mismatch: got {got} want {want}")]
    PayloadSize {
        /// Length of the supplied payload.
        got: usize,
        /// Configured record size.
        want: usize,
    },

    /// The stored checksum does not match the payload bytes on disk.
    #[error("corrupted: CRC mismatch at id {id}")]
    CorruptSlot {
        /// Identifier of the corrupt slot.
        id: u64,
    },

    /// A bulk read stopped early; `partial` holds every payload collected
    /// before the failing element.
    #[error("bulk read stopped at id {id}: {source}")]
    Bulk {
        /// Identifier of the element that failed.
        id: u64,
        /// Payloads read before the failure, in order.
        partial: Vec<Vec<u8>>,
        /// The error of the failing element.
        #[source]
        source: Box<StoreError>,
    },

    /// The persisted layout descriptor is unreadable or incompatible.
    #[error("layout descriptor mismatch: {0}")]
    ConfigMismatch(String),

    /// Construction-time parameter violation.
    #[error("invalid options: {0}")]
    Invalid(String),

    /// Underlying filesystem or memory-map failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
