//! On-disk formats used by the store.
//!
//! Three artifacts live on disk next to each other:
//!
//! - Shard files holding densely packed slots, each slot framed by the codec
//!   in this module: a little-endian IEEE CRC-32 of the payload followed by
//!   the payload itself.
//! - A `.cfg` sidecar with the layout descriptor (see [`config`]).
//! - A `.meta` sidecar with the producer's head/tail counters (see [`meta`]).
//!
//! All multi-byte integers are little-endian.

pub(crate) mod config;
pub(crate) mod meta;

use crc32fast::Hasher;

/// Bytes of framing per slot: the CRC-32 prefix.
pub(crate) const SLOT_OVERHEAD: usize = 4;

/// Encode one slot: CRC-32 of `payload` into `buf[0..4]`, payload after it.
///
/// `buf` must be exactly `payload.len() + SLOT_OVERHEAD` bytes.
pub(crate) fn encode_slot(buf: &mut [u8], payload: &[u8]) {
    debug_assert_eq!(buf.len(), payload.len() + SLOT_OVERHEAD);

    let mut hasher = Hasher::new();
    hasher.update(payload);
    let crc = hasher.finalize();

    buf[..SLOT_OVERHEAD].copy_from_slice(&crc.to_le_bytes());
    buf[SLOT_OVERHEAD..].copy_from_slice(payload);
}

/// Decode one slot, returning the payload bytes if the stored checksum
/// matches. `None` means the slot is corrupt (or was never written).
pub(crate) fn decode_slot(buf: &[u8]) -> Option<&[u8]> {
    debug_assert!(buf.len() > SLOT_OVERHEAD);

    let stored = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let payload = &buf[SLOT_OVERHEAD..];

    let mut hasher = Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != stored {
        return None;
    }
    Some(payload)
}
