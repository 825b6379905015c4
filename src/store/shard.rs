//! One shard: a file backing a contiguous run of slots.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

use memmap2::MmapMut;

/// A shard owns one file, its optional memory map, and the engine-relative
/// offset of its first slot. Shards move raw bytes at byte offsets; they do
/// not interpret slot contents, take locks, or range-check identifiers.
pub(crate) struct Shard {
    file: File,
    map: Option<MmapMut>,
    path: PathBuf,
    slots: u64,
    offset: u64,
}

impl Shard {
    pub(crate) fn new(
        file: File,
        map: Option<MmapMut>,
        path: PathBuf,
        slots: u64,
        offset: u64,
    ) -> Self {
        Self {
            file,
            map,
            path,
            slots,
            offset,
        }
    }

    /// Slot count held by this shard.
    pub(crate) fn slots(&self) -> u64 {
        self.slots
    }

    /// Engine-relative offset of this shard's first slot.
    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    fn check_range(&self, offset: u64, len: usize, total: u64) -> io::Result<()> {
        let end = offset + len as u64;
        if end > total {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "byte range {}..{} outside shard {} ({} bytes)",
                    offset,
                    end,
                    self.path.display(),
                    total
                ),
            ));
        }
        Ok(())
    }

    /// Read `buf.len()` bytes at `offset` into `buf`.
    pub(crate) fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        if let Some(map) = &self.map {
            self.check_range(offset, buf.len(), map.len() as u64)?;
            // Raw copy out of the shared map; the caller's stripe lock keeps
            // this slot range stable for the duration.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    map.as_ptr().add(offset as usize),
                    buf.as_mut_ptr(),
                    buf.len(),
                );
            }
            Ok(())
        } else {
            self.file.read_exact_at(buf, offset)
        }
    }

    /// Write `buf` at `offset`.
    pub(crate) fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        if let Some(map) = &self.map {
            self.check_range(offset, buf.len(), map.len() as u64)?;
            // Raw copy into the shared map; the caller's stripe lock
            // serializes writers of this slot range.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    buf.as_ptr(),
                    map.as_ptr().add(offset as usize) as *mut u8,
                    buf.len(),
                );
            }
            Ok(())
        } else {
            self.file.write_all_at(buf, offset)
        }
    }

    /// Push this shard's bytes to durable storage: msync when mapped, fsync
    /// otherwise.
    pub(crate) fn sync(&self) -> io::Result<()> {
        match &self.map {
            Some(map) => map.flush(),
            None => self.file.sync_all(),
        }
    }
}
