//! Head/tail sidecar.
//!
//! Sixteen bytes, little-endian: `head` at 0..8, `tail` at 8..16. Written in
//! a single `write` call when the producer requests a durable advance; read
//! back on open to resume the ring position across restarts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Byte length of the sidecar.
const META_LEN: usize = 16;

/// Sidecar path for a given base path.
pub(crate) fn meta_path(base: &Path) -> PathBuf {
    let mut os = base.as_os_str().to_os_string();
    os.push(".meta");
    PathBuf::from(os)
}

/// Persist `head` and `tail` with one write syscall.
pub(crate) fn save(path: &Path, head: u64, tail: u64) -> io::Result<()> {
    let mut buf = [0u8; META_LEN];
    buf[0..8].copy_from_slice(&head.to_le_bytes());
    buf[8..16].copy_from_slice(&tail.to_le_bytes());
    fs::write(path, buf)
}

/// Load `(head, tail)` from the sidecar.
///
/// A short file counts as unreadable; the caller decides how to fall back.
pub(crate) fn load(path: &Path) -> io::Result<(u64, u64)> {
    let data = fs::read(path)?;
    if data.len() < META_LEN {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("meta file too small: {} bytes", data.len()),
        ));
    }
    let head = u64::from_le_bytes([
        data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
    ]);
    let tail = u64::from_le_bytes([
        data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
    ]);
    Ok((head, tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.meta");

        save(&path, 42, 7).unwrap();
        assert_eq!(load(&path).unwrap(), (42, 7));

        // Overwrite in place.
        save(&path, u64::MAX, 0).unwrap();
        assert_eq!(load(&path).unwrap(), (u64::MAX, 0));
    }

    #[test]
    fn layout_is_little_endian() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.meta");

        save(&path, 0x0102030405060708, 0x1112131415161718).unwrap();
        let raw = fs::read(&path).unwrap();
        assert_eq!(raw.len(), 16);
        assert_eq!(&raw[0..8], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&raw[8..16], &[0x18, 0x17, 0x16, 0x15, 0x14, 0x13, 0x12, 0x11]);
    }

    #[test]
    fn short_file_is_unreadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.meta");
        fs::write(&path, [0u8; 7]).unwrap();

        assert!(load(&path).is_err());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempdir().unwrap();
        assert!(load(&dir.path().join("absent.meta")).is_err());
    }

    #[test]
    fn meta_path_appends_suffix() {
        assert_eq!(
            meta_path(Path::new("/data/store.dat")),
            PathBuf::from("/data/store.dat.meta")
        );
    }
}
