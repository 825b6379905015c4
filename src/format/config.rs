//! Persisted layout descriptor.
//!
//! The `.cfg` sidecar records every option that affects the byte layout of
//! the shard files. The descriptor on disk is authoritative: reopening a
//! store overrides the caller's layout options with the persisted values, so
//! a handle can never interpret existing shards with the wrong geometry.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::store::options::StoreOptions;

/// Descriptor path for a given base path.
pub(crate) fn cfg_path(base: &Path) -> PathBuf {
    let mut os = base.as_os_str().to_os_string();
    os.push(".cfg");
    PathBuf::from(os)
}

/// The subset of [`StoreOptions`] that affects file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PersistedLayout {
    pub record_size: usize,
    pub min_id: u64,
    pub max_id: u64,
    pub shard_count: usize,
}

impl PersistedLayout {
    pub(crate) fn from_options(opts: &StoreOptions) -> Self {
        Self {
            record_size: opts.record_size,
            min_id: opts.min_id,
            max_id: opts.max_id,
            shard_count: opts.shard_count,
        }
    }
}

/// Load the descriptor at `path` and sync `opts` to it, or persist a fresh
/// descriptor when none exists yet.
///
/// On reopen, any caller-supplied layout field that disagrees with the
/// descriptor is overridden and logged.
pub(crate) fn verify_or_write(path: &Path, opts: &mut StoreOptions) -> Result<()> {
    let want = PersistedLayout::from_options(opts);

    if !path.exists() {
        let body = serde_json::to_string_pretty(&want)
            .map_err(|e| StoreError::ConfigMismatch(format!("encode descriptor: {e}")))?;
        fs::write(path, body)?;
        return Ok(());
    }

    let body = fs::read_to_string(path)?;
    let have: PersistedLayout = serde_json::from_str(&body).map_err(|e| {
        StoreError::ConfigMismatch(format!("unreadable descriptor {}: {e}", path.display()))
    })?;

    if have != want {
        warn!(
            "layout descriptor {} overrides supplied options: \
             record_size {} -> {}, min_id {} -> {}, max_id {} -> {}, shard_count {} -> {}",
            path.display(),
            want.record_size,
            have.record_size,
            want.min_id,
            have.min_id,
            want.max_id,
            have.max_id,
            want.shard_count,
            have.shard_count,
        );
    }

    opts.record_size = have.record_size;
    opts.min_id = have.min_id;
    opts.max_id = have.max_id;
    opts.shard_count = have.shard_count;
    Ok(())
}
