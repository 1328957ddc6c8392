//! Destination lock management
//!
//! Two installs racing on the same destination would interleave their
//! overwrites. The installer holds an exclusive advisory lock on
//! `<destination>/.<binary>.lock` while it writes.
//!
//! The lock file is never removed. Unlinking it would let one installer lock
//! the orphaned inode while another locks a fresh file at the same path. The
//! kernel drops the lock when its holder exits, so a crashed run leaves
//! nothing stale behind.

use crate::core::error::InstallError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Lock file path guarding `binary_name` inside `destination`.
pub fn lock_path(destination: &Path, binary_name: &str) -> PathBuf {
    destination.join(format!(".{binary_name}.lock"))
}

/// Acquire an exclusive lock on the install destination.
/// Returns a guard that releases the lock when dropped.
pub fn acquire_destination_lock(
    destination: &Path,
    binary_name: &str,
) -> Result<DestinationLock, InstallError> {
    let lock_path = lock_path(destination, binary_name);

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|source| InstallError::CopyFailed {
            path: lock_path.clone(),
            source,
        })?;

    if lock_file.try_lock_exclusive().is_err() {
        return Err(InstallError::DestinationLocked {
            destination: destination.to_path_buf(),
            lock: lock_path,
        });
    }

    Ok(DestinationLock { _file: lock_file })
}

/// RAII guard for the destination lock; closing the file releases it
#[derive(Debug)]
pub struct DestinationLock {
    _file: File,
}
