//! Per-project advisory file locks
//!
//! Each project maps to `<locks_dir>/<project>.lock`. The OS lock is taken on
//! the open file handle, so it excludes other handles in this process as well
//! as other worker processes sharing the directory.

use std::fs::{File, OpenOptions, TryLockError};
use std::io;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, warn};

use crate::errors::GateError;
use crate::storage::layout::StorageLayout;

/// Non-blocking named locks backed by lock files
#[derive(Debug, Clone)]
pub struct FileLocks {
    layout: StorageLayout,
}

impl FileLocks {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Take the lock for `key` or fail immediately with [`GateError::Busy`].
    ///
    /// Opening the lock file is blocking file IO, so it runs on the blocking
    /// pool; the lock itself is never waited for.
    pub async fn try_acquire(&self, key: &str) -> Result<LockGuard, GateError> {
        let path = self.layout.lock_file(key);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || lock_file(&path, key))
            .await
            .map_err(|e| GateError::Io(io::Error::other(e)))?
    }
}

fn lock_file(path: &Path, key: String) -> Result<LockGuard, GateError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?;

    match file.try_lock() {
        Ok(()) => {
            debug!(project = %key, path = %path.display(), "Lock acquired");
            Ok(LockGuard {
                key,
                file,
                acquired_at: Instant::now(),
            })
        }
        Err(TryLockError::WouldBlock) => Err(GateError::Busy { project: key }),
        Err(TryLockError::Error(e)) => Err(GateError::Io(e)),
    }
}

/// A held project lock, released when dropped
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    file: File,
    acquired_at: Instant,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock now
    pub fn release(self) {}
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the handle would release it too; unlock explicitly so a
        // failure shows up in the logs.
        if let Err(e) = self.file.unlock() {
            warn!(project = %self.key, error = %e, "Failed to unlock project lock");
        }
        debug!(
            project = %self.key,
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Lock released"
        );
    }
}
