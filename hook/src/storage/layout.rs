//! Storage layout configuration

use std::path::PathBuf;

use crate::errors::HookError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Where per-project lock and timestamp records live
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all records
    pub locks_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(locks_dir: impl Into<PathBuf>) -> Self {
        Self {
            locks_dir: locks_dir.into(),
        }
    }

    /// Get the locks directory
    pub fn locks_dir(&self) -> Dir {
        Dir::new(&self.locks_dir)
    }

    /// Path of the advisory lock file for a project
    pub fn lock_file(&self, project: &str) -> PathBuf {
        self.locks_dir.join(format!("{project}.lock"))
    }

    /// Last accepted deploy record for a project
    pub fn status_file(&self, project: &str) -> File {
        self.locks_dir().file(&format!("{project}.status"))
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), HookError> {
        self.locks_dir().create().await
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new("/tmp/locks")
    }
}
