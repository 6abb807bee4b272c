// src/lock.rs

//! Exclusive run lock
//!
//! Commands that change the live world, the install areas or the backup
//! directory hold this lock for their whole run so two invocations never
//! interleave. The lock file lives in the backup directory.
//!
//! ```ignore
//! let _lock = RunLock::try_acquire(&layout.backup_dir)?;
//! // ... run the pipeline ...
//! // released on drop
//! ```

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lock file name inside the backup directory
pub const LOCK_FILE_NAME: &str = ".worldpack.lock";

/// Held `flock(LOCK_EX)` on the lock file
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock, failing with `Error::Locked` if another run holds it
    pub fn try_acquire(dir: impl AsRef<Path>) -> Result<Self> {
        let (file, path) = open_lock_file(dir.as_ref())?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                info!("Acquired run lock at {}", path.display());
                Ok(Self { file, path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                debug!("Run lock already held at {}", path.display());
                Err(Error::Locked(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!("Released run lock at {}", self.path.display());
    }
}

fn open_lock_file(dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOCK_FILE_NAME);
    let file = File::create(&path)?;
    Ok((file, path))
}
