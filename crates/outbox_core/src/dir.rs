//! Store directory management.
//!
//! ```text
//! <dir>/
//! ├─ LOCK          # Advisory lock for single-writer
//! ├─ records.log   # Record Store
//! ├─ pending.log   # Pending Mutation Log
//! └─ ids.log       # Local to remote id bindings
//! ```

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const RECORDS_FILE: &str = "records.log";
const PENDING_FILE: &str = "pending.log";
const IDS_FILE: &str = "ids.log";

/// Suffix appended to a damaged log's name when it is set aside.
const QUARANTINE_SUFFIX: &str = "corrupt";

/// Holds the store directory and its exclusive lock.
///
/// Only one `StoreDir` can exist per directory at a time, across processes.
/// The lock is released when this value is dropped.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens (or creates) a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDirectory` if the path is missing (and
    /// `create_if_missing` is false) or is not a directory, and
    /// `DirectoryLocked` if another process holds the lock.
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::InvalidDirectory {
                    message: format!("store directory does not exist: {}", path.display()),
                });
            }
        }

        if !path.is_dir() {
            return Err(CoreError::InvalidDirectory {
                message: format!("path is not a directory: {}", path.display()),
            });
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DirectoryLocked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the Record Store log.
    #[must_use]
    pub fn records_path(&self) -> PathBuf {
        self.path.join(RECORDS_FILE)
    }

    /// Returns the path of the Pending Mutation Log.
    #[must_use]
    pub fn pending_path(&self) -> PathBuf {
        self.path.join(PENDING_FILE)
    }

    /// Returns the path of the id map log.
    #[must_use]
    pub fn ids_path(&self) -> PathBuf {
        self.path.join(IDS_FILE)
    }

    /// Copies a damaged file aside as `<name>.corrupt`, replacing any
    /// earlier copy, and returns the copy's path.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    pub fn quarantine(&self, file: &Path) -> CoreResult<PathBuf> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CoreError::InvalidDirectory {
                message: format!("not a file path: {}", file.display()),
            })?;
        let target = self.path.join(format!("{name}.{QUARANTINE_SUFFIX}"));
        fs::copy(file, &target)?;
        Ok(target)
    }
}
