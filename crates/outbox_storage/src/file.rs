//! Durable backend over one file on disk.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The open handle and the length the log layer has written so far.
#[derive(Debug)]
struct Handle {
    file: File,
    len: u64,
}

/// A backend storing one log in one file.
///
/// Appends go to the end of the file; [`StorageBackend::sync`] is an
/// `fsync`. [`StorageBackend::replace`] writes `<file>.tmp`, syncs it,
/// renames it over the log and syncs the directory, so a crash during
/// compaction leaves either the old log or the new one.
///
/// ```no_run
/// use outbox_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut log = FileBackend::open(Path::new(".outbox/pending.log")).unwrap();
/// log.append(b"frame").unwrap();
/// log.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    handle: Mutex<Handle>,
}

impl FileBackend {
    /// Opens the file at `path`, creating it empty if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened or its length read.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            handle: Mutex::new(Handle { file, len }),
        })
    }

    /// Returns the file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut handle = self.handle.lock();
        let size = handle.len;
        if offset.saturating_add(len as u64) > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        let mut buf = vec![0u8; len];
        if len > 0 {
            handle.file.seek(SeekFrom::Start(offset))?;
            handle.file.read_exact(&mut buf)?;
        }
        Ok(buf)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let handle = self.handle.get_mut();
        let offset = handle.len;
        if !data.is_empty() {
            handle.file.seek(SeekFrom::Start(offset))?;
            handle.file.write_all(data)?;
            handle.len += data.len() as u64;
        }
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(self.handle.get_mut().file.flush()?)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.handle.lock().len)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(self.handle.get_mut().file.sync_all()?)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let handle = self.handle.get_mut();
        if new_size > handle.len {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size: handle.len,
            });
        }

        handle.file.set_len(new_size)?;
        handle.file.sync_all()?;
        handle.len = new_size;
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let staging = self.staging_path();
        let mut out = File::create(&staging)?;
        out.write_all(data)?;
        out.sync_all()?;
        drop(out);

        fs::rename(&staging, &self.path)?;
        sync_parent_dir(&self.path)?;

        let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        *self.handle.get_mut() = Handle {
            file,
            len: data.len() as u64,
        };

        tracing::debug!(path = %self.path.display(), bytes = data.len(), "log rewritten");
        Ok(())
    }
}

/// Makes a rename durable by syncing the directory holding `path`.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
