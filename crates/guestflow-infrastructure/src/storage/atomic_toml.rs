//! Atomic TOML document files.
//!
//! Every write goes to a temporary sibling, is fsynced, then renamed over
//! the target, so readers only ever see a complete document.

use guestflow_core::error::GuestflowError;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during atomic TOML operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Failed to lock {path}: {message}")]
    Lock { path: PathBuf, message: String },

    #[error("Invalid path {path}: {message}")]
    InvalidPath { path: PathBuf, message: String },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<StorageError> for GuestflowError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::Parse { .. } | StorageError::Serialize { .. } => {
                GuestflowError::Serialization {
                    format: "toml".to_string(),
                    message: err.to_string(),
                }
            }
            StorageError::Io { .. } => GuestflowError::io(err.to_string()),
            StorageError::Lock { .. } | StorageError::InvalidPath { .. } => {
                GuestflowError::data_access(err.to_string())
            }
        }
    }
}

/// A handle to one TOML document on disk.
///
/// Provides:
/// - **Atomicity**: Updates are all-or-nothing via tmp file + atomic rename
/// - **Isolation**: Read-modify-write runs under an exclusive file lock
/// - **Durability**: Explicit fsync before rename
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the document.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and deserialized
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<T>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let data = toml::from_str(&content).map_err(|source| StorageError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(data))
    }

    /// Writes the document atomically, creating parent directories.
    pub fn save(&self, data: &T) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let toml_string =
            toml::to_string_pretty(data).map_err(|source| StorageError::Serialize {
                path: self.path.clone(),
                source,
            })?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path).map_err(|e| StorageError::io(&tmp_path, e))?;
        tmp_file
            .write_all(toml_string.as_bytes())
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        tmp_file
            .sync_all()
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }

    /// Modifies an existing document under an exclusive lock.
    ///
    /// Returns `Ok(false)` without writing when the document does not exist.
    pub fn update_existing<F>(&self, f: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&mut T),
    {
        let _lock = FileLock::acquire(&self.path)?;

        let Some(mut data) = self.load()? else {
            return Ok(false);
        };
        f(&mut data);
        self.save(&data)?;
        Ok(true)
    }

    /// Deletes the document. Missing files are not an error.
    pub fn remove(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    fn temp_path(&self) -> Result<PathBuf, StorageError> {
        let invalid = |message: &str| StorageError::InvalidPath {
            path: self.path.clone(),
            message: message.to_string(),
        };
        let parent = self
            .path
            .parent()
            .ok_or_else(|| invalid("path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| invalid("path has no file name"))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive lock on a `.lock` sibling, released on drop.
///
/// The lock file is left in place: unlinking it while another writer waits
/// on the old inode would let a third writer lock a fresh file concurrently.
struct FileLock {
    #[allow(dead_code)]
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, StorageError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StorageError::io(&lock_path, e))?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive().map_err(|e| StorageError::Lock {
                path: lock_path.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(FileLock { file })
    }
}
