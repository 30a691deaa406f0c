//! Byte storage backends for save documents.
//!
//! A save or load touches storage exactly once: the whole document is read or
//! written in one call, so backends never hold an open stream between calls.
//!
//! - [`MemoryStorage`]: in-memory storage for tests and tools (read-write)
//! - [`FileSystemStorage`]: a rooted directory on disk (read-write)
//!
//! Paths handed to a backend are normalized with [`path::normalize`] first.

mod error;
mod filesystem;
mod memory;
pub mod path;

pub use error::StorageError;
pub use filesystem::FileSystemStorage;
pub use memory::MemoryStorage;

/// Trait for save storage backends.
///
/// Read operations are required. Write operations default to
/// [`StorageError::ReadOnly`]; writable backends override them and return
/// `false` from [`is_read_only`](Storage::is_read_only).
pub trait Storage: Send + Sync + 'static {
    /// Read the entire contents stored at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Check whether anything is stored at `path`.
    fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// List the immediate children of a directory, sorted by name.
    ///
    /// Returns an empty vec for directories that do not exist.
    fn list_dir(&self, path: &str) -> Result<Vec<String>, StorageError>;

    fn is_read_only(&self) -> bool {
        true
    }

    /// Write `data` to `path`, replacing anything stored there.
    fn write(&self, _path: &str, _data: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }

    fn delete(&self, _path: &str) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }
}
