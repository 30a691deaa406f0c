use std::fmt;

/// Errors raised by a [`Storage`](super::Storage) backend.
#[derive(Debug)]
pub enum StorageError {
    /// Nothing is stored at the given path.
    NotFound(String),
    /// An IO error occurred while accessing the backend.
    Io(std::io::Error),
    /// The path is invalid (empty or contains `..`).
    InvalidPath(String),
    /// The backend does not support write operations.
    ReadOnly,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(path) => write!(f, "not found: {path}"),
            StorageError::Io(err) => write!(f, "IO error: {err}"),
            StorageError::InvalidPath(reason) => write!(f, "invalid path: {reason}"),
            StorageError::ReadOnly => write!(f, "storage is read-only"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(err.to_string())
        } else {
            StorageError::Io(err)
        }
    }
}
