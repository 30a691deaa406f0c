use std::path::PathBuf;

use super::{Storage, StorageError};

/// Storage rooted at a directory on disk.
///
/// All I/O is blocking `std::fs`. Each call opens, fully reads or writes,
/// and closes the file before returning.
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    /// Create a backend rooted at `root`.
    ///
    /// The directory does not need to exist yet; it is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl Storage for FileSystemStorage {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        Ok(std::fs::read(self.resolve(path))?)
    }

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.resolve(path).is_file())
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, StorageError> {
        let full_path = self.resolve(path);
        if !full_path.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(full_path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_owned());
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full_path, data)?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        std::fs::remove_file(self.resolve(path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());

        storage.write("saves/slot1/game.ron", b"(x: 1)").unwrap();
        assert!(storage.exists("saves/slot1/game.ron").unwrap());
        assert_eq!(storage.read("saves/slot1/game.ron").unwrap(), b"(x: 1)");
        assert_eq!(storage.list_dir("saves").unwrap(), vec!["slot1"]);
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        assert!(matches!(storage.read("absent.ron"), Err(StorageError::NotFound(_))));
        assert!(!storage.exists("absent.ron").unwrap());
        assert!(storage.list_dir("absent").unwrap().is_empty());
    }

    #[test]
    fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        storage.write("a.bin", &[1, 2, 3]).unwrap();
        storage.delete("a.bin").unwrap();
        assert!(!storage.exists("a.bin").unwrap());
    }
}
