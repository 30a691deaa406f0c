use super::StorageError;

/// Normalize a storage path.
///
/// Backslashes become forward slashes, empty and `.` segments are dropped,
/// and leading/trailing slashes are stripped. Empty paths and `..` segments
/// are rejected.
pub fn normalize(path: &str) -> Result<String, StorageError> {
    let replaced = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::InvalidPath(format!(
                    "'{path}' escapes the storage root"
                )))
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Err(StorageError::InvalidPath("empty path".into()));
    }

    Ok(segments.join("/"))
}
