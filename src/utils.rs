use std::path::Path;

use crate::error::DownloadError;

/// File name the object is saved under: the last segment of its key.
pub fn object_file_name(key: &str) -> Result<String, DownloadError> {
    match key.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(name.to_string()),
        _ => Err(DownloadError::InvalidKey(key.to_string())),
    }
}

/// Extension of the object's file name, if any.
pub fn object_extension(key: &str) -> Option<String> {
    let name = object_file_name(key).ok()?;
    Path::new(&name)
        .extension()
        .map(|e| e.to_string_lossy().to_string())
}
