use std::path::{Path, PathBuf};
use tokio::fs;

/// Fixed name of the working subdirectory holding part files.
pub const WORK_DIR_NAME: &str = "temp_dir";

/// Locates part files for one download.
#[derive(Debug, Clone)]
pub struct PartStore {
    dir: PathBuf,
    prefix: String,
    extension: Option<String>,
}

impl PartStore {
    pub fn new(output_dir: &Path, prefix: impl Into<String>, extension: Option<String>) -> Self {
        Self {
            dir: output_dir.join(WORK_DIR_NAME),
            prefix: prefix.into(),
            extension,
        }
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Path of part `part_index` (0-based); file names count from 1.
    pub fn part_path(&self, part_index: usize) -> PathBuf {
        let stem = format!("{}_part{}", self.prefix, part_index + 1);
        match &self.extension {
            Some(ext) => self.dir.join(format!("{stem}.{ext}")),
            None => self.dir.join(stem),
        }
    }
}

/// A part is complete when its file exists and holds at least
/// `expected_len` bytes. Only the size is checked, never the content.
pub async fn is_complete(path: &Path, expected_len: u64) -> bool {
    match fs::metadata(path).await {
        Ok(metadata) => metadata.is_file() && metadata.len() >= expected_len,
        Err(_) => false,
    }
}
