use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::DownloadError;

/// Writes the parts, in order, into `dest` (truncating it first).
/// Returns the number of bytes written.
pub async fn assemble(part_paths: &[PathBuf], dest: &Path) -> Result<u64, DownloadError> {
    let mut output = File::create(dest).await.map_err(assembly_err(dest))?;
    let mut total = 0;

    for part in part_paths {
        let mut input = File::open(part).await.map_err(assembly_err(part))?;
        let copied = tokio::io::copy(&mut input, &mut output)
            .await
            .map_err(assembly_err(part))?;
        debug!(part = %part.display(), bytes = copied, "appended part");
        total += copied;
    }

    output.flush().await.map_err(assembly_err(dest))?;
    Ok(total)
}

fn assembly_err(path: &Path) -> impl FnOnce(std::io::Error) -> DownloadError {
    let path = path.to_path_buf();
    move |source| DownloadError::Assembly { path, source }
}
