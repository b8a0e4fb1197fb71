use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::assembler::assemble;
use crate::config::{self, DownloadConfig};
use crate::error::{DownloadError, FetchError, PartFailure};
use crate::fetcher::{MetadataProvider, RangeFetcher};
use crate::parts::{is_complete, PartStore};
use crate::planner::{compute_ranges, RangeSpec};
use crate::progress::{ProgressSink, ProgressTracker};
use crate::utils::{object_extension, object_file_name};

/// What happened to a single part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartOutcome {
    Fetched,
    AlreadyComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub file_size: u64,
    pub output_path: PathBuf,
    pub fetched_parts: usize,
    pub skipped_parts: usize,
}

/// Runs a partitioned download: plans the ranges, fetches them on a bounded
/// pool of tasks and assembles the result once every part is on disk.
pub struct Downloader {
    metadata: Arc<dyn MetadataProvider>,
    fetcher: Arc<dyn RangeFetcher>,
    sink: Arc<dyn ProgressSink>,
}

impl Downloader {
    pub fn new(
        metadata: Arc<dyn MetadataProvider>,
        fetcher: Arc<dyn RangeFetcher>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self { metadata, fetcher, sink }
    }

    pub async fn run(&self, config: &DownloadConfig, resume: bool) -> Result<DownloadReport, DownloadError> {
        config.validate()?;
        let file_name = object_file_name(&config.key)?;

        let store = PartStore::new(&config.output_dir, config.output_prefix.clone(), object_extension(&config.key));
        store.ensure_dir().await?;

        config::reconcile(config, resume).await?;

        let metadata = self
            .metadata
            .head_object(&config.bucket, &config.key)
            .await
            .map_err(DownloadError::Metadata)?;
        let file_size = metadata.content_length;
        let ranges = compute_ranges(file_size, config.num_parts);

        println!("File size: {} bytes", file_size);
        println!(
            "Downloading in {} parts, each part size: {} bytes",
            config.num_parts,
            file_size / config.num_parts
        );

        let tracker = ProgressTracker::new(self.sink.clone());
        self.sink.start(file_size);
        let outcomes = self.fetch_parts(config, &store, &ranges, &tracker).await;
        self.sink.finish();
        let progress = tracker.snapshot().await;
        debug!(
            bytes_completed = progress.bytes_completed,
            last_rate = ?progress.last_observed_rate,
            "all part tasks finished"
        );

        let mut failures = Vec::new();
        let mut fetched_parts = 0;
        let mut skipped_parts = 0;
        for (part_index, outcome) in outcomes {
            match outcome {
                Ok(PartOutcome::Fetched) => fetched_parts += 1,
                Ok(PartOutcome::AlreadyComplete) => skipped_parts += 1,
                Err(message) => failures.push(PartFailure { part_index, message }),
            }
        }
        if !failures.is_empty() {
            return Err(DownloadError::PartsFailed(failures));
        }

        let part_paths: Vec<PathBuf> = ranges.iter().map(|r| store.part_path(r.part_index)).collect();
        let output_path = config.output_dir.join(&file_name);
        println!("Concatenating {} parts into {}", part_paths.len(), output_path.display());
        assemble(&part_paths, &output_path).await?;
        println!("Concatenation complete. File saved as {}", output_path.display());

        info!(fetched_parts, skipped_parts, file_size, "download finished");
        Ok(DownloadReport {
            file_size,
            output_path,
            fetched_parts,
            skipped_parts,
        })
    }

    /// Dispatches one task per range and waits for all of them. A failing
    /// part does not stop its siblings.
    async fn fetch_parts(
        &self,
        config: &DownloadConfig,
        store: &PartStore,
        ranges: &[RangeSpec],
        tracker: &ProgressTracker,
    ) -> Vec<(usize, Result<PartOutcome, String>)> {
        // at most one permit per task, within tokio's limit
        let permits = config
            .num_threads
            .min(ranges.len().max(1) as u64)
            .min(Semaphore::MAX_PERMITS as u64) as usize;
        let semaphore = Arc::new(Semaphore::new(permits));
        let config = Arc::new(config.clone());
        let mut handles: Vec<(usize, JoinHandle<Result<PartOutcome, FetchError>>)> = Vec::with_capacity(ranges.len());

        for range in ranges.iter().copied() {
            let semaphore = semaphore.clone();
            let fetcher = self.fetcher.clone();
            let config = config.clone();
            let tracker = tracker.clone();
            let path = store.part_path(range.part_index);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                download_part(fetcher.as_ref(), &config, range, path, &tracker).await
            });
            handles.push((range.part_index, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (part_index, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(outcome)) => Ok(outcome),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("task aborted: {e}")),
            };
            if let Err(message) = &outcome {
                error!(part = part_index + 1, error = %message, "failed to download part");
            }
            outcomes.push((part_index, outcome));
        }
        outcomes
    }
}

async fn download_part(
    fetcher: &dyn RangeFetcher,
    config: &DownloadConfig,
    range: RangeSpec,
    path: PathBuf,
    tracker: &ProgressTracker,
) -> Result<PartOutcome, FetchError> {
    let Some(end) = range.end_byte() else {
        // empty range: nothing to request, but assembly expects an empty file
        File::create(&path).await?;
        return Ok(PartOutcome::AlreadyComplete);
    };

    if is_complete(&path, range.length).await {
        debug!(part = range.part_index + 1, bytes = range.length, "part already complete");
        tracker.record(range.length, None).await;
        return Ok(PartOutcome::AlreadyComplete);
    }

    debug!(part = range.part_index + 1, start = range.start_byte, end, "fetching part");
    let outcome = fetcher
        .fetch_range(&config.bucket, &config.key, &path, range.start_byte, end)
        .await?;
    tracker.record(outcome.bytes, Some(outcome.elapsed)).await;
    Ok(PartOutcome::Fetched)
}
