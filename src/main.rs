mod assembler;
mod cli;
mod config;
mod downloader;
mod error;
mod fetcher;
mod parts;
mod planner;
mod progress;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::downloader::Downloader;
use crate::fetcher::S3Client;
use crate::progress::BarSink;

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = args.download_config();
    let client = Arc::new(
        S3Client::new(args.endpoint.clone(), args.request_timeout()).context("Failed to build HTTP client")?,
    );
    let downloader = Downloader::new(client.clone(), client, Arc::new(BarSink::new()));

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async { downloader.run(&config, args.resume).await })?;

    println!(
        "Download and concatenation complete. {} bytes saved to {} ({} parts fetched, {} already on disk).",
        report.file_size,
        report.output_path.display(),
        report.fetched_parts,
        report.skipped_parts
    );
    Ok(())
}
