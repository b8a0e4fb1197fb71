use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::config::DownloadConfig;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Download a large file from S3 in multiple parts and concatenate them.",
    long_about = None
)]
pub struct Args {
    /// The name of the S3 bucket
    #[arg(long)]
    pub bucket: String,

    /// The path to the file in the S3 bucket
    #[arg(long)]
    pub key: String,

    /// Directory to save downloaded parts and the final file
    #[arg(long = "output-dir", default_value = "./downloaded_parts")]
    pub output_dir: PathBuf,

    /// Prefix for part file names
    #[arg(long = "output-prefix", default_value = "output")]
    pub output_prefix: String,

    /// Number of parts to split the file into
    #[arg(long = "num-parts", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub num_parts: u64,

    /// Number of parts downloaded concurrently
    #[arg(long = "num-threads", default_value_t = 4, value_parser = clap::value_parser!(u64).range(1..))]
    pub num_threads: u64,

    /// Resume the download if a previous configuration exists
    #[arg(long)]
    pub resume: bool,

    /// S3-compatible endpoint to use instead of AWS (path-style addressing)
    #[arg(long, env = "S3PDL_ENDPOINT")]
    pub endpoint: Option<Url>,

    /// Timeout in seconds for each range request
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Args {
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            output_dir: self.output_dir.clone(),
            output_prefix: self.output_prefix.clone(),
            num_parts: self.num_parts,
            num_threads: self.num_threads,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}
