use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{header, Client, StatusCode};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_length: u64,
}

/// Bytes written by one range fetch and how long it took.
#[derive(Debug, Clone, Copy)]
pub struct FetchOutcome {
    pub bytes: u64,
    pub elapsed: Duration,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, FetchError>;
}

#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Downloads bytes `start..=end` of the object into `dest`, replacing
    /// whatever the file held before.
    async fn fetch_range(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        start: u64,
        end: u64,
    ) -> Result<FetchOutcome, FetchError>;
}

/// Anonymous S3 access over HTTPS.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    endpoint: Option<Url>,
}

impl S3Client {
    pub fn new(endpoint: Option<Url>, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .user_agent(concat!("s3pdl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    /// Virtual-hosted style on AWS, path style against a custom endpoint.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, FetchError> {
        let mut url = match &self.endpoint {
            Some(endpoint) => {
                let mut url = endpoint.clone();
                push_segments(&mut url, std::iter::once(bucket))?;
                url
            }
            None => Url::parse(&format!("https://{bucket}.s3.amazonaws.com/"))
                .map_err(|e| invalid_url(bucket, e))?,
        };
        push_segments(&mut url, key.split('/'))?;
        Ok(url)
    }
}

fn push_segments<'a>(url: &mut Url, segments: impl Iterator<Item = &'a str>) -> Result<(), FetchError> {
    let base = url.to_string();
    let mut path = url
        .path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(format!("endpoint {base} cannot carry a path")))?;
    path.pop_if_empty().extend(segments);
    Ok(())
}

fn invalid_url(bucket: &str, err: url::ParseError) -> FetchError {
    FetchError::InvalidUrl(format!("bucket {bucket:?}: {err}"))
}

/// Longest error body kept as a diagnostic.
const MAX_DIAGNOSTIC_LEN: usize = 512;

/// Only the first chunk of an error body is read.
async fn status_error(mut response: reqwest::Response) -> FetchError {
    let status = response.status().as_u16();
    let message = match response.chunk().await {
        Ok(Some(chunk)) if chunk.len() > MAX_DIAGNOSTIC_LEN => {
            format!("{}...", String::from_utf8_lossy(&chunk[..MAX_DIAGNOSTIC_LEN]))
        }
        Ok(Some(chunk)) => String::from_utf8_lossy(&chunk).into_owned(),
        _ => String::new(),
    };
    FetchError::Status { status, message }
}

#[async_trait]
impl MetadataProvider for S3Client {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, FetchError> {
        let url = self.object_url(bucket, key)?;
        let response = self.client.head(url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        // reqwest reports a body length of 0 for HEAD, so read the header itself
        let content_length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or(FetchError::MissingContentLength)?;
        Ok(ObjectMetadata { content_length })
    }
}

#[async_trait]
impl RangeFetcher for S3Client {
    async fn fetch_range(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        start: u64,
        end: u64,
    ) -> Result<FetchOutcome, FetchError> {
        let url = self.object_url(bucket, key)?;
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .header(header::RANGE, format!("bytes={}-{}", start, end))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() && status != StatusCode::PARTIAL_CONTENT {
            return Err(FetchError::RangeIgnored { status: status.as_u16() });
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let mut file = File::create(dest).await?;
        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let bytes = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        let expected = end - start + 1;
        if bytes < expected {
            return Err(FetchError::ShortBody { expected, received: bytes });
        }

        let elapsed = started.elapsed();
        debug!(start, end, bytes, ?elapsed, "range fetched");
        Ok(FetchOutcome { bytes, elapsed })
    }
}
