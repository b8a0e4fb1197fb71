//! Error types for partitioned downloads

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single transfer against the object store.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("server answered {status} instead of 206 Partial Content")]
    RangeIgnored { status: u16 },

    #[error("invalid object URL: {0}")]
    InvalidUrl(String),

    #[error("response is missing Content-Length")]
    MissingContentLength,

    #[error("short body: expected {expected} bytes, received {received}")]
    ShortBody { expected: u64, received: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One part that could not be downloaded.
#[derive(Debug, Clone)]
pub struct PartFailure {
    pub part_index: usize,
    pub message: String,
}

impl fmt::Display for PartFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part {}: {}", self.part_index + 1, self.message)
    }
}

/// A persisted field that disagrees with the requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: &'static str,
    pub persisted: String,
    pub requested: String,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("object key {0:?} has no file name component")]
    InvalidKey(String),

    #[error("the provided arguments do not match the saved configuration ({})", describe_mismatches(.0))]
    ConfigMismatch(Vec<FieldMismatch>),

    #[error("cannot use saved configuration {path:?}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("error getting object metadata: {0}")]
    Metadata(#[source] FetchError),

    #[error("failed to download {} part(s): {}; re-run with --resume to retry them", .0.len(), describe_failures(.0))]
    PartsFailed(Vec<PartFailure>),

    #[error("cannot assemble {path:?}: {source}")]
    Assembly {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_mismatches(mismatches: &[FieldMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| format!("{}: saved {}, given {}", m.field, m.persisted, m.requested))
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_failures(failures: &[PartFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_failed_names_one_based_parts() {
        let err = DownloadError::PartsFailed(vec![
            PartFailure { part_index: 1, message: "boom".into() },
            PartFailure { part_index: 3, message: "timed out".into() },
        ]);
        let text = err.to_string();
        assert!(text.contains("2 part(s)"));
        assert!(text.contains("part 2: boom"));
        assert!(text.contains("part 4: timed out"));
        assert!(text.contains("--resume"));
    }

    #[test]
    fn mismatch_lists_each_field() {
        let err = DownloadError::ConfigMismatch(vec![FieldMismatch {
            field: "num_parts",
            persisted: "10".into(),
            requested: "12".into(),
        }]);
        assert!(err.to_string().contains("num_parts: saved 10, given 12"));
    }
}
