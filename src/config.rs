use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{DownloadError, FieldMismatch};

/// Name of the persisted configuration inside the output directory.
pub const CONFIG_FILE_NAME: &str = "download_config.json";

/// Parameters of one partitioned download. Once persisted for an output
/// directory, a resumed run must agree with every field but `output_dir`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    pub bucket: String,
    pub key: String,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub num_parts: u64,
    pub num_threads: u64,
}

impl DownloadConfig {
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.num_parts == 0 {
            return Err(DownloadError::InvalidConfig("num_parts must be at least 1".into()));
        }
        if self.num_threads == 0 {
            return Err(DownloadError::InvalidConfig("num_threads must be at least 1".into()));
        }
        if self.bucket.is_empty() {
            return Err(DownloadError::InvalidConfig("bucket must not be empty".into()));
        }
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.output_dir.join(CONFIG_FILE_NAME)
    }

    /// Fields of `self` (persisted) that differ from `requested`.
    /// `output_dir` is implied by where the config was found.
    pub fn mismatches(&self, requested: &DownloadConfig) -> Vec<FieldMismatch> {
        let mut out = Vec::new();
        let mut check = |field: &'static str, persisted: String, requested: String| {
            if persisted != requested {
                out.push(FieldMismatch { field, persisted, requested });
            }
        };
        check("bucket", self.bucket.clone(), requested.bucket.clone());
        check("key", self.key.clone(), requested.key.clone());
        check("output_prefix", self.output_prefix.clone(), requested.output_prefix.clone());
        check("num_parts", self.num_parts.to_string(), requested.num_parts.to_string());
        check("num_threads", self.num_threads.to_string(), requested.num_threads.to_string());
        out
    }

    pub async fn save(&self) -> Result<(), DownloadError> {
        let path = self.config_path();
        let content = serde_json::to_string_pretty(self)
            .map_err(|source| DownloadError::ConfigFile { path: path.clone(), source })?;
        fs::write(&path, content).await?;
        debug!(path = %path.display(), "saved download configuration");
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, DownloadError> {
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|source| DownloadError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Applies the resume contract: persist `config` on a fresh start (or when
/// nothing was saved yet), otherwise require the saved config to match.
pub async fn reconcile(config: &DownloadConfig, resume: bool) -> Result<(), DownloadError> {
    let path = config.config_path();
    if !resume || !fs::try_exists(&path).await? {
        return config.save().await;
    }

    let saved = DownloadConfig::load(&path).await?;
    let mismatches = saved.mismatches(config);
    if !mismatches.is_empty() {
        return Err(DownloadError::ConfigMismatch(mismatches));
    }
    info!(path = %path.display(), "resuming with saved configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(dir: &Path) -> DownloadConfig {
        DownloadConfig {
            bucket: "gtgseq".into(),
            key: "ont-r10-dna/reads.blow5".into(),
            output_dir: dir.to_path_buf(),
            output_prefix: "output".into(),
            num_parts: 10,
            num_threads: 4,
        }
    }

    #[test]
    fn mismatches_ignore_output_dir() {
        let saved = sample(Path::new("/data/a"));
        let requested = sample(Path::new("/data/b"));
        assert!(saved.mismatches(&requested).is_empty());
    }

    #[test]
    fn mismatches_report_parts_and_threads() {
        let saved = sample(Path::new("/data"));
        let mut requested = saved.clone();
        requested.num_parts = 12;
        requested.num_threads = 8;

        let fields: Vec<_> = saved.mismatches(&requested).iter().map(|m| m.field).collect();
        assert_eq!(fields, vec!["num_parts", "num_threads"]);
    }

    #[test]
    fn zero_parts_is_rejected() {
        let mut config = sample(Path::new("/data"));
        config.num_parts = 0;
        assert!(matches!(config.validate(), Err(DownloadError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn fresh_start_persists_config() {
        let dir = tempdir().unwrap();
        let config = sample(dir.path());

        reconcile(&config, false).await.unwrap();

        let saved = DownloadConfig::load(&config.config_path()).await.unwrap();
        assert_eq!(saved, config);
        let raw = std::fs::read_to_string(config.config_path()).unwrap();
        assert!(raw.contains("\"num_threads\": 4"));
    }

    #[tokio::test]
    async fn resume_without_saved_config_persists_it() {
        let dir = tempdir().unwrap();
        let config = sample(dir.path());

        reconcile(&config, true).await.unwrap();

        assert!(config.config_path().exists());
    }

    #[tokio::test]
    async fn resume_with_changed_key_fails() {
        let dir = tempdir().unwrap();
        let config = sample(dir.path());
        reconcile(&config, false).await.unwrap();

        let mut changed = config.clone();
        changed.key = "other.blow5".into();
        let err = reconcile(&changed, true).await.unwrap_err();

        match err {
            DownloadError::ConfigMismatch(m) => assert_eq!(m[0].field, "key"),
            other => panic!("unexpected error: {other}"),
        }
        // the saved config is left untouched
        let saved = DownloadConfig::load(&config.config_path()).await.unwrap();
        assert_eq!(saved.key, config.key);
    }

    #[tokio::test]
    async fn fresh_start_overwrites_saved_config() {
        let dir = tempdir().unwrap();
        let config = sample(dir.path());
        reconcile(&config, false).await.unwrap();

        let mut changed = config.clone();
        changed.num_parts = 3;
        reconcile(&changed, false).await.unwrap();

        let saved = DownloadConfig::load(&config.config_path()).await.unwrap();
        assert_eq!(saved.num_parts, 3);
    }

    #[tokio::test]
    async fn corrupt_saved_config_is_an_error_on_resume() {
        let dir = tempdir().unwrap();
        let config = sample(dir.path());
        std::fs::write(config.config_path(), "{ not json").unwrap();

        let err = reconcile(&config, true).await.unwrap_err();
        assert!(matches!(err, DownloadError::ConfigFile { .. }));
    }
}
