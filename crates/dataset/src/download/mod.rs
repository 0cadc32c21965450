//! Bench2Drive download, validation and extraction

mod hub;
mod manifest;
mod size;
mod verify;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, instrument, warn};

pub use hub::{next_link, HubClient, RepoFile, DEFAULT_ENDPOINT};
pub use manifest::{Manifest, ManifestEntry};
pub use size::{DatasetSize, MINI_FILES};
pub use verify::{extract_archives, sha256_file, validate_dataset};

use crate::error::{DatasetError, Result};

/// Outcome of a download run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub target_dir: PathBuf,
    pub downloaded: usize,
    pub skipped: usize,
    pub extracted: usize,
}

/// `<dir>-<size>`, e.g. `data/Bench2Drive-mini`
pub fn target_dir(dir: &Path, size: DatasetSize) -> PathBuf {
    let mut name = dir.as_os_str().to_os_string();
    name.push(format!("-{size}"));
    PathBuf::from(name)
}

/// Fetches one dataset size into a local directory
#[derive(Debug, Clone)]
pub struct Downloader {
    hub: HubClient,
    show_progress: bool,
}

impl Downloader {
    pub fn new(hub: HubClient) -> Self {
        Self {
            hub,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Download, validate against the manifest, then extract
    ///
    /// Nothing is extracted unless every manifest entry validates.
    #[instrument(name = "dataset_download", skip(self), fields(size = %size))]
    pub async fn run(&self, size: DatasetSize, dir: &Path) -> Result<DownloadSummary> {
        let target = target_dir(dir, size);
        tokio::fs::create_dir_all(&target)
            .await
            .map_err(DatasetError::io(&target))?;

        let repo_id = size.repo_id();
        let files: Vec<RepoFile> = self
            .hub
            .list_files(repo_id)
            .await?
            .into_iter()
            .filter(|f| size.includes(&f.path))
            .collect();
        info!(repo = repo_id, files = files.len(), target = %target.display(), "starting download");

        let mut summary = DownloadSummary {
            target_dir: target.clone(),
            ..Default::default()
        };

        let total: u64 = files.iter().map(|f| f.size).sum();
        let bar = self.progress_bar(total);
        for file in &files {
            let dest = verify::dataset_path(&target, &file.path)?;
            if is_complete(&dest, file.size).await {
                bar.inc(file.size);
                summary.skipped += 1;
                continue;
            }
            bar.set_message(file.path.clone());
            let url = self.hub.resolve_url(repo_id, &file.path);
            self.hub
                .download_to(&url, &dest, |n| bar.inc(n))
                .await?;
            summary.downloaded += 1;
        }
        bar.finish_and_clear();

        let manifest_bytes = self.hub.fetch_bytes(&size.manifest_url()).await?;
        let manifest_path = target.join(size.manifest_file_name());
        tokio::fs::write(&manifest_path, &manifest_bytes)
            .await
            .map_err(DatasetError::io(&manifest_path))?;
        let manifest = Manifest::from_slice(&manifest_bytes)?;

        let dir = target.clone();
        summary.extracted = tokio::task::spawn_blocking(move || -> Result<usize> {
            validate_dataset(&dir, &manifest)?;
            extract_archives(&dir, &manifest)
        })
        .await??;

        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            extracted = summary.extracted,
            "dataset ready"
        );
        Ok(summary)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar
    }
}

/// A previously downloaded file with the listed size is not fetched again
async fn is_complete(path: &Path, expected: u64) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() == expected => true,
        Ok(meta) => {
            warn!(file = %path.display(), have = meta.len(), expected, "partial file, downloading again");
            false
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dir() {
        assert_eq!(
            target_dir(Path::new("data/Bench2Drive"), DatasetSize::Mini),
            PathBuf::from("data/Bench2Drive-mini")
        );
        assert_eq!(
            target_dir(Path::new("/tmp/b2d"), DatasetSize::Full),
            PathBuf::from("/tmp/b2d-full")
        );
    }

    #[tokio::test]
    async fn test_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        assert!(!is_complete(&path, 3).await);
        std::fs::write(&path, b"abc").unwrap();
        assert!(is_complete(&path, 3).await);
        assert!(!is_complete(&path, 4).await);
    }
}
