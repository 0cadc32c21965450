//! Minimal Hugging Face Hub client: list a dataset repo and fetch files

use std::path::Path;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::error::{DatasetError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Entry of the repository tree listing
#[derive(Debug, Clone, Deserialize)]
pub struct RepoFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
}

impl RepoFile {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// Dataset repository access over HTTPS
#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HubClient {
    /// Endpoint from `HF_ENDPOINT`, or the public hub
    pub fn from_env() -> Result<Self> {
        let endpoint =
            std::env::var("HF_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint)
    }

    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .user_agent(concat!("phantom-lidar/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| DatasetError::Http {
                url: endpoint.clone(),
                source,
            })?;
        Ok(Self { http, endpoint })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn resolve_url(&self, repo_id: &str, path: &str) -> String {
        format!("{}/datasets/{repo_id}/resolve/main/{path}", self.endpoint)
    }

    /// All files of a dataset repo, following pagination
    #[instrument(name = "hub_list_files", skip(self))]
    pub async fn list_files(&self, repo_id: &str) -> Result<Vec<RepoFile>> {
        let mut url = Some(format!(
            "{}/api/datasets/{repo_id}/tree/main?recursive=true",
            self.endpoint
        ));
        let mut files = Vec::new();

        while let Some(current) = url.take() {
            let response = self.get(&current).await?;
            url = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);
            let page: Vec<RepoFile> = response.json().await.map_err(|source| {
                DatasetError::Http {
                    url: current.clone(),
                    source,
                }
            })?;
            debug!(entries = page.len(), "listed page");
            files.extend(page.into_iter().filter(RepoFile::is_file));
        }
        Ok(files)
    }

    /// Whole body of a small document
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|source| DatasetError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    /// Stream a file to `dest` through a `.part` sibling
    ///
    /// `on_chunk` receives the size of every chunk written.
    pub async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        mut on_chunk: impl FnMut(u64),
    ) -> Result<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(DatasetError::io(parent))?;
        }
        let part = dest.with_extension("part");
        let mut response = self.get(url).await?;
        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(DatasetError::io(&part))?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|source| DatasetError::Http {
            url: url.to_string(),
            source,
        })? {
            file.write_all(&chunk).await.map_err(DatasetError::io(&part))?;
            written += chunk.len() as u64;
            on_chunk(chunk.len() as u64);
        }
        file.flush().await.map_err(DatasetError::io(&part))?;
        drop(file);

        tokio::fs::rename(&part, dest)
            .await
            .map_err(DatasetError::io(dest))?;
        Ok(written)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut request = self.http.get(url);
        if let Ok(token) = std::env::var("HF_TOKEN") {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| DatasetError::Http {
                url: url.to_string(),
                source,
            })
    }
}

/// URL of the `rel="next"` entry of a `Link` header
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        if !params.split(';').any(|p| p.trim() == r#"rel="next""#) {
            return None;
        }
        let target = target.trim();
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_link() {
        let header = r#"<https://huggingface.co/api/datasets/a/b/tree/main?cursor=xyz>; rel="next""#;
        assert_eq!(
            next_link(header).as_deref(),
            Some("https://huggingface.co/api/datasets/a/b/tree/main?cursor=xyz")
        );
        let mixed = r#"<https://x/prev>; rel="prev", <https://x/next>; rel="next""#;
        assert_eq!(next_link(mixed).as_deref(), Some("https://x/next"));
        assert_eq!(next_link(r#"<https://x/prev>; rel="prev""#), None);
        assert_eq!(next_link(""), None);
    }

    #[test]
    fn test_resolve_url() {
        let hub = HubClient::new("https://hf-mirror.com/").unwrap();
        assert_eq!(
            hub.resolve_url("rethinklab/Bench2Drive", "a/b.tar.gz"),
            "https://hf-mirror.com/datasets/rethinklab/Bench2Drive/resolve/main/a/b.tar.gz"
        );
    }

    #[test]
    fn test_tree_entry_decoding() {
        let json = r#"[
            {"type": "directory", "oid": "1", "size": 0, "path": "v1"},
            {"type": "file", "oid": "2", "size": 42, "path": "v1/x.tar.gz",
             "lfs": {"oid": "abc", "size": 42, "pointerSize": 130}}
        ]"#;
        let entries: Vec<RepoFile> = serde_json::from_str(json).unwrap();
        let files: Vec<_> = entries.into_iter().filter(RepoFile::is_file).collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 42);
    }
}
