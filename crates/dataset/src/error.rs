//! Dataset error types

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Dataset specific error
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Filesystem error on a specific path
    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Annotation file is not valid gzip JSON
    #[error("annotation '{path}' is malformed: {source}")]
    Annotation {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No directory with an `anno/` folder
    #[error("no dataset instances with an anno/ directory under '{0}'")]
    NoInstances(PathBuf),

    /// Instance name without a `Town..` token
    #[error("cannot determine town from instance name '{0}'")]
    MissingTown(String),

    /// HTTP request failed
    #[error("request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Manifest JSON could not be decoded
    #[error("manifest is malformed: {0}")]
    Manifest(#[source] serde_json::Error),

    /// A downloaded file does not match the manifest
    #[error("dataset validation failed for '{file}': {message}")]
    Validation { file: String, message: String },

    /// Blocking worker panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DatasetError {
    /// Adapter for `map_err` on io results
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io { path, source }
    }

    pub fn validation(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, DatasetError>;
