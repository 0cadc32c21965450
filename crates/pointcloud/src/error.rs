//! Point-cloud error types

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// LAS/LAZ decoding or encoding failed
    #[error("point cloud '{path}' could not be processed: {source}")]
    Las {
        path: PathBuf,
        #[source]
        source: las::Error,
    },

    #[error("input '{0}' must be a .laz or .las file")]
    UnsupportedInput(PathBuf),

    #[error("input '{0}' not found")]
    NotFound(PathBuf),

    #[error("no .laz files in '{0}'")]
    NoFiles(PathBuf),
}

impl ConvertError {
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io { path, source }
    }

    pub fn las(path: &Path) -> impl FnOnce(las::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Las { path, source }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
