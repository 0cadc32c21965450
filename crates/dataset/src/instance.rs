//! Dataset instance discovery
//!
//! An instance is a scenario directory containing `anno/NNNNN.json.gz`,
//! named like `Accident_Town03_Route156_Weather0`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DatasetError, Result};

/// Annotation folder inside an instance
pub const ANNO_DIR: &str = "anno";

/// Town token of an instance name: the first `_`-separated part starting with "Town"
pub fn town_from_name(name: &str) -> Option<&str> {
    name.split('_').find(|part| part.starts_with("Town"))
}

/// One recorded scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInstance {
    pub name: String,
    pub path: PathBuf,
}

impl DatasetInstance {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "instance".to_string());
        Self { name, path }
    }

    pub fn anno_dir(&self) -> PathBuf {
        self.path.join(ANNO_DIR)
    }

    /// Map to load for this instance
    pub fn town(&self) -> Result<&str> {
        town_from_name(&self.name).ok_or_else(|| DatasetError::MissingTown(self.name.clone()))
    }

    /// Sorted `anno/*.json.gz` files
    pub fn annotation_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.anno_dir();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(DatasetError::io(&dir))? {
            let path = entry.map_err(DatasetError::io(&dir))?.path();
            let is_annotation = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".json.gz"));
            if is_annotation && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn has_anno_dir(path: &Path) -> bool {
    path.join(ANNO_DIR).is_dir()
}

/// Find instances under `root`
///
/// `root` itself when it has an `anno/` folder, otherwise every sorted
/// subdirectory that has one.
pub fn discover_instances(root: &Path) -> Result<Vec<DatasetInstance>> {
    if has_anno_dir(root) {
        return Ok(vec![DatasetInstance::from_path(root)]);
    }

    let entries = std::fs::read_dir(root).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DatasetError::NoInstances(root.to_path_buf())
        } else {
            DatasetError::Io {
                path: root.to_path_buf(),
                source,
            }
        }
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry.map_err(DatasetError::io(root))?.path();
        if path.is_dir() && has_anno_dir(&path) {
            dirs.push(path);
        }
    }
    dirs.sort();

    if dirs.is_empty() {
        return Err(DatasetError::NoInstances(root.to_path_buf()));
    }
    debug!(root = %root.display(), count = dirs.len(), "dataset instances discovered");
    Ok(dirs.into_iter().map(DatasetInstance::from_path).collect())
}
