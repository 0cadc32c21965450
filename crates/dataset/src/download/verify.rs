//! Manifest validation and archive extraction
//!
//! Blocking; callers on the async runtime go through `spawn_blocking`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::manifest::Manifest;
use crate::error::{DatasetError, Result};

/// `name` joined onto `dir`, refusing names that could leave it
///
/// Only plain relative components are accepted: no root, drive prefix or `..`.
pub(super) fn dataset_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let mut has_normal = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => has_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DatasetError::validation(
                    name,
                    "path escapes the dataset directory",
                ));
            }
        }
    }
    if !has_normal {
        return Err(DatasetError::validation(name, "empty file path"));
    }
    Ok(dir.join(relative))
}

/// Hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(DatasetError::io(path))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(DatasetError::io(path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Check every manifest entry for presence, size and checksum
///
/// Stops at the first mismatch.
pub fn validate_dataset(dir: &Path, manifest: &Manifest) -> Result<()> {
    for (name, expected) in &manifest.files {
        let path = dataset_path(dir, name)?;
        let metadata = std::fs::metadata(&path)
            .map_err(|_| DatasetError::validation(name, "file not found in dataset directory"))?;

        if metadata.len() != expected.size {
            return Err(DatasetError::validation(
                name,
                format!(
                    "size mismatch: expected {}, got {}",
                    expected.size,
                    metadata.len()
                ),
            ));
        }

        let actual = sha256_file(&path)?;
        if !actual.eq_ignore_ascii_case(&expected.sha256) {
            return Err(DatasetError::validation(
                name,
                format!("sha256 mismatch: expected {}, got {actual}", expected.sha256),
            ));
        }
        debug!(file = %name, "file validated");
    }
    info!(files = manifest.len(), "dataset validated");
    Ok(())
}

/// Unpack every `.tar.gz` of the manifest into `dir`
pub fn extract_archives(dir: &Path, manifest: &Manifest) -> Result<usize> {
    let mut extracted = 0;
    for name in manifest.archives() {
        let path = dataset_path(dir, name)?;
        let file = File::open(&path).map_err(DatasetError::io(&path))?;
        let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
        archive.unpack(dir).map_err(DatasetError::io(&path))?;
        debug!(archive = %name, "archive extracted");
        extracted += 1;
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::manifest::ManifestEntry;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    // sha256("hello world")
    const HELLO_SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn manifest_for(name: &str, size: u64, sha: &str) -> Manifest {
        let mut manifest = Manifest::default();
        manifest.files.insert(
            name.to_string(),
            ManifestEntry {
                size,
                sha256: sha.to_string(),
            },
        );
        manifest
    }

    #[test]
    fn test_sha256_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "hello world").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), HELLO_SHA);
    }

    #[test]
    fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world").unwrap();
        let manifest = manifest_for("hello.txt", 11, HELLO_SHA);
        assert!(validate_dataset(dir.path(), &manifest).is_ok());
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest_for("gone.tar.gz", 11, HELLO_SHA);
        let err = validate_dataset(dir.path(), &manifest).unwrap_err();
        assert!(err.to_string().contains("gone.tar.gz"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_dataset_path_stays_inside_directory() {
        let dir = Path::new("/data/b2d");
        assert_eq!(
            dataset_path(dir, "sub/Scene_Town01.tar.gz").unwrap(),
            dir.join("sub/Scene_Town01.tar.gz")
        );
        for name in ["../outside.tar.gz", "sub/../../x", "/etc/passwd", "", "."] {
            let err = dataset_path(dir, name).unwrap_err();
            assert!(
                matches!(err, DatasetError::Validation { .. }),
                "{name:?} accepted: {err}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_escaping_manifest_key() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("dataset");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(root.path().join("hello.txt"), "hello world").unwrap();

        let manifest = manifest_for("../hello.txt", 11, HELLO_SHA);
        let err = validate_dataset(&dir, &manifest).unwrap_err();
        assert!(err.to_string().contains("escapes"), "got: {err}");
    }

    #[test]
    fn test_validate_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world!").unwrap();
        let manifest = manifest_for("hello.txt", 11, HELLO_SHA);
        let err = validate_dataset(dir.path(), &manifest).unwrap_err();
        assert!(err.to_string().contains("size mismatch"));
    }

    #[test]
    fn test_validate_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello_world").unwrap();
        let manifest = manifest_for("hello.txt", 11, HELLO_SHA);
        let err = validate_dataset(dir.path(), &manifest).unwrap_err();
        assert!(err.to_string().contains("sha256 mismatch"));
    }

    #[test]
    fn test_extract_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("Scene_Town01.tar.gz");
        {
            let encoder = GzEncoder::new(File::create(&archive_path).unwrap(), Compression::fast());
            let mut builder = tar::Builder::new(encoder);
            let data = b"{}";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "Scene_Town01/anno/00000.json", &data[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }
        let size = std::fs::metadata(&archive_path).unwrap().len();
        let sha = sha256_file(&archive_path).unwrap();
        let manifest = manifest_for("Scene_Town01.tar.gz", size, &sha);

        validate_dataset(dir.path(), &manifest).unwrap();
        assert_eq!(extract_archives(dir.path(), &manifest).unwrap(), 1);
        assert!(dir.path().join("Scene_Town01/anno/00000.json").is_file());
    }
}
