//! Gzip JSON annotation files

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use contracts::FrameAnnotation;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{DatasetError, Result};

/// `NNNNN.json.gz` for a frame index
pub fn frame_file_name(index: usize) -> String {
    format!("{index:05}.json.gz")
}

/// Read one `.json.gz` annotation
pub fn read_annotation(path: &Path) -> Result<FrameAnnotation> {
    let file = File::open(path).map_err(DatasetError::io(path))?;
    let reader = BufReader::new(GzDecoder::new(BufReader::new(file)));
    serde_json::from_reader(reader).map_err(|source| DatasetError::Annotation {
        path: path.to_path_buf(),
        source,
    })
}

/// Write one `.json.gz` annotation, replacing any existing file
pub fn write_annotation(path: &Path, annotation: &FrameAnnotation) -> Result<()> {
    let file = File::create(path).map_err(DatasetError::io(path))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, annotation).map_err(|source| {
        DatasetError::Annotation {
            path: path.to_path_buf(),
            source,
        }
    })?;
    encoder
        .finish()
        .and_then(|mut w| std::io::Write::flush(&mut w))
        .map_err(DatasetError::io(path))
}
