//! Bench2Drive dataset access
//!
//! Discovers recorded instances, reads and writes their gzip JSON
//! annotations, and downloads published dataset sizes.

pub mod annotation_io;
pub mod download;
pub mod error;
pub mod instance;

pub use annotation_io::{frame_file_name, read_annotation, write_annotation};
pub use download::{target_dir, DatasetSize, DownloadSummary, Downloader, HubClient, Manifest};
pub use error::{DatasetError, Result};
pub use instance::{discover_instances, town_from_name, DatasetInstance, ANNO_DIR};
