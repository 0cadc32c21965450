//! Recording pipeline.

mod latest_scan;
mod recorder;
mod stats;

pub use latest_scan::LatestScan;
pub use recorder::{is_connection_loss, InstanceOutput, Recorder, RecorderConfig};
pub use stats::RecordingStats;
