//! # Phantom LiDAR CLI
//!
//! Library half of the `phantom-lidar` binary: the recording pipeline,
//! shared with the end-to-end tests.

pub mod pipeline;
