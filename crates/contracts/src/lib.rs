//! # Contracts
//!
//! Shared data model for the phantom LiDAR workspace. Every other crate
//! depends on this one; it depends on none of them.
//!
//! ## Coordinate model
//! - CARLA world frame, metres for locations, degrees for rotations
//! - A frame is one simulation tick, and one dataset annotation file

mod annotation;
mod catalog;
mod error;
mod geometry;
mod lidar;
mod runtime;
mod sensor_source;
mod settings;
mod spawn;

pub use annotation::*;
pub use catalog::*;
pub use error::*;
pub use geometry::*;
pub use lidar::*;
pub use runtime::*;
pub use sensor_source::{LidarCallback, SensorSource};
pub use settings::*;
pub use spawn::*;
