//! LiDAR sensor configuration and captured scans.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::{Location, Transform};

/// CARLA blueprint of the ray-cast LiDAR
pub const LIDAR_BLUEPRINT: &str = "sensor.lidar.ray_cast";

/// LiDAR sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarConfig {
    #[serde(default = "default_channels")]
    pub channels: u32,

    #[serde(default = "default_points_per_second")]
    pub points_per_second: u32,

    /// Rotation frequency (Hz)
    #[serde(default = "default_rotation_frequency")]
    pub rotation_frequency: u32,

    /// Maximum range (metres)
    #[serde(default = "default_range")]
    pub range: f64,

    /// Upper field of view (degrees)
    #[serde(default = "default_upper_fov")]
    pub upper_fov: f64,

    /// Lower field of view (degrees)
    #[serde(default = "default_lower_fov")]
    pub lower_fov: f64,

    /// Mount height above the ego origin (metres)
    #[serde(default = "default_mount_height")]
    pub mount_height: f64,
}

fn default_channels() -> u32 {
    64
}

fn default_points_per_second() -> u32 {
    2_240_000
}

fn default_rotation_frequency() -> u32 {
    20
}

fn default_range() -> f64 {
    100.0
}

fn default_upper_fov() -> f64 {
    10.0
}

fn default_lower_fov() -> f64 {
    -30.0
}

fn default_mount_height() -> f64 {
    2.0
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            points_per_second: default_points_per_second(),
            rotation_frequency: default_rotation_frequency(),
            range: default_range(),
            upper_fov: default_upper_fov(),
            lower_fov: default_lower_fov(),
            mount_height: default_mount_height(),
        }
    }
}

impl LidarConfig {
    /// Blueprint attributes understood by `sensor.lidar.ray_cast`
    pub fn attributes(&self) -> HashMap<String, String> {
        HashMap::from([
            ("channels".to_string(), self.channels.to_string()),
            (
                "points_per_second".to_string(),
                self.points_per_second.to_string(),
            ),
            (
                "rotation_frequency".to_string(),
                self.rotation_frequency.to_string(),
            ),
            ("range".to_string(), self.range.to_string()),
            ("upper_fov".to_string(), self.upper_fov.to_string()),
            ("lower_fov".to_string(), self.lower_fov.to_string()),
        ])
    }

    /// Mount pose relative to the ego vehicle
    pub fn mount_transform(&self) -> Transform {
        Transform::at(Location::new(0.0, 0.0, self.mount_height))
    }
}

/// One LiDAR return; matches CARLA's `LidarDetection` layout
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct LidarPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

/// Bytes per point in the raw sensor buffer
pub const LIDAR_POINT_STRIDE: usize = std::mem::size_of::<LidarPoint>();

/// A full LiDAR sweep captured on one simulation frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarScan {
    /// Simulation frame number reported by the server
    pub frame: u64,

    /// Simulation timestamp (seconds)
    pub timestamp: f64,

    pub points: Vec<LidarPoint>,
}

impl LidarScan {
    /// Decode a raw `x, y, z, intensity` f32 buffer
    ///
    /// Returns `None` when the buffer is not a whole number of points.
    pub fn from_raw(frame: u64, timestamp: f64, raw: &[u8]) -> Option<Self> {
        if raw.len() % LIDAR_POINT_STRIDE != 0 {
            return None;
        }
        let points = raw
            .chunks_exact(LIDAR_POINT_STRIDE)
            .map(bytemuck::pod_read_unaligned::<LidarPoint>)
            .collect();
        Some(Self {
            frame,
            timestamp,
            points,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
