//! RecorderSettings - Config Loader output
//!
//! Everything a recording run needs besides the dataset and output paths:
//! server endpoint, LiDAR sensor, phantom spawner, loop limits.

use serde::{Deserialize, Serialize};

use crate::{LidarConfig, SpawnConfig};

/// Complete recorder settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecorderSettings {
    #[serde(default)]
    pub carla: CarlaEndpoint,

    #[serde(default)]
    pub lidar: LidarConfig,

    #[serde(default)]
    pub spawn: SpawnConfig,

    #[serde(default)]
    pub recording: RecordingOptions,
}

/// CARLA server address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarlaEndpoint {
    #[serde(default = "default_carla_host")]
    pub host: String,

    #[serde(default = "default_carla_port")]
    pub port: u16,

    /// Client timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

fn default_carla_host() -> String {
    "127.0.0.1".to_string()
}

fn default_carla_port() -> u16 {
    2000
}

fn default_timeout_secs() -> f64 {
    200.0
}

impl Default for CarlaEndpoint {
    fn default() -> Self {
        Self {
            host: default_carla_host(),
            port: default_carla_port(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Loop limits and reproducibility knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingOptions {
    /// Stop after this many frames in total (None = every frame of every instance)
    #[serde(default)]
    pub max_frames: Option<u64>,

    /// Seed for the phantom spawner RNG (None = entropy)
    #[serde(default)]
    pub seed: Option<u64>,

    /// How long to wait for the LiDAR sweep after a tick (milliseconds)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_settle_ms() -> u64 {
    50
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            max_frames: None,
            seed: None,
            settle_ms: default_settle_ms(),
        }
    }
}
