//! Runtime actor handles

use serde::{Deserialize, Serialize};

use crate::Vector3;

/// CARLA actor handle type
pub type ActorId = u32;

/// Handle returned by a successful spawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnedActor {
    /// Simulation actor handle
    pub id: ActorId,

    /// Half-size of the actor's bounding box (metres)
    pub extent: Vector3,
}

/// Synchronous-mode world settings applied while recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    pub synchronous_mode: bool,
    pub fixed_delta_seconds: Option<f64>,
}

impl WorldSettings {
    /// 20 FPS lock-step, the rate the dataset was recorded at
    pub const fn recording() -> Self {
        Self {
            synchronous_mode: true,
            fixed_delta_seconds: Some(0.05),
        }
    }

    /// Back to the server's free-running defaults
    pub const fn asynchronous() -> Self {
        Self {
            synchronous_mode: false,
            fixed_delta_seconds: None,
        }
    }
}
