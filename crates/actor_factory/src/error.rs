//! Actor Factory error types

use contracts::{ActorId, ContractError};
use thiserror::Error;

/// Actor Factory specific error
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// Could not reach the CARLA server
    #[error("failed to connect to CARLA: {message}")]
    ConnectionFailed { message: String },

    /// Connection dropped while the session was running
    #[error("lost connection to CARLA: {message}")]
    ConnectionLost { message: String },

    /// Map could not be loaded
    #[error("failed to load map '{map}': {message}")]
    MapLoadFailed { map: String, message: String },

    /// Blueprint missing from the server's library
    #[error("blueprint '{blueprint}' not found")]
    BlueprintNotFound { blueprint: String },

    /// Sensor spawn error
    #[error("failed to spawn sensor '{blueprint}' on actor {parent_id}: {message}")]
    SensorSpawnFailed {
        blueprint: String,
        parent_id: ActorId,
        message: String,
    },

    /// Operation on an actor the client does not know
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: ActorId },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ActorFactoryError {
    /// Create sensor spawn error
    pub fn sensor_spawn(
        blueprint: impl Into<String>,
        parent_id: ActorId,
        message: impl Into<String>,
    ) -> Self {
        Self::SensorSpawnFailed {
            blueprint: blueprint.into(),
            parent_id,
            message: message.into(),
        }
    }

    /// Create connection lost error
    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            message: message.into(),
        }
    }

    /// Whether the session can no longer talk to the server
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::ConnectionLost { .. }
        )
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
