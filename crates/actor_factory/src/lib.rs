//! # Actor Factory
//!
//! Simulator access for the recorder.
//!
//! Responsibilities:
//! - `CarlaClient` abstraction over the CARLA server
//! - Replay dataset actors into the simulator (`SceneActors`)
//! - Resolve dataset classes and mesh paths to blueprints
//! - Mock client and mock LiDAR for tests
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod client;
pub mod error;
pub mod factory;
pub mod mock_client;
pub mod mock_sensor;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;
#[cfg(feature = "real-carla")]
pub mod sensor_data_converter;

pub use client::CarlaClient;
pub use contracts::{ActorId, SensorSource, SpawnedActor};
pub use error::{ActorFactoryError, Result};
pub use factory::{resolve_blueprint, SceneActors, SyncReport};
pub use mock_client::{MockActor, MockCarlaClient, MockConfig};
pub use mock_sensor::{MockLidar, MockLidarSource};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::CarlaSensorSource;
