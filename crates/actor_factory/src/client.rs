//! CARLA client abstraction
//!
//! Everything the recorder and the phantom spawner need from the simulator,
//! implemented by the real client and the mock client alike.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use contracts::{ActorId, SensorSource, SpawnedActor, Transform, Weather, WorldSettings};

use crate::error::Result;

/// CARLA client trait
pub trait CarlaClient: Send + Sync {
    /// Connect to CARLA server
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Load a map by name (e.g. "Town03"), replacing the current world
    fn load_world(&self, map: &str) -> impl Future<Output = Result<()>> + Send;

    /// Apply synchronous-mode settings to the current world
    fn apply_settings(&self, settings: WorldSettings) -> impl Future<Output = Result<()>> + Send;

    /// Whether the blueprint library contains `blueprint`
    fn has_blueprint(&self, blueprint: &str) -> bool;

    /// Try to spawn an actor
    ///
    /// `Ok(None)` means the server refused the location (collision or
    /// similar); errors are reserved for connection and lookup failures.
    fn try_spawn_actor(
        &self,
        blueprint: &str,
        transform: Transform,
    ) -> impl Future<Output = Result<Option<SpawnedActor>>> + Send;

    /// Spawn sensor and attach to parent actor
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "sensor.lidar.ray_cast"
    /// * `transform` - Pose relative to parent actor
    /// * `parent_id` - Parent actor ID
    /// * `attributes` - Sensor attributes
    fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Teleport an actor
    fn set_transform(
        &self,
        actor_id: ActorId,
        transform: Transform,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Enable or disable physics for an actor
    fn set_simulate_physics(
        &self,
        actor_id: ActorId,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Apply weather parameters to the current world
    fn set_weather(&self, weather: &Weather) -> impl Future<Output = Result<()>> + Send;

    /// Advance the simulation one step, returning the new frame number
    fn tick(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Destroy actor
    ///
    /// Idempotent operation: returns Ok if actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Check if actor exists
    fn actor_exists(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Get the data source of a spawned sensor
    ///
    /// Returns None if the actor is not a sensor known to this client.
    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
    ) -> Option<Box<dyn SensorSource>>;
}
