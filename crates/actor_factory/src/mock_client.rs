//! Mock CARLA client
//!
//! In-memory world used by unit and end-to-end tests. Supports injecting
//! spawn rejections, destroy failures, unknown maps and a connection drop
//! after a given number of ticks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{
    ActorId, SensorSource, SpawnedActor, Transform, Vector3, Weather, WorldSettings,
    LIDAR_BLUEPRINT,
};
use tracing::instrument;

use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};
use crate::mock_sensor::MockLidar;

/// Mock client configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Blueprints whose spawns are always refused
    pub reject_blueprints: Vec<String>,
    /// Refuse every spawn
    pub reject_all_spawns: bool,
    /// Refuse this many spawn attempts before accepting any
    pub reject_first_spawns: u32,
    /// Blueprints missing from the library
    pub unknown_blueprints: Vec<String>,
    /// Maps that fail to load
    pub unknown_maps: Vec<String>,
    /// Actor IDs whose destroy fails
    pub fail_destroy: Vec<ActorId>,
    /// Drop the connection on this tick (1-based)
    pub disconnect_after_ticks: Option<u64>,
    /// Points per mock LiDAR sweep
    pub lidar_points: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            reject_blueprints: Vec::new(),
            reject_all_spawns: false,
            reject_first_spawns: 0,
            unknown_blueprints: Vec::new(),
            unknown_maps: Vec::new(),
            fail_destroy: Vec::new(),
            disconnect_after_ticks: None,
            lidar_points: 256,
        }
    }
}

/// Actor as tracked by the mock world
#[derive(Debug, Clone)]
pub struct MockActor {
    pub blueprint: String,
    pub transform: Transform,
    pub parent: Option<ActorId>,
    pub simulate_physics: bool,
}

/// Mock CARLA client
pub struct MockCarlaClient {
    config: MockConfig,
    /// Actor ID counter
    next_actor_id: AtomicU32,
    actors: Mutex<HashMap<ActorId, MockActor>>,
    lidars: Mutex<HashMap<ActorId, Arc<MockLidar>>>,
    connected: AtomicBool,
    endpoint: Option<(String, u16)>,
    ticks: AtomicU64,
    spawn_attempts: AtomicU32,
    map: Mutex<Option<String>>,
    settings: Mutex<WorldSettings>,
    weather: Mutex<Option<Weather>>,
}

impl MockCarlaClient {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            next_actor_id: AtomicU32::new(1000), // start at 1000 for readability
            actors: Mutex::new(HashMap::new()),
            lidars: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(false),
            endpoint: None,
            ticks: AtomicU64::new(0),
            spawn_attempts: AtomicU32::new(0),
            map: Mutex::new(None),
            settings: Mutex::new(WorldSettings::asynchronous()),
            weather: Mutex::new(None),
        }
    }

    /// Number of actors currently alive
    pub fn actor_count(&self) -> usize {
        self.actors.lock().unwrap().len()
    }

    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        self.actors.lock().unwrap().keys().copied().collect()
    }

    /// Snapshot of one actor
    pub fn actor(&self, actor_id: ActorId) -> Option<MockActor> {
        self.actors.lock().unwrap().get(&actor_id).cloned()
    }

    /// Live actors whose blueprint starts with `prefix`
    pub fn actors_with_prefix(&self, prefix: &str) -> Vec<ActorId> {
        self.actors
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, actor)| actor.blueprint.starts_with(prefix))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn current_map(&self) -> Option<String> {
        self.map.lock().unwrap().clone()
    }

    pub fn current_settings(&self) -> WorldSettings {
        *self.settings.lock().unwrap()
    }

    pub fn last_weather(&self) -> Option<Weather> {
        self.weather.lock().unwrap().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Host and port of the last `connect`
    pub fn endpoint(&self) -> Option<(&str, u16)> {
        self.endpoint.as_ref().map(|(host, port)| (host.as_str(), *port))
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else if self.tick_count() > 0 {
            Err(ActorFactoryError::connection_lost("mock server went away"))
        } else {
            Err(ActorFactoryError::ConnectionFailed {
                message: "not connected".into(),
            })
        }
    }

    fn should_reject(&self, blueprint: &str) -> bool {
        let attempt = self.spawn_attempts.fetch_add(1, Ordering::SeqCst);
        self.config.reject_all_spawns
            || attempt < self.config.reject_first_spawns
            || self.config.reject_blueprints.iter().any(|b| b == blueprint)
    }

    fn extent_for(blueprint: &str) -> Vector3 {
        if blueprint.starts_with("vehicle.") {
            Vector3 {
                x: 2.3,
                y: 1.0,
                z: 0.8,
            }
        } else {
            Vector3 {
                x: 0.3,
                y: 0.3,
                z: 0.5,
            }
        }
    }

    fn with_actor<R>(&self, actor_id: ActorId, f: impl FnOnce(&mut MockActor) -> R) -> Result<R> {
        let mut actors = self.actors.lock().unwrap();
        let actor = actors
            .get_mut(&actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })?;
        Ok(f(actor))
    }
}

impl Default for MockCarlaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CarlaClient for MockCarlaClient {
    #[instrument(name = "mock_carla_connect", skip(self, _timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, _timeout: Duration) -> Result<()> {
        self.endpoint = Some((host.to_string(), port));
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    #[instrument(name = "mock_carla_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<()> {
        self.ensure_connected()?;
        if self.config.unknown_maps.iter().any(|m| m == map) {
            return Err(ActorFactoryError::MapLoadFailed {
                map: map.to_string(),
                message: "map not available".into(),
            });
        }

        // Loading a map wipes every actor of the previous world
        self.actors.lock().unwrap().clear();
        self.lidars.lock().unwrap().clear();
        *self.map.lock().unwrap() = Some(map.to_string());
        Ok(())
    }

    #[instrument(name = "mock_carla_apply_settings", skip(self))]
    async fn apply_settings(&self, settings: WorldSettings) -> Result<()> {
        self.ensure_connected()?;
        *self.settings.lock().unwrap() = settings;
        Ok(())
    }

    fn has_blueprint(&self, blueprint: &str) -> bool {
        !self.config.unknown_blueprints.iter().any(|b| b == blueprint)
    }

    #[instrument(
        name = "mock_carla_try_spawn_actor",
        skip(self, transform),
        fields(blueprint = %blueprint)
    )]
    async fn try_spawn_actor(
        &self,
        blueprint: &str,
        transform: Transform,
    ) -> Result<Option<SpawnedActor>> {
        self.ensure_connected()?;
        if !self.has_blueprint(blueprint) {
            return Err(ActorFactoryError::BlueprintNotFound {
                blueprint: blueprint.to_string(),
            });
        }
        if self.should_reject(blueprint) {
            return Ok(None);
        }

        let id = self.allocate_actor_id();
        self.actors.lock().unwrap().insert(
            id,
            MockActor {
                blueprint: blueprint.to_string(),
                transform,
                parent: None,
                simulate_physics: true,
            },
        );
        Ok(Some(SpawnedActor {
            id,
            extent: Self::extent_for(blueprint),
        }))
    }

    #[instrument(
        name = "mock_carla_spawn_sensor",
        skip(self, transform, _attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        _attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        self.ensure_connected()?;

        // Parent must exist
        if !self.actors.lock().unwrap().contains_key(&parent_id) {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                parent_id,
                "parent actor not found",
            ));
        }
        if !self.has_blueprint(blueprint) {
            return Err(ActorFactoryError::BlueprintNotFound {
                blueprint: blueprint.to_string(),
            });
        }

        let id = self.allocate_actor_id();
        self.actors.lock().unwrap().insert(
            id,
            MockActor {
                blueprint: blueprint.to_string(),
                transform,
                parent: Some(parent_id),
                simulate_physics: false,
            },
        );
        if blueprint == LIDAR_BLUEPRINT {
            self.lidars
                .lock()
                .unwrap()
                .insert(id, MockLidar::new(self.config.lidar_points));
        }
        Ok(id)
    }

    #[instrument(name = "mock_carla_set_transform", skip(self, transform), fields(actor_id))]
    async fn set_transform(&self, actor_id: ActorId, transform: Transform) -> Result<()> {
        self.ensure_connected()?;
        self.with_actor(actor_id, |actor| actor.transform = transform)
    }

    #[instrument(name = "mock_carla_set_simulate_physics", skip(self), fields(actor_id))]
    async fn set_simulate_physics(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        self.ensure_connected()?;
        self.with_actor(actor_id, |actor| actor.simulate_physics = enabled)
    }

    async fn set_weather(&self, weather: &Weather) -> Result<()> {
        self.ensure_connected()?;
        *self.weather.lock().unwrap() = Some(weather.clone());
        Ok(())
    }

    #[instrument(name = "mock_carla_tick", skip(self))]
    async fn tick(&self) -> Result<u64> {
        self.ensure_connected()?;
        let frame = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;

        if self.config.disconnect_after_ticks == Some(frame) {
            self.connected.store(false, Ordering::SeqCst);
            return Err(ActorFactoryError::connection_lost(format!(
                "mock server dropped the connection on tick {frame}"
            )));
        }

        // Collect first so callbacks run without the registry lock held
        let lidars: Vec<Arc<MockLidar>> = self.lidars.lock().unwrap().values().cloned().collect();
        let timestamp = frame as f64 * 0.05;
        for lidar in lidars {
            lidar.emit(frame, timestamp);
        }
        Ok(frame)
    }

    #[instrument(name = "mock_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if self.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        // Idempotent: Ok even if it doesn't exist
        self.actors.lock().unwrap().remove(&actor_id);
        self.lidars.lock().unwrap().remove(&actor_id);
        Ok(())
    }

    #[instrument(name = "mock_carla_actor_exists", skip(self), fields(actor_id))]
    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.actors.lock().unwrap().contains_key(&actor_id))
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
    ) -> Option<Box<dyn SensorSource>> {
        let lidar = self.lidars.lock().unwrap().get(&actor_id).cloned()?;
        Some(Box::new(lidar.source(sensor_id)))
    }
}
