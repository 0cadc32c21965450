//! Real CARLA client implementation
//!
//! Connects to CARLA server using carla-rust crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carla::client::{Actor, ActorBase, Client, Sensor, World};
use carla::geom::{Location, Rotation, Transform as CarlaTransform};
use contracts::{ActorId, SensorSource, SpawnedActor, Transform, Vector3, Weather, WorldSettings};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::CarlaSensorSource;
use crate::client::CarlaClient;
use crate::error::{ActorFactoryError, Result};

/// Real CARLA client
///
/// Wraps carla-rust's Client, implements CarlaClient trait.
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    client: Arc<Mutex<Option<Client>>>,
    world: Arc<Mutex<Option<World>>>,
    /// Actors created through this client (for teardown)
    actors: Arc<Mutex<HashMap<ActorId, ActorType>>>,
}

#[derive(Clone)]
enum ActorType {
    Actor(Actor),
    Sensor(Sensor),
}

impl RealCarlaClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    fn not_connected() -> ActorFactoryError {
        ActorFactoryError::ConnectionFailed {
            message: "not connected to CARLA server".into(),
        }
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut world_guard = self.world.lock().unwrap();
        let world = world_guard.as_mut().ok_or_else(Self::not_connected)?;
        f(world)
    }

    fn with_actor<R>(&self, actor_id: ActorId, f: impl FnOnce(&Actor) -> R) -> Result<R> {
        let actors = self.actors.lock().unwrap();
        match actors.get(&actor_id) {
            Some(ActorType::Actor(actor)) => Ok(f(actor)),
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    fn create_sensor(
        world: &mut World,
        blueprint: &str,
        transform: Transform,
        parent_actor: &Actor,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<Sensor> {
        let bp_library = world.blueprint_library();
        let mut sensor_bp =
            bp_library
                .find(blueprint)
                .ok_or_else(|| ActorFactoryError::BlueprintNotFound {
                    blueprint: blueprint.to_string(),
                })?;

        for (key, value) in attributes {
            if !sensor_bp.set_attribute(key, value) {
                warn!(key, value, "failed to set sensor attribute");
            }
        }

        let actor = world
            .spawn_actor_attached(
                &sensor_bp,
                &to_carla_transform(&transform),
                parent_actor,
                None,
            )
            .map_err(|e| ActorFactoryError::sensor_spawn(blueprint, parent_id, e.to_string()))?;

        Sensor::try_from(actor).map_err(|_| {
            ActorFactoryError::sensor_spawn(blueprint, parent_id, "spawned actor is not a sensor")
        })
    }

    fn destroy_sensor_actor(sensor: Sensor, actor_id: ActorId) {
        if sensor.is_listening() {
            sensor.stop();
        }
        if !sensor.destroy() {
            warn!(actor_id, "destroy sensor returned false");
        }
    }

    /// Get underlying CARLA Sensor object
    pub fn get_sensor(&self, actor_id: ActorId) -> Option<Sensor> {
        let actors = self.actors.lock().unwrap();
        match actors.get(&actor_id) {
            Some(ActorType::Sensor(sensor)) => Some(sensor.clone()),
            _ => None,
        }
    }
}

/// Convert internal Transform to CARLA Transform
fn to_carla_transform(transform: &Transform) -> CarlaTransform {
    let location = Location {
        x: transform.location.x as f32,
        y: transform.location.y as f32,
        z: transform.location.z as f32,
    };
    let rotation = Rotation {
        pitch: transform.rotation.pitch as f32,
        yaw: transform.rotation.yaw as f32,
        roll: transform.rotation.roll as f32,
    };
    CarlaTransform { location, rotation }
}

impl CarlaClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let mut client = Client::connect(host, port, None);
        client.set_timeout(timeout);
        let world = client.world();

        info!(
            map = %world.map().name(),
            "connected to CARLA server"
        );

        *self.client.lock().unwrap() = Some(client);
        *self.world.lock().unwrap() = Some(world);

        Ok(())
    }

    #[instrument(name = "real_carla_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<()> {
        let mut client_guard = self.client.lock().unwrap();
        let client = client_guard.as_mut().ok_or_else(Self::not_connected)?;

        let available = client.available_maps();
        if !available.iter().any(|m| m.rsplit('/').next() == Some(map)) {
            return Err(ActorFactoryError::MapLoadFailed {
                map: map.to_string(),
                message: format!("not among the {} maps offered by the server", available.len()),
            });
        }

        let world = client.load_world(map);
        // Loading a map destroys every actor of the previous world
        self.actors.lock().unwrap().clear();
        *self.world.lock().unwrap() = Some(world);
        info!("map loaded");
        Ok(())
    }

    #[instrument(name = "real_carla_apply_settings", skip(self))]
    async fn apply_settings(&self, settings: WorldSettings) -> Result<()> {
        self.with_world_mut(|world| {
            let mut current = world.settings();
            current.synchronous_mode = settings.synchronous_mode;
            current.fixed_delta_seconds = settings.fixed_delta_seconds;
            world.apply_settings(&current, Duration::ZERO);
            Ok(())
        })
    }

    fn has_blueprint(&self, blueprint: &str) -> bool {
        self.with_world_mut(|world| Ok(world.blueprint_library().find(blueprint).is_some()))
            .unwrap_or(false)
    }

    #[instrument(
        name = "real_carla_try_spawn_actor",
        skip(self, transform),
        fields(blueprint = %blueprint)
    )]
    async fn try_spawn_actor(
        &self,
        blueprint: &str,
        transform: Transform,
    ) -> Result<Option<SpawnedActor>> {
        let actor = self.with_world_mut(|world| {
            let bp = world.blueprint_library().find(blueprint).ok_or_else(|| {
                ActorFactoryError::BlueprintNotFound {
                    blueprint: blueprint.to_string(),
                }
            })?;
            match world.spawn_actor(&bp, &to_carla_transform(&transform)) {
                Ok(actor) => Ok(Some(actor)),
                Err(e) => {
                    debug!(error = %e, "spawn refused by server");
                    Ok(None)
                }
            }
        })?;

        let Some(actor) = actor else {
            return Ok(None);
        };
        let id = actor.id();
        let extent = actor.bounding_box().extent;
        self.actors
            .lock()
            .unwrap()
            .insert(id, ActorType::Actor(actor));

        Ok(Some(SpawnedActor {
            id,
            extent: Vector3 {
                x: extent.x as f64,
                y: extent.y as f64,
                z: extent.z as f64,
            },
        }))
    }

    #[instrument(
        name = "real_carla_spawn_sensor",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        let parent_actor = self
            .with_actor(parent_id, Actor::clone)
            .map_err(|_| ActorFactoryError::sensor_spawn(blueprint, parent_id, "parent actor not found"))?;
        let sensor = self.with_world_mut(|world| {
            Self::create_sensor(
                world,
                blueprint,
                transform,
                &parent_actor,
                parent_id,
                attributes,
            )
        })?;

        let actor_id = sensor.id();
        debug!(actor_id, blueprint, parent_id, "sensor spawned and attached");
        self.actors
            .lock()
            .unwrap()
            .insert(actor_id, ActorType::Sensor(sensor));

        Ok(actor_id)
    }

    async fn set_transform(&self, actor_id: ActorId, transform: Transform) -> Result<()> {
        self.with_actor(actor_id, |actor| {
            actor.set_transform(&to_carla_transform(&transform))
        })
    }

    async fn set_simulate_physics(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        self.with_actor(actor_id, |actor| actor.set_simulate_physics(enabled))
    }

    async fn set_weather(&self, weather: &Weather) -> Result<()> {
        self.with_world_mut(|world| {
            let mut params = world.weather();
            params.cloudiness = weather.cloudiness as f32;
            params.precipitation = weather.precipitation as f32;
            params.precipitation_deposits = weather.precipitation_deposits as f32;
            params.wind_intensity = weather.wind_intensity as f32;
            params.sun_azimuth_angle = weather.sun_azimuth_angle as f32;
            params.sun_altitude_angle = weather.sun_altitude_angle as f32;
            params.fog_density = weather.fog_density as f32;
            params.fog_distance = weather.fog_distance as f32;
            params.wetness = weather.wetness as f32;
            params.fog_falloff = weather.fog_falloff as f32;
            world.set_weather(&params);
            Ok(())
        })
    }

    async fn tick(&self) -> Result<u64> {
        self.with_world_mut(|world| Ok(world.tick()))
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let removed = self.actors.lock().unwrap().remove(&actor_id);

        match removed {
            Some(ActorType::Actor(actor)) => {
                if !actor.destroy() {
                    warn!(actor_id, "destroy actor returned false");
                }
            }
            Some(ActorType::Sensor(sensor)) => Self::destroy_sensor_actor(sensor, actor_id),
            None => {}
        }
        debug!(actor_id, "actor destroyed");

        // Idempotent: return Ok even if not exists
        Ok(())
    }

    #[instrument(name = "real_carla_actor_exists", skip(self), fields(actor_id))]
    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.actors.lock().unwrap().contains_key(&actor_id))
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
    ) -> Option<Box<dyn SensorSource>> {
        let sensor = self.get_sensor(actor_id)?;
        Some(Box::new(CarlaSensorSource::new(sensor_id, sensor)))
    }
}
