//! SpawnController - per-frame phantom lifecycle
//!
//! Each `step` runs, in order:
//! 1. age every live phantom by one frame, despawning the expired ones
//! 2. evaluate the spawn trigger
//! 3. plan a batch around the ego and try to spawn each object
//!
//! Ageing runs on every frame; a frame without an ego only skips 2 and 3.
//!
//! Rejected spawns are dropped without retry. Only a lost connection is
//! returned as an error; the live set stays consistent so `release_all`
//! can still clean up afterwards.

use actor_factory::{CarlaClient, Result};
use contracts::{default_catalog, BoundingBox, ContractError, SpawnConfig, Transform};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::phantom::PhantomObject;
use crate::sampling::{plan_batch, trigger_fires};

/// Outcome of one `step`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Whether a batch was triggered this frame
    pub triggered: bool,
    /// Spawn attempts made
    pub attempted: usize,
    /// Attempts accepted by the server
    pub spawned: usize,
    /// Attempts refused (collision, unknown blueprint)
    pub rejected: usize,
    /// Phantoms whose persistence ran out
    pub despawned: usize,
    /// Live phantoms after the step
    pub live: usize,
}

/// Owner of the live phantom set
#[derive(Debug)]
pub struct SpawnController {
    config: SpawnConfig,
    population: Vec<String>,
    live: Vec<PhantomObject>,
}

impl SpawnController {
    /// Create a controller, validating the configuration first
    pub fn new(config: SpawnConfig) -> std::result::Result<Self, ContractError> {
        config.validate()?;
        let population = config
            .allowed_objects
            .clone()
            .unwrap_or_else(default_catalog);
        Ok(Self {
            config,
            population,
            live: Vec::new(),
        })
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Blueprints a batch draws from
    pub fn population(&self) -> &[String] {
        &self.population
    }

    /// Live phantoms, oldest first
    pub fn live(&self) -> &[PhantomObject] {
        &self.live
    }

    /// Bounding-box annotations for every live phantom
    pub fn annotations(&self) -> Vec<BoundingBox> {
        self.live.iter().map(PhantomObject::annotation).collect()
    }

    /// Advance one frame; `ego` is None when the frame has no ego vehicle
    #[instrument(name = "spawn_controller_step", skip(self, client, ego, rng), fields(live = self.live.len()))]
    pub async fn step<C, R>(
        &mut self,
        client: &C,
        frame: u64,
        ego: Option<&Transform>,
        rng: &mut R,
    ) -> Result<StepReport>
    where
        C: CarlaClient,
        R: Rng,
    {
        let mut report = StepReport {
            despawned: self.age_and_despawn(client).await,
            ..Default::default()
        };

        let ego = match ego {
            Some(ego) if self.config.is_enabled() => ego,
            _ => {
                report.live = self.live.len();
                return Ok(report);
            }
        };

        if trigger_fires(self.config.trigger, frame, rng) {
            report.triggered = true;
            let plans = plan_batch(&self.config, &self.population, &ego.location, rng);

            for (batch_index, plan) in plans.into_iter().enumerate() {
                report.attempted += 1;
                let spawned = match client.try_spawn_actor(&plan.blueprint, plan.transform).await {
                    Ok(spawned) => spawned,
                    Err(e) if e.is_connection_error() => return Err(e),
                    Err(e) => {
                        warn!(blueprint = %plan.blueprint, error = %e, "phantom spawn failed");
                        None
                    }
                };

                let Some(actor) = spawned else {
                    debug!(blueprint = %plan.blueprint, distance = plan.distance, "phantom spawn rejected");
                    report.rejected += 1;
                    continue;
                };

                self.live.push(PhantomObject {
                    blueprint: plan.blueprint,
                    transform: plan.transform,
                    remaining: plan.persistence,
                    persistence: plan.persistence,
                    actor_id: actor.id,
                    spawn_frame: frame,
                    batch_index,
                    extent: actor.extent,
                });
                report.spawned += 1;

                if let Err(e) = client.set_simulate_physics(actor.id, false).await {
                    if e.is_connection_error() {
                        return Err(e);
                    }
                    warn!(actor_id = actor.id, error = %e, "failed to disable phantom physics");
                }
            }
        }

        report.live = self.live.len();
        if report.triggered || report.despawned > 0 {
            debug!(frame, ?report, "phantom step");
        }
        Ok(report)
    }

    /// Decrement persistence and destroy expired phantoms
    ///
    /// Destroy errors are logged; the object leaves the live set regardless.
    async fn age_and_despawn<C: CarlaClient>(&mut self, client: &C) -> usize {
        let mut expired = Vec::new();
        self.live.retain_mut(|phantom| {
            if phantom.age() {
                expired.push(phantom.clone());
                false
            } else {
                true
            }
        });

        for phantom in &expired {
            if let Err(e) = client.destroy_actor(phantom.actor_id).await {
                warn!(actor_id = phantom.actor_id, error = %e, "failed to despawn phantom");
            }
        }
        expired.len()
    }

    /// Destroy every live phantom and empty the set
    ///
    /// Best-effort: errors are logged. Returns how many were released.
    #[instrument(name = "spawn_controller_release_all", skip(self, client), fields(live = self.live.len()))]
    pub async fn release_all<C: CarlaClient>(&mut self, client: &C) -> usize {
        let released: Vec<PhantomObject> = self.live.drain(..).collect();
        for phantom in &released {
            if let Err(e) = client.destroy_actor(phantom.actor_id).await {
                warn!(actor_id = phantom.actor_id, error = %e, "failed to release phantom");
            }
        }
        if !released.is_empty() {
            info!(count = released.len(), "phantoms released");
        }
        released.len()
    }
}
