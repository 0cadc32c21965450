//! Spawn decisions: trigger evaluation and batch placement
//!
//! All randomness comes from the caller's RNG so a seeded generator
//! reproduces the same sequence.

use contracts::{Location, Rotation, SpawnConfig, SpawnTrigger, Transform, ValueRange};
use rand::Rng;

/// One planned spawn attempt
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPlan {
    pub blueprint: String,
    pub transform: Transform,
    pub persistence: u32,
    /// Ground-plane distance from the ego (metres)
    pub distance: f64,
    /// Direction from the ego, degrees in `[0, 360)`
    pub bearing: f64,
}

/// Whether a batch starts on `frame`
pub fn trigger_fires<R: Rng>(trigger: SpawnTrigger, frame: u64, rng: &mut R) -> bool {
    match trigger {
        SpawnTrigger::Interval { frames } => frames > 0 && frame % frames == 0,
        SpawnTrigger::Probability { p } => rng.random_bool(p.clamp(0.0, 1.0)),
    }
}

fn sample_u32<R: Rng>(range: ValueRange<u32>, rng: &mut R) -> u32 {
    rng.random_range(range.min..=range.max)
}

fn sample_f64<R: Rng>(range: ValueRange<f64>, rng: &mut R) -> f64 {
    rng.random_range(range.min..=range.max)
}

/// Plan a full batch around `ego`
///
/// The batch size is uniform in the frequency range; each object draws its
/// blueprint, distance, bearing, yaw and persistence independently.
/// `population` must not be empty.
pub fn plan_batch<R: Rng>(
    config: &SpawnConfig,
    population: &[String],
    ego: &Location,
    rng: &mut R,
) -> Vec<SpawnPlan> {
    if population.is_empty() {
        return Vec::new();
    }
    let count = sample_u32(config.frequency, rng);
    let mut plans = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let blueprint = population[rng.random_range(0..population.len())].clone();
        let distance = sample_f64(config.distance, rng);
        let bearing: f64 = rng.random_range(0.0..360.0);
        let yaw = sample_f64(config.rotation, rng);
        let persistence = sample_u32(config.persistence, rng);
        plans.push(SpawnPlan {
            blueprint,
            transform: Transform::new(ego.offset_polar(distance, bearing), Rotation::yaw(yaw)),
            persistence,
            distance,
            bearing,
        });
    }
    plans
}
