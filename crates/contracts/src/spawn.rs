//! SpawnConfig - Phantom spawner input
//!
//! Describes how many phantom objects appear per batch, where, for how long
//! and which blueprints they may use.

use serde::{Deserialize, Serialize};

use crate::{is_known_blueprint, ContractError};

/// Closed interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> ValueRange<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Range holding a single value
    pub const fn exactly(value: T) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Policy deciding on which frames a new phantom batch starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpawnTrigger {
    /// Batch on every frame index divisible by `frames` (frame 0 included)
    Interval { frames: u64 },
    /// Independent Bernoulli trial per frame
    Probability { p: f64 },
}

impl Default for SpawnTrigger {
    fn default() -> Self {
        Self::Interval { frames: 10 }
    }
}

/// Phantom spawner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Objects per spawn batch
    #[serde(default = "default_frequency")]
    pub frequency: ValueRange<u32>,

    /// Distance from the ego vehicle (metres)
    #[serde(default = "default_distance")]
    pub distance: ValueRange<f64>,

    /// Frames an object stays alive
    #[serde(default = "default_persistence")]
    pub persistence: ValueRange<u32>,

    /// Yaw of the spawned object (degrees)
    #[serde(default = "default_rotation")]
    pub rotation: ValueRange<f64>,

    /// Restricts the blueprint population; `None` means the full catalog
    #[serde(default)]
    pub allowed_objects: Option<Vec<String>>,

    /// When a new batch starts
    #[serde(default)]
    pub trigger: SpawnTrigger,
}

fn default_frequency() -> ValueRange<u32> {
    ValueRange::new(5, 10)
}

fn default_distance() -> ValueRange<f64> {
    ValueRange::new(5.0, 10.0)
}

fn default_persistence() -> ValueRange<u32> {
    ValueRange::new(10, 20)
}

fn default_rotation() -> ValueRange<f64> {
    ValueRange::new(-180.0, 180.0)
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            distance: default_distance(),
            persistence: default_persistence(),
            rotation: default_rotation(),
            allowed_objects: None,
            trigger: SpawnTrigger::default(),
        }
    }
}

impl SpawnConfig {
    /// Configuration that never spawns anything
    pub fn disabled() -> Self {
        Self {
            frequency: ValueRange::exactly(0),
            ..Self::default()
        }
    }

    /// Whether any batch can ever contain an object
    pub fn is_enabled(&self) -> bool {
        self.frequency.max > 0
    }

    /// Check every invariant, returning the first violation
    pub fn validate(&self) -> Result<(), ContractError> {
        check_range("spawn.frequency", &self.frequency)?;
        check_range("spawn.persistence", &self.persistence)?;
        check_range("spawn.distance", &self.distance)?;
        check_range("spawn.rotation", &self.rotation)?;

        if self.persistence.min == 0 {
            return Err(ContractError::config_validation(
                "spawn.persistence.min",
                "persistence must be at least 1 frame",
            ));
        }

        check_finite_span("spawn.distance", &self.distance)?;
        if self.distance.min < 0.0 {
            return Err(ContractError::config_validation(
                "spawn.distance.min",
                format!("distance must be >= 0, got {}", self.distance.min),
            ));
        }
        check_finite_span("spawn.rotation", &self.rotation)?;

        match self.trigger {
            SpawnTrigger::Interval { frames: 0 } => {
                return Err(ContractError::config_validation(
                    "spawn.trigger.frames",
                    "spawn interval must be >= 1 frame",
                ));
            }
            SpawnTrigger::Probability { p } if !(0.0..=1.0).contains(&p) => {
                return Err(ContractError::config_validation(
                    "spawn.trigger.p",
                    format!("spawn probability must be within [0, 1], got {p}"),
                ));
            }
            _ => {}
        }

        if let Some(allowed) = &self.allowed_objects {
            if allowed.is_empty() {
                return Err(ContractError::config_validation(
                    "spawn.allowed_objects",
                    "allow-list cannot be empty",
                ));
            }
            if let Some(unknown) = allowed.iter().find(|id| !is_known_blueprint(id)) {
                return Err(ContractError::config_validation(
                    "spawn.allowed_objects",
                    format!("unknown blueprint '{unknown}'"),
                ));
            }
        }

        Ok(())
    }
}

fn check_range<T>(field: &str, range: &ValueRange<T>) -> Result<(), ContractError>
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if range.is_ordered() {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("min ({}) must be <= max ({})", range.min, range.max),
        ))
    }
}

/// Bounds and `max - min` must both be finite to be sampled uniformly
fn check_finite_span(field: &str, range: &ValueRange<f64>) -> Result<(), ContractError> {
    if !range.min.is_finite() || !range.max.is_finite() {
        return Err(ContractError::config_validation(field, "bounds must be finite"));
    }
    if !(range.max - range.min).is_finite() {
        return Err(ContractError::config_validation(
            field,
            format!("span {}..{} is too wide", range.min, range.max),
        ));
    }
    Ok(())
}
