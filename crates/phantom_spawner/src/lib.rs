//! # Phantom Spawner
//!
//! Spawns short-lived "phantom" objects around the ego vehicle so recorded
//! LiDAR sweeps contain clutter that is absent from the dataset.
//!
//! The live set is owned by a [`SpawnController`]; the recorder drives it
//! once per frame with an injected RNG.

pub mod controller;
pub mod phantom;
pub mod sampling;

pub use controller::{SpawnController, StepReport};
pub use phantom::PhantomObject;
pub use sampling::{plan_batch, trigger_fires, SpawnPlan};
