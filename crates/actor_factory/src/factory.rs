//! Scene actor management
//!
//! Mirrors the actors recorded in a dataset frame into the simulator:
//! new annotation ids are spawned, known ones teleported, vanished ones
//! destroyed. Ids that could not be spawned once are not retried.

use std::collections::{HashMap, HashSet};

use contracts::{ActorId, AnnotationId, BoundingBox, Transform, EGO_CLASS};
use tracing::{debug, error, info, instrument, warn};

use crate::client::CarlaClient;
use crate::error::Result;

/// Dataset mesh paths (`/Game/...`) to blueprints, matched by substring
const MESH_BLUEPRINTS: [(&str, &str); 5] = [
    ("Charger", "vehicle.dodge.charger_2020"),
    ("FordCrown", "vehicle.ford.crown"),
    ("Lincoln", "vehicle.lincoln.mkz_2020"),
    ("MercedesCCC", "vehicle.mercedes.coupe_2020"),
    ("NissanPatrol2021", "vehicle.nissan.patrol_2021"),
];

/// Per-class fallback blueprints
const CLASS_BLUEPRINTS: [(&str, &str); 5] = [
    (EGO_CLASS, "vehicle.lincoln.mkz_2020"),
    ("vehicle", "vehicle.tesla.model3"),
    ("walker", "walker.pedestrian.0001"),
    ("traffic_light", "static.prop.streetsign"),
    ("traffic_sign", "static.prop.streetsign"),
];

/// Last-resort blueprint for unknown classes
pub const FALLBACK_BLUEPRINT: &str = "static.prop.fountain";

/// Height added on the single spawn retry (metres)
pub const RETRY_LIFT: f64 = 2.0;

fn class_blueprint(class: &str) -> Option<&'static str> {
    CLASS_BLUEPRINTS
        .iter()
        .find(|(c, _)| *c == class)
        .map(|(_, bp)| *bp)
}

/// Pick the blueprint used to replay an annotated actor
///
/// Order: mesh path lookup, the annotated `type_id` itself, the class
/// fallback, then [`FALLBACK_BLUEPRINT`]. `is_available` is the server's
/// blueprint library lookup.
pub fn resolve_blueprint(
    class: &str,
    type_id: Option<&str>,
    is_available: impl Fn(&str) -> bool,
) -> Option<String> {
    if let Some(mesh) = type_id.filter(|t| t.starts_with("/Game/")) {
        let bp = MESH_BLUEPRINTS
            .iter()
            .find(|(key, _)| mesh.contains(key))
            .map(|(_, bp)| *bp)
            .or_else(|| class_blueprint("vehicle"))?;
        return Some(bp.to_string());
    }

    if let Some(type_id) = type_id.filter(|t| is_available(t)) {
        return Some(type_id.to_string());
    }

    class_blueprint(class)
        .filter(|bp| is_available(bp))
        .or_else(|| Some(FALLBACK_BLUEPRINT).filter(|bp| is_available(bp)))
        .map(str::to_string)
}

/// Outcome of one [`SceneActors::sync_frame`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub spawned: usize,
    pub failed: usize,
    pub removed: usize,
    /// Ego vehicle actor spawned during this call
    pub new_ego: Option<ActorId>,
}

/// Replayed scene actors of one dataset instance
#[derive(Debug, Default)]
pub struct SceneActors {
    spawned: HashMap<AnnotationId, ActorId>,
    failed: HashSet<AnnotationId>,
}

impl SceneActors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actor backing an annotation id
    pub fn actor_for(&self, id: &AnnotationId) -> Option<ActorId> {
        self.spawned.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.spawned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
    }

    /// Annotation ids that could not be spawned
    pub fn failed_ids(&self) -> &HashSet<AnnotationId> {
        &self.failed
    }

    /// Bring the simulator in line with one frame's bounding boxes
    ///
    /// Only connection errors are returned; anything else marks the
    /// annotation id as failed and is logged.
    #[instrument(
        name = "scene_actors_sync_frame",
        skip(self, client, boxes),
        fields(boxes = boxes.len(), known = self.spawned.len())
    )]
    pub async fn sync_frame<C: CarlaClient>(
        &mut self,
        client: &C,
        boxes: &[BoundingBox],
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut present = HashSet::with_capacity(boxes.len());

        for bb in boxes {
            present.insert(bb.id.clone());
            let transform = bb.transform();

            if !self.spawned.contains_key(&bb.id) && !self.failed.contains(&bb.id) {
                match self.spawn_box(client, bb, transform).await {
                    Ok(Some(actor_id)) => {
                        report.spawned += 1;
                        if bb.is_ego() && report.new_ego.is_none() {
                            report.new_ego = Some(actor_id);
                        }
                    }
                    Ok(None) => {
                        report.failed += 1;
                        self.failed.insert(bb.id.clone());
                    }
                    Err(e) if e.is_connection_error() => return Err(e),
                    Err(e) => {
                        warn!(id = %bb.id, class = %bb.class, error = %e, "scene actor spawn failed");
                        report.failed += 1;
                        self.failed.insert(bb.id.clone());
                    }
                }
            }

            if let Some(&actor_id) = self.spawned.get(&bb.id) {
                if let Err(e) = client.set_transform(actor_id, transform).await {
                    if e.is_connection_error() {
                        return Err(e);
                    }
                    warn!(id = %bb.id, actor_id, error = %e, "failed to move scene actor");
                }
            }
        }

        let vanished: Vec<AnnotationId> = self
            .spawned
            .keys()
            .filter(|id| !present.contains(*id))
            .cloned()
            .collect();
        for id in vanished {
            if let Some(actor_id) = self.spawned.remove(&id) {
                Self::destroy_actor_safe(client, actor_id, &id).await;
                report.removed += 1;
            }
        }

        debug!(?report, "scene synchronised");
        Ok(report)
    }

    /// Spawn one annotated actor, retrying once slightly above the ground
    async fn spawn_box<C: CarlaClient>(
        &mut self,
        client: &C,
        bb: &BoundingBox,
        transform: Transform,
    ) -> Result<Option<ActorId>> {
        let Some(blueprint) =
            resolve_blueprint(&bb.class, bb.type_id.as_deref(), |b| client.has_blueprint(b))
        else {
            warn!(id = %bb.id, class = %bb.class, "no blueprint available");
            return Ok(None);
        };

        let mut spawned = client.try_spawn_actor(&blueprint, transform).await?;
        if spawned.is_none() {
            let lifted = Transform::new(transform.location.raised(RETRY_LIFT), transform.rotation);
            spawned = client.try_spawn_actor(&blueprint, lifted).await?;
        }

        let Some(actor) = spawned else {
            debug!(id = %bb.id, blueprint = %blueprint, "scene actor rejected twice");
            return Ok(None);
        };

        self.spawned.insert(bb.id.clone(), actor.id);
        if let Err(e) = client.set_simulate_physics(actor.id, false).await {
            if e.is_connection_error() {
                return Err(e);
            }
            warn!(id = %bb.id, actor_id = actor.id, error = %e, "failed to disable physics");
        }
        debug!(id = %bb.id, class = %bb.class, actor_id = actor.id, blueprint = %blueprint, "scene actor spawned");
        Ok(Some(actor.id))
    }

    /// Destroy every replayed actor
    ///
    /// # Idempotency
    /// Safe to call repeatedly; the set is empty afterwards.
    #[instrument(name = "scene_actors_teardown", skip(self, client), fields(count = self.spawned.len()))]
    pub async fn teardown<C: CarlaClient>(&mut self, client: &C) {
        info!("destroying scene actors");
        for (id, actor_id) in self.spawned.drain().collect::<Vec<_>>() {
            Self::destroy_actor_safe(client, actor_id, &id).await;
        }
        self.failed.clear();
    }

    /// Destroy actor, ignoring errors (logged only)
    async fn destroy_actor_safe<C: CarlaClient>(client: &C, actor_id: ActorId, id: &AnnotationId) {
        if let Err(e) = client.destroy_actor(actor_id).await {
            error!(actor_id, id = %id, error = %e, "failed to destroy actor");
        }
    }
}
