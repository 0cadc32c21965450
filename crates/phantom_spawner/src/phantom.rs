//! PhantomObject - one live spawned blueprint instance

use contracts::{ActorId, BoundingBox, Transform, Vector3};

/// A phantom object alive in the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct PhantomObject {
    /// Blueprint id, e.g. "static.prop.trafficcone01"
    pub blueprint: String,

    /// World transform at spawn time
    pub transform: Transform,

    /// Frames left before despawn
    pub remaining: u32,

    /// Persistence assigned at spawn
    pub persistence: u32,

    /// Simulation actor handle
    pub actor_id: ActorId,

    /// Frame index of the batch that created it
    pub spawn_frame: u64,

    /// Position inside that batch
    pub batch_index: usize,

    /// Bounding box half-size reported by the server
    pub extent: Vector3,
}

impl PhantomObject {
    /// Annotation id, unique per recording: `random_<spawn frame>_<index>`
    pub fn annotation_id(&self) -> String {
        format!("random_{}_{}", self.spawn_frame, self.batch_index)
    }

    /// Bounding-box entry for re-written annotations
    pub fn annotation(&self) -> BoundingBox {
        BoundingBox::phantom(
            self.annotation_id(),
            &self.blueprint,
            &self.transform,
            &self.extent,
        )
    }

    /// Decrement persistence; true when the object has expired
    pub(crate) fn age(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}
