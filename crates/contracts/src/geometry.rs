//! World-frame geometry shared by the client, the spawner and the dataset.

use serde::{Deserialize, Serialize};

/// 3D transform: location + rotation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Location (x, y, z) in metres
    pub location: Location,

    /// Rotation (pitch, yaw, roll) in degrees
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// 3D vector, used for bounding box extents
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Point `distance` metres away on the ground plane, `bearing_deg` measured from +x.
    pub fn offset_polar(&self, distance: f64, bearing_deg: f64) -> Self {
        let theta = bearing_deg.to_radians();
        Self {
            x: self.x + distance * theta.cos(),
            y: self.y + distance * theta.sin(),
            z: self.z,
        }
    }

    /// Same location raised by `dz` metres
    pub fn raised(&self, dz: f64) -> Self {
        Self {
            z: self.z + dz,
            ..*self
        }
    }

    /// Distance on the ground plane, ignoring z
    pub fn planar_distance(&self, other: &Location) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Rotation {
    /// Rotation around the vertical axis only
    pub const fn yaw(yaw: f64) -> Self {
        Self {
            pitch: 0.0,
            yaw,
            roll: 0.0,
        }
    }
}

impl Transform {
    pub const fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    /// Identity rotation at the given location
    pub const fn at(location: Location) -> Self {
        Self {
            location,
            rotation: Rotation {
                pitch: 0.0,
                yaw: 0.0,
                roll: 0.0,
            },
        }
    }
}
