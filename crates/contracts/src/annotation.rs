//! Dataset frame annotations
//!
//! One `anno/NNNNN.json.gz` file per frame. Only the fields the recorder
//! reads are typed; everything else is carried through untouched so a
//! re-written annotation keeps the original content.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Location, Rotation, Transform, Vector3};

/// Class of the ego vehicle's bounding box
pub const EGO_CLASS: &str = "ego_vehicle";

/// Class given to phantom objects in re-written annotations
pub const PHANTOM_CLASS: &str = "random_object";

/// Actor identifier inside an annotation: numeric in the dataset, textual for phantoms
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationId {
    Number(i64),
    Text(String),
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One annotated actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub class: String,

    pub id: AnnotationId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,

    /// World location `[x, y, z]`
    pub location: [f64; 3],

    /// `[pitch, roll, yaw]` in degrees
    #[serde(default)]
    pub rotation: [f64; 3],

    /// Half-size `[x, y, z]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<[f64; 3]>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BoundingBox {
    pub fn is_ego(&self) -> bool {
        self.class == EGO_CLASS
    }

    pub fn transform(&self) -> Transform {
        let [x, y, z] = self.location;
        let [pitch, roll, yaw] = self.rotation;
        Transform {
            location: Location { x, y, z },
            rotation: Rotation { pitch, yaw, roll },
        }
    }

    /// Annotation entry for a spawned phantom object
    pub fn phantom(id: String, blueprint: &str, transform: &Transform, extent: &Vector3) -> Self {
        let Transform { location, rotation } = transform;
        Self {
            class: PHANTOM_CLASS.to_string(),
            id: AnnotationId::Text(id),
            type_id: Some(blueprint.to_string()),
            base_type: Some("static".to_string()),
            location: location.as_array(),
            rotation: [rotation.pitch, rotation.roll, rotation.yaw],
            extent: Some([extent.x, extent.y, extent.z]),
            extra: Map::new(),
        }
    }
}

/// Weather parameters recorded with every frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Weather {
    pub cloudiness: f64,
    pub precipitation: f64,
    pub precipitation_deposits: f64,
    pub wind_intensity: f64,
    pub sun_azimuth_angle: f64,
    pub sun_altitude_angle: f64,
    pub fog_density: f64,
    pub fog_distance: f64,
    pub wetness: f64,
    pub fog_falloff: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full content of one annotation file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameAnnotation {
    #[serde(default)]
    pub bounding_boxes: Vec<BoundingBox>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FrameAnnotation {
    /// First ego vehicle box of the frame
    pub fn ego(&self) -> Option<&BoundingBox> {
        self.bounding_boxes.iter().find(|bb| bb.is_ego())
    }

    /// Copy of this frame with extra boxes appended
    pub fn with_boxes(&self, boxes: impl IntoIterator<Item = BoundingBox>) -> Self {
        let mut out = self.clone();
        out.bounding_boxes.extend(boxes);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "x": 1.0,
        "speed": 3.2,
        "bounding_boxes": [
            {"class": "ego_vehicle", "id": 42, "type_id": "vehicle.lincoln.mkz_2020",
             "location": [10.0, 20.0, 0.5], "rotation": [1.0, 2.0, 90.0],
             "extent": [2.4, 1.0, 0.8], "speed": 3.2},
            {"class": "traffic_sign", "id": 7, "location": [0.0, 0.0, 0.0]}
        ],
        "weather": {"cloudiness": 10.0, "precipitation": 0.0, "precipitation_deposits": 0.0,
                    "wind_intensity": 5.0, "sun_azimuth_angle": 90.0, "sun_altitude_angle": 45.0,
                    "fog_density": 0.0, "fog_distance": 0.0, "wetness": 0.0, "fog_falloff": 0.2,
                    "mie_scattering_scale": 0.03}
    }"#;

    #[test]
    fn parses_and_keeps_unknown_fields() {
        let anno: FrameAnnotation = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(anno.bounding_boxes.len(), 2);
        assert!(anno.extra.contains_key("speed"));

        let ego = anno.ego().unwrap();
        assert_eq!(ego.id, AnnotationId::Number(42));
        assert!(ego.extra.contains_key("speed"));

        let t = ego.transform();
        assert_eq!(t.rotation.pitch, 1.0);
        assert_eq!(t.rotation.roll, 2.0);
        assert_eq!(t.rotation.yaw, 90.0);

        let weather = anno.weather.as_ref().unwrap();
        assert!(weather.extra.contains_key("mie_scattering_scale"));

        let back = serde_json::to_value(&anno).unwrap();
        assert_eq!(back["weather"]["mie_scattering_scale"], 0.03);
        assert_eq!(back["bounding_boxes"][0]["speed"], 3.2);
    }

    #[test]
    fn phantom_box_layout() {
        let t = Transform::new(Location::new(1.0, 2.0, 3.0), Rotation::yaw(45.0));
        let bb = BoundingBox::phantom(
            "random_3_0".into(),
            "static.prop.trafficcone01",
            &t,
            &Vector3 {
                x: 0.2,
                y: 0.2,
                z: 0.4,
            },
        );
        let json = serde_json::to_value(&bb).unwrap();
        assert_eq!(json["class"], "random_object");
        assert_eq!(json["id"], "random_3_0");
        assert_eq!(json["base_type"], "static");
        assert_eq!(json["rotation"][2], 45.0);
    }
}
