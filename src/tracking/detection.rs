//! Per-frame detections delivered by the perception pipeline

use serde::{Deserialize, Serialize};

/// A point in camera space (metres). The camera looks down -Z, so a target
/// in front of it has a negative `z`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Distance in front of `origin` along the viewing axis
    pub fn depth_from(&self, origin: Vec3) -> f32 {
        origin.z - self.z
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Category of a detected target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Person,
    Object,
}

/// A single tracked detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Tracker-assigned identifier, stable while the target stays in view
    pub id: u32,
    pub kind: ObjectKind,
    pub position: Vec3,
    /// Whether the detection was moving this frame
    #[serde(default)]
    pub moving: bool,
}

impl Detection {
    pub fn person(id: u32, position: Vec3, moving: bool) -> Self {
        Self {
            id,
            kind: ObjectKind::Person,
            position,
            moving,
        }
    }

    pub fn object(id: u32, position: Vec3, moving: bool) -> Self {
        Self {
            id,
            kind: ObjectKind::Object,
            position,
            moving,
        }
    }

    /// Identity used to detect target changes downstream
    pub fn identity(&self) -> (u32, ObjectKind) {
        (self.id, self.kind)
    }
}
