//! Plain data describing spatial entities

use crate::core::coordinates::BigVector3;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Default near clip plane
pub const DEFAULT_NEAR: f32 = 0.1;
/// Default far clip plane
pub const DEFAULT_FAR: f32 = 10_000.0;
/// Near planes at or inside this distance disable the near-cull sphere
pub const NEAR_CULL_THRESHOLD: f32 = 0.1;
/// Radius of the near-cull sphere once it is enabled
pub const NEAR_CULL_RADIUS: f32 = 100.0;
/// Default continuous spin in radians per second on each axis
pub const DEFAULT_SPIN: Vec3 = Vec3::splat(-1.0);

/// Light emitted by an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    /// Linear RGB color
    pub color: Vec3,
    /// Intensity at unit distance; zero means the entity is not a light
    pub intensity: f32,
}

impl Default for Emission {
    fn default() -> Self {
        Self::none()
    }
}

impl Emission {
    /// Create an emission of `color` at `intensity`
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self { color, intensity }
    }

    /// No emission at all
    pub fn none() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 0.0,
        }
    }

    /// True when this emission makes the entity a registered light
    pub fn is_emissive(&self) -> bool {
        self.intensity != 0.0
    }
}

/// Near and far clip planes used for an entity's projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlanes {
    pub near: f32,
    pub far: f32,
}

impl Default for ClipPlanes {
    fn default() -> Self {
        Self {
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

impl ClipPlanes {
    /// Create clip planes
    pub fn new(near: f32, far: f32) -> Self {
        Self { near, far }
    }

    /// Radius around the camera inside which fragments are discarded
    ///
    /// A two-valued step on [`NEAR_CULL_THRESHOLD`]: nothing is culled at or inside it, anything
    /// pushed further out culls a fixed [`NEAR_CULL_RADIUS`] sphere.
    pub fn near_cull_radius(&self) -> f32 {
        if self.near <= NEAR_CULL_THRESHOLD {
            0.0
        } else {
            NEAR_CULL_RADIUS
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_spin() -> Vec3 {
    DEFAULT_SPIN
}

/// Everything needed to construct a spatial entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// World position
    #[serde(default)]
    pub position: BigVector3,
    /// Units per second
    #[serde(default)]
    pub velocity: BigVector3,
    /// Units per second squared
    #[serde(default)]
    pub acceleration: BigVector3,
    /// Euler angles in radians, applied X then Y then Z
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    /// Radians per second added to `rotation` on every update
    #[serde(default = "default_spin")]
    pub angular_velocity: Vec3,
    #[serde(default)]
    pub emission: Emission,
    /// Per-entity clip planes; the world default applies when absent
    #[serde(default)]
    pub clip: Option<ClipPlanes>,
}

impl Default for EntityDescriptor {
    fn default() -> Self {
        Self {
            position: BigVector3::zero(),
            velocity: BigVector3::zero(),
            acceleration: BigVector3::zero(),
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            angular_velocity: DEFAULT_SPIN,
            emission: Emission::none(),
            clip: None,
        }
    }
}

impl EntityDescriptor {
    /// A non-emissive entity at `position`
    pub fn at(position: BigVector3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_velocity(mut self, velocity: BigVector3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: BigVector3) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Override the default spin; `Vec3::ZERO` disables it
    pub fn with_spin(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_emission(mut self, color: Vec3, intensity: f32) -> Self {
        self.emission = Emission::new(color, intensity);
        self
    }

    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.clip = Some(ClipPlanes::new(near, far));
        self
    }
}
