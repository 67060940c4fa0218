//! World configuration
//!
//! A [`WorldConfig`] is plain JSON. Big-space positions are written as decimal strings so values
//! far beyond `f64` survive the round trip untouched.

use crate::core::camera::FloatingOriginCamera;
use crate::core::coordinates::BigVector3;
use crate::core::entity::components::{EntityDescriptor, DEFAULT_FAR, DEFAULT_NEAR};
use crate::core::entity::world::DEFAULT_GAMMA;
use crate::graphics::backend::BackendKind;
use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error when reading or writing files
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON or a field of the wrong shape
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Well-formed but unusable values
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Initial camera placement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: BigVector3,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Everything needed to compose a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Viewport size in pixels
    pub resolution: UVec2,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub gamma: f32,
    /// Near clip plane for entities without their own
    pub near: f32,
    /// Far clip plane for entities without their own
    pub far: f32,
    pub backend: BackendKind,
    pub camera: CameraConfig,
    pub entities: Vec<EntityDescriptor>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            resolution: UVec2::new(800, 600),
            fov: 90.0,
            gamma: DEFAULT_GAMMA,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            backend: BackendKind::default(),
            camera: CameraConfig::default(),
            entities: Vec::new(),
        }
    }
}

impl WorldConfig {
    /// Parse and validate a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = ?path, "Loading world config");
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        info!(
            path = ?path,
            entities = config.entities.len(),
            backend = ?config.backend,
            "Loaded world config"
        );
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!(path = ?path.as_ref(), "Saved world config");
        Ok(())
    }

    /// Reject values that would produce a degenerate projection or framebuffer
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution.x == 0 || self.resolution.y == 0 {
            return Err(ConfigError::Invalid(format!(
                "resolution must be non-zero, got {}x{}",
                self.resolution.x, self.resolution.y
            )));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "fov must be in (0, 180) degrees, got {}",
                self.fov
            )));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        check_clip_planes("world", self.near, self.far)?;
        for (index, entity) in self.entities.iter().enumerate() {
            if let Some(clip) = entity.clip {
                check_clip_planes(&format!("entity {index}"), clip.near, clip.far)?;
            }
        }
        Ok(())
    }

    /// Build the camera described by this configuration
    pub fn camera(&self) -> FloatingOriginCamera {
        let mut camera = FloatingOriginCamera::new(
            Vec2::new(self.resolution.x as f32, self.resolution.y as f32),
            self.camera.position.clone(),
        )
        .with_fov(self.fov);
        camera.yaw = self.camera.yaw;
        camera.pitch = self.camera.pitch;
        camera.roll = self.camera.roll;
        camera
    }
}

fn check_clip_planes(owner: &str, near: f32, far: f32) -> Result<(), ConfigError> {
    if !(near > 0.0 && near.is_finite()) {
        return Err(ConfigError::Invalid(format!(
            "{owner}: near plane must be positive, got {near}"
        )));
    }
    if !(far > near && far.is_finite()) {
        return Err(ConfigError::Invalid(format!(
            "{owner}: far plane must be beyond near ({near}), got {far}"
        )));
    }
    Ok(())
}
