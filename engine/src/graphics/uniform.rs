//! GPU uniform buffer types
//!
//! Plain-old-data blocks that mirror the lit textured shader's uniform layout. Every field is
//! 16-byte aligned so the structs can be uploaded as-is with `bytemuck`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Maximum number of lights a single draw can carry to the GPU
pub const MAX_GPU_LIGHTS: usize = 16;

/// Per-object transform and material data
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    /// Camera-relative model matrix
    pub model: [[f32; 4]; 4],
    /// Rotation-only view matrix
    pub view: [[f32; 4]; 4],
    /// Perspective projection
    pub projection: [[f32; 4]; 4],
    /// Emission color in `xyz`, emission intensity in `w`
    pub emission: [f32; 4],
    /// `x` = cull radius, `y` = gamma, `zw` unused
    pub params: [f32; 4],
    /// `x` = light count, `yzw` unused
    pub counts: [u32; 4],
}

impl ObjectUniform {
    /// Create a new object uniform from the three matrices
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            ..Default::default()
        }
    }

    /// The light count, clamped to [`MAX_GPU_LIGHTS`]
    pub fn light_count(&self) -> usize {
        (self.counts[0] as usize).min(MAX_GPU_LIGHTS)
    }
}

impl Default for ObjectUniform {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            emission: [0.0; 4],
            params: [0.0, 2.2, 0.0, 0.0],
            counts: [0; 4],
        }
    }
}

/// One directional light as seen by a draw
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    /// Unit direction from the light towards the lit object
    pub direction: [f32; 3],
    /// Attenuated intensity
    pub intensity: f32,
    /// Light color
    pub color: [f32; 3],
    pub _padding: f32,
}

impl LightUniform {
    /// Create a new light uniform
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.to_array(),
            intensity,
            color: color.to_array(),
            _padding: 0.0,
        }
    }
}

/// Fixed-size light array bound next to [`ObjectUniform`]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightsUniform {
    pub lights: [LightUniform; MAX_GPU_LIGHTS],
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_object_uniform_size() {
        // Three matrices plus three 16-byte vectors
        assert_eq!(mem::size_of::<ObjectUniform>(), 3 * 64 + 3 * 16);
        assert_eq!(mem::size_of::<ObjectUniform>() % 16, 0);
    }

    #[test]
    fn test_light_uniform_size() {
        assert_eq!(mem::size_of::<LightUniform>(), 32);
        assert_eq!(mem::size_of::<LightsUniform>(), 32 * MAX_GPU_LIGHTS);
    }

    #[test]
    fn test_object_uniform_creation() {
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let projection = Mat4::perspective_rh_gl(45.0_f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        let uniform = ObjectUniform::new(model, Mat4::IDENTITY, projection);
        assert_eq!(uniform.model, model.to_cols_array_2d());
        assert_eq!(uniform.projection, projection.to_cols_array_2d());
        assert_eq!(uniform.light_count(), 0);
    }

    #[test]
    fn test_light_count_is_clamped() {
        let mut uniform = ObjectUniform::default();
        uniform.counts[0] = 99;
        assert_eq!(uniform.light_count(), MAX_GPU_LIGHTS);
    }

    #[test]
    fn test_uniforms_cast_to_bytes() {
        let lights = LightsUniform::default();
        let bytes: &[u8] = bytemuck::bytes_of(&lights);
        assert_eq!(bytes.len(), mem::size_of::<LightsUniform>());
        assert!(bytes.iter().all(|b| *b == 0));
    }
}
