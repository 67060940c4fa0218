//! Null backend that records every draw for inspection

use super::backend::{
    uniforms, GeometryHandle, RenderBackend, ShaderHandle, TextureHandle, UniformState,
};
use super::mesh::Mesh;
use super::texture::TextureImage;
use glam::{Mat4, Vec3};
use tracing::{trace, warn};

/// Snapshot of everything bound for one finalized draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub geometry: GeometryHandle,
    pub uniforms: UniformState,
}

impl DrawCall {
    /// Matrix uniform by name
    pub fn matrix(&self, name: &str) -> Option<Mat4> {
        self.uniforms.matrices.get(name).copied()
    }

    /// Float uniform by name
    pub fn scalar(&self, name: &str) -> Option<f32> {
        self.uniforms.scalars.get(name).copied()
    }

    /// Vector uniform by name
    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        self.uniforms.vec3s.get(name).copied()
    }

    /// Integer uniform by name
    pub fn int(&self, name: &str) -> Option<i32> {
        self.uniforms.ints.get(name).copied()
    }

    /// Number of lights the draw declared
    pub fn light_count(&self) -> usize {
        self.int(uniforms::LIGHT_COUNT).unwrap_or(0).max(0) as usize
    }

    /// `(direction, color, intensity)` of light `index`, if all three were set
    pub fn light(&self, index: usize) -> Option<(Vec3, Vec3, f32)> {
        Some((
            self.vec3(&uniforms::light_direction(index))?,
            self.vec3(&uniforms::light_color(index))?,
            self.scalar(&uniforms::light_intensity(index))?,
        ))
    }
}

/// Backend that draws nothing and keeps a log of finalized draws
#[derive(Debug, Default)]
pub struct RecordingBackend {
    geometry: Vec<usize>,
    textures: Vec<(u32, u32)>,
    pending: UniformState,
    draws: Vec<DrawCall>,
    frames: usize,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws finalized since the last [`RenderBackend::begin_frame`]
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Number of frames begun
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of geometry uploads
    pub fn geometry_count(&self) -> usize {
        self.geometry.len()
    }

    /// Number of texture uploads
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

impl RenderBackend for RecordingBackend {
    fn submit_geometry(&mut self, mesh: &Mesh) -> GeometryHandle {
        self.geometry.push(mesh.vertices.len());
        GeometryHandle(self.geometry.len() as u32 - 1)
    }

    fn upload_texture(&mut self, image: &TextureImage) -> TextureHandle {
        self.textures.push((image.width(), image.height()));
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn begin_frame(&mut self) {
        self.frames += 1;
        self.draws.clear();
        self.pending.clear();
    }

    fn bind_shader(&mut self, shader: ShaderHandle) {
        self.pending.shader = Some(shader);
    }

    fn set_matrix(&mut self, name: &str, value: Mat4) {
        self.pending.matrices.insert(name.to_string(), value);
    }

    fn set_scalar(&mut self, name: &str, value: f32) {
        self.pending.scalars.insert(name.to_string(), value);
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.pending.vec3s.insert(name.to_string(), value);
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.pending.ints.insert(name.to_string(), value);
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        self.pending.texture = Some(texture);
    }

    fn finalize_draw(&mut self, geometry: GeometryHandle) {
        if geometry.0 as usize >= self.geometry.len() {
            warn!(?geometry, "Draw with unknown geometry");
        }
        trace!(?geometry, draw = self.draws.len(), "Recorded draw");
        self.draws.push(DrawCall {
            geometry,
            uniforms: std::mem::take(&mut self.pending),
        });
    }
}
