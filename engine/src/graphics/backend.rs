//! Render backend interface
//!
//! Spatial entities never talk to a graphics API directly. They push finished single-precision
//! data through [`RenderBackend`]: geometry is submitted once, then every draw binds a shader,
//! sets named uniforms, binds a texture and finalizes the draw.
//!
//! The concrete backend is chosen once at startup through [`BackendKind`] and wrapped in the
//! [`Backend`] enum, so dispatch is a plain `match` rather than a trait object.

use super::gpu::GpuBackend;
use super::mesh::Mesh;
use super::recording::RecordingBackend;
use super::software::SoftwareBackend;
use super::texture::TextureImage;
use glam::{Mat4, UVec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Uniform names shared by every backend and the shaders they stand in for
pub mod uniforms {
    pub const MODEL: &str = "model";
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const CULL_RADIUS: &str = "cullRadius";
    pub const GAMMA: &str = "gamma";
    pub const EMISSION_COLOR: &str = "emissionColor";
    pub const EMISSION_INTENSITY: &str = "emissionIntensity";
    pub const LIGHT_COUNT: &str = "lightCount";

    /// `lights[i].direction`
    pub fn light_direction(index: usize) -> String {
        format!("lights[{index}].direction")
    }

    /// `lights[i].color`
    pub fn light_color(index: usize) -> String {
        format!("lights[{index}].color")
    }

    /// `lights[i].intensity`
    pub fn light_intensity(index: usize) -> String {
        format!("lights[{index}].intensity")
    }
}

/// Geometry previously uploaded with [`RenderBackend::submit_geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryHandle(pub u32);

/// Shader program known to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u32);

impl ShaderHandle {
    /// The lit, textured shader every backend provides
    pub const LIT_TEXTURED: ShaderHandle = ShaderHandle(0);
}

/// Texture previously uploaded with [`RenderBackend::upload_texture`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Capability consumed by spatial entities to issue draw commands
///
/// None of these calls fail: unknown handles or missing uniforms are logged by the backend and the
/// draw falls back to defaults.
pub trait RenderBackend {
    /// Upload geometry once and get a handle to draw it
    fn submit_geometry(&mut self, mesh: &Mesh) -> GeometryHandle;

    /// Upload a texture once and get a handle to bind it
    fn upload_texture(&mut self, image: &TextureImage) -> TextureHandle;

    /// Start a new frame
    fn begin_frame(&mut self) {}

    /// Select the shader for the next draw
    fn bind_shader(&mut self, shader: ShaderHandle);

    /// Set a 4x4 matrix uniform
    fn set_matrix(&mut self, name: &str, value: Mat4);

    /// Set a float uniform
    fn set_scalar(&mut self, name: &str, value: f32);

    /// Set a 3-component vector uniform
    fn set_vec3(&mut self, name: &str, value: Vec3);

    /// Set an integer uniform
    fn set_int(&mut self, name: &str, value: i32);

    /// Select the texture for the next draw
    fn bind_texture(&mut self, texture: TextureHandle);

    /// Issue the draw with everything bound since the previous draw
    fn finalize_draw(&mut self, geometry: GeometryHandle);
}

/// Uniform values and bindings accumulated between two draws
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformState {
    pub shader: Option<ShaderHandle>,
    pub texture: Option<TextureHandle>,
    pub matrices: BTreeMap<String, Mat4>,
    pub scalars: BTreeMap<String, f32>,
    pub vec3s: BTreeMap<String, Vec3>,
    pub ints: BTreeMap<String, i32>,
}

impl UniformState {
    /// Matrix uniform, identity when unset
    pub fn matrix(&self, name: &str) -> Mat4 {
        self.matrices.get(name).copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Float uniform, `default` when unset
    pub fn scalar_or(&self, name: &str, default: f32) -> f32 {
        self.scalars.get(name).copied().unwrap_or(default)
    }

    /// Vector uniform, zero when unset
    pub fn vec3(&self, name: &str) -> Vec3 {
        self.vec3s.get(name).copied().unwrap_or(Vec3::ZERO)
    }

    /// Integer uniform, zero when unset
    pub fn int(&self, name: &str) -> i32 {
        self.ints.get(name).copied().unwrap_or(0)
    }

    /// Forget every binding, ready for the next draw
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Which backend to compose at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Records calls without drawing anything
    Null,
    /// CPU rasteriser into an in-memory framebuffer
    #[default]
    Software,
    /// Packs draws into `wgpu` uniform blocks
    Gpu,
}

/// The backend variants a world can own
#[derive(Debug)]
pub enum Backend {
    Null(RecordingBackend),
    Software(SoftwareBackend),
    Gpu(GpuBackend),
}

impl Backend {
    /// Compose the backend selected by `kind` for a viewport of `resolution` pixels
    pub fn new(kind: BackendKind, resolution: UVec2) -> Self {
        info!(?kind, width = resolution.x, height = resolution.y, "Creating render backend");
        match kind {
            BackendKind::Null => Backend::Null(RecordingBackend::new()),
            BackendKind::Software => {
                Backend::Software(SoftwareBackend::new(resolution.x, resolution.y))
            }
            BackendKind::Gpu => Backend::Gpu(GpuBackend::new()),
        }
    }

    /// Which variant this is
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Null(_) => BackendKind::Null,
            Backend::Software(_) => BackendKind::Software,
            Backend::Gpu(_) => BackendKind::Gpu,
        }
    }

    /// The recording backend, if that is what was composed
    pub fn as_recording(&self) -> Option<&RecordingBackend> {
        match self {
            Backend::Null(backend) => Some(backend),
            _ => None,
        }
    }

    /// The software rasteriser, if that is what was composed
    pub fn as_software(&self) -> Option<&SoftwareBackend> {
        match self {
            Backend::Software(backend) => Some(backend),
            _ => None,
        }
    }

    /// The GPU packer, if that is what was composed
    pub fn as_gpu(&self) -> Option<&GpuBackend> {
        match self {
            Backend::Gpu(backend) => Some(backend),
            _ => None,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            Backend::Null($backend) => $call,
            Backend::Software($backend) => $call,
            Backend::Gpu($backend) => $call,
        }
    };
}

impl RenderBackend for Backend {
    fn submit_geometry(&mut self, mesh: &Mesh) -> GeometryHandle {
        dispatch!(self, backend => backend.submit_geometry(mesh))
    }

    fn upload_texture(&mut self, image: &TextureImage) -> TextureHandle {
        dispatch!(self, backend => backend.upload_texture(image))
    }

    fn begin_frame(&mut self) {
        dispatch!(self, backend => backend.begin_frame())
    }

    fn bind_shader(&mut self, shader: ShaderHandle) {
        dispatch!(self, backend => backend.bind_shader(shader))
    }

    fn set_matrix(&mut self, name: &str, value: Mat4) {
        dispatch!(self, backend => backend.set_matrix(name, value))
    }

    fn set_scalar(&mut self, name: &str, value: f32) {
        dispatch!(self, backend => backend.set_scalar(name, value))
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        dispatch!(self, backend => backend.set_vec3(name, value))
    }

    fn set_int(&mut self, name: &str, value: i32) {
        dispatch!(self, backend => backend.set_int(name, value))
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        dispatch!(self, backend => backend.bind_texture(texture))
    }

    fn finalize_draw(&mut self, geometry: GeometryHandle) {
        dispatch!(self, backend => backend.finalize_draw(geometry))
    }
}
