//! Graphics module
//!
//! The render backend interface consumed by spatial entities, its three variants and the
//! geometry, texture and uniform data they share.

pub mod backend;
pub mod gpu;
pub mod mesh;
pub mod recording;
pub mod software;
pub mod texture;
pub mod uniform;

// Re-export commonly used types
pub use backend::{
    uniforms, Backend, BackendKind, GeometryHandle, RenderBackend, ShaderHandle, TextureHandle,
    UniformState,
};
pub use gpu::{
    GpuBackend, GpuContext, GpuDrawBuffers, GpuDrawPacket, GpuError, GpuGeometry, GpuUpload,
};
pub use mesh::{Mesh, Vertex};
pub use recording::{DrawCall, RecordingBackend};
pub use software::{RasterStats, SoftwareBackend};
pub use texture::{TextureError, TextureImage};
pub use uniform::{LightUniform, LightsUniform, ObjectUniform, MAX_GPU_LIGHTS};
