//! Floating-origin rendering core
//!
//! This crate places objects at arbitrarily large coordinates without the precision collapse of
//! `f32`/`f64` far from the origin. Positions are unbounded fixed-point decimals; the camera sits
//! at the rendering origin and everything else is expressed relative to it before narrowing to
//! single precision for the render backend.

pub mod config;
pub mod core;
pub mod graphics;

// Re-export commonly used types
pub mod prelude {
    // Big-number coordinates
    pub use crate::core::coordinates::{
        BigVector2, BigVector3, FixedPointBig, NumericError, SCALE, SCALE_DIGITS,
    };

    // Camera types
    pub use crate::core::camera::FloatingOriginCamera;

    // Entity system types
    pub use crate::core::entity::{
        ClipPlanes, Emission, EntityDescriptor, EntityId, FrameStats, LightHandle, LightRegistry,
        SpatialEntity, World, WorldError,
    };

    // Graphics types
    pub use crate::graphics::{
        Backend, BackendKind, GeometryHandle, Mesh, RenderBackend, ShaderHandle, TextureHandle,
        TextureImage, Vertex,
    };

    // Config types
    pub use crate::config::{CameraConfig, ConfigError, WorldConfig};

    // Math types
    pub use glam::{Mat4, UVec2, Vec2, Vec3};
}

/// Initialize logging for the engine
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wgpu_core=warn,wgpu_hal=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
