//! Spatial entities and the world that owns them
//!
//! Entities keep exact big-space positions and are drawn relative to the floating-origin camera.
//! Emissive entities are registered in the world's [`LightRegistry`] and light every other
//! entity with inverse-square falloff.

pub mod components;
pub mod lights;
pub mod spatial;
pub mod world;

// Re-export commonly used types
pub use components::{ClipPlanes, Emission, EntityDescriptor};
pub use lights::{
    inverse_square, Illumination, LightHandle, LightRecord, LightRegistry, ReceivedLight,
};
pub use spatial::{DrawReport, DrawResources, PreparedDraw, SpatialEntity};
pub use world::{EntityId, FrameStats, World, WorldError};
