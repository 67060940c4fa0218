//! World context owning the camera, lights, backend and entities

use super::components::{ClipPlanes, Emission, EntityDescriptor};
use super::lights::LightRegistry;
use super::spatial::{DrawResources, SpatialEntity};
use crate::config::{ConfigError, WorldConfig};
use crate::core::camera::FloatingOriginCamera;
use crate::core::coordinates::{BigVector3, NumericError};
use crate::graphics::backend::{Backend, RenderBackend, ShaderHandle};
use crate::graphics::mesh::Mesh;
use crate::graphics::texture::TextureImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Stable identifier of a spawned entity; never reused within a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Errors from world-level operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error(transparent)]
    Numeric(#[from] NumericError),
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
}

/// Totals for one drawn frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub entities_drawn: usize,
    pub lights_applied: usize,
    pub lights_skipped: usize,
}

/// Gamma applied when none is configured
pub const DEFAULT_GAMMA: f32 = 2.2;

/// Scene context
///
/// Entities are kept in spawn order. Every frame all entities update before any entity draws,
/// so lighting always sees post-update positions.
pub struct World {
    camera: FloatingOriginCamera,
    lights: LightRegistry,
    backend: Backend,
    resources: DrawResources,
    entities: BTreeMap<EntityId, SpatialEntity>,
    next_id: u64,
    default_clip: ClipPlanes,
    gamma: f32,
}

impl World {
    /// Create an empty world, uploading the shared cube and default texture to `backend`
    pub fn new(camera: FloatingOriginCamera, mut backend: Backend) -> Self {
        let geometry = backend.submit_geometry(&Mesh::cube(1.0));
        let texture = backend.upload_texture(&TextureImage::checkerboard(
            64,
            8,
            [235, 235, 235, 255],
            [40, 90, 200, 255],
        ));
        info!(backend = ?backend.kind(), "World created");

        Self {
            camera,
            lights: LightRegistry::new(),
            backend,
            resources: DrawResources {
                geometry,
                shader: ShaderHandle::LIT_TEXTURED,
                texture: Some(texture),
            },
            entities: BTreeMap::new(),
            next_id: 0,
            default_clip: ClipPlanes::default(),
            gamma: DEFAULT_GAMMA,
        }
    }

    /// Compose a world from a validated configuration
    pub fn from_config(config: &WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let camera = config.camera();
        let backend = Backend::new(config.backend, config.resolution);
        let mut world = Self::new(camera, backend);
        world.gamma = config.gamma;
        world.default_clip = ClipPlanes::new(config.near, config.far);

        for descriptor in &config.entities {
            world.spawn(descriptor.clone());
        }
        info!(entities = world.len(), lights = world.lights.len(), "World populated from config");
        Ok(world)
    }

    /// Spawn an entity and get its id
    pub fn spawn(&mut self, descriptor: EntityDescriptor) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let entity =
            SpatialEntity::new(descriptor, self.default_clip, self.resources, &mut self.lights);
        debug!(
            %id,
            position = %entity.position(),
            light = ?entity.light_handle(),
            "Spawned entity"
        );
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity, releasing its light before anything else
    pub fn despawn(&mut self, id: EntityId) -> Result<(), WorldError> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(WorldError::UnknownEntity(id))?;
        entity.destroy(&mut self.lights);
        debug!(%id, "Despawned entity");
        Ok(())
    }

    /// Look up an entity
    pub fn entity(&self, id: EntityId) -> Option<&SpatialEntity> {
        self.entities.get(&id)
    }

    /// Look up an entity mutably
    ///
    /// Position and emission changes should go through [`World::set_entity_position`] and
    /// [`World::set_entity_emission`] so the light registry stays in step.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut SpatialEntity> {
        self.entities.get_mut(&id)
    }

    /// Teleport an entity to an exact world position
    pub fn set_entity_position(
        &mut self,
        id: EntityId,
        position: BigVector3,
    ) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::UnknownEntity(id))?;
        entity.set_position(position, &mut self.lights);
        Ok(())
    }

    /// Change an entity's emission, registering or releasing its light as needed
    pub fn set_entity_emission(
        &mut self,
        id: EntityId,
        emission: Emission,
    ) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::UnknownEntity(id))?;
        entity.set_emission(emission, &mut self.lights);
        Ok(())
    }

    /// Ids of all live entities in spawn order
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entity is alive
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn camera(&self) -> &FloatingOriginCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut FloatingOriginCamera {
        &mut self.camera
    }

    pub fn lights(&self) -> &LightRegistry {
        &self.lights
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut Backend {
        &mut self.backend
    }

    /// Shared geometry, shader and texture given to newly spawned entities
    pub fn resources(&self) -> DrawResources {
        self.resources
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn set_gamma(&mut self, gamma: f32) {
        self.gamma = gamma;
    }

    /// Clip planes used by entities spawned without their own
    pub fn default_clip(&self) -> ClipPlanes {
        self.default_clip
    }

    /// Update every entity by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) -> Result<(), WorldError> {
        for entity in self.entities.values_mut() {
            entity.update(delta_time, &mut self.lights)?;
        }
        Ok(())
    }

    /// Begin a backend frame and draw every entity
    ///
    /// Every entity's lighting is resolved before the first draw reaches the backend. If any
    /// entity fails, nothing is drawn and the backend is left with an empty frame.
    pub fn draw(&mut self) -> Result<FrameStats, WorldError> {
        self.backend.begin_frame();

        let prepared = self
            .entities
            .values_mut()
            .map(|entity| entity.prepare_draw(&self.camera, &self.lights))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = FrameStats::default();
        for (entity, prepared) in self.entities.values().zip(&prepared) {
            let report =
                entity.submit_draw(prepared.as_ref(), &self.camera, &mut self.backend, self.gamma);
            if report.drawn {
                stats.entities_drawn += 1;
            }
            stats.lights_applied += report.lights_applied;
            stats.lights_skipped += report.lights_skipped;
        }
        Ok(stats)
    }

    /// One full frame: all updates, then all draws
    pub fn frame(&mut self, delta_time: f32) -> Result<FrameStats, WorldError> {
        self.update(delta_time)?;
        self.draw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::backend::BackendKind;
    use glam::{UVec2, Vec3};

    fn v(x: &str, y: &str, z: &str) -> BigVector3 {
        BigVector3::parse(x, y, z).unwrap()
    }

    fn null_world() -> World {
        World::new(
            FloatingOriginCamera::default(),
            Backend::new(BackendKind::Null, UVec2::new(8, 8)),
        )
    }

    #[test]
    fn test_new_world_uploads_shared_resources() {
        let world = null_world();
        let recording = world.backend().as_recording().unwrap();
        assert_eq!(recording.geometry_count(), 1);
        assert_eq!(recording.texture_count(), 1);
        assert!(world.resources().texture.is_some());
    }

    #[test]
    fn test_ids_are_stable_and_ordered() {
        let mut world = null_world();
        let a = world.spawn(EntityDescriptor::default());
        let b = world.spawn(EntityDescriptor::default());
        world.despawn(a).unwrap();
        let c = world.spawn(EntityDescriptor::default());

        assert!(a < b && b < c);
        assert_eq!(world.entity_ids().collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(world.despawn(a), Err(WorldError::UnknownEntity(a)));
    }

    #[test]
    fn test_set_entity_position_moves_light() {
        let mut world = null_world();
        let lamp = world.spawn(EntityDescriptor::default().with_emission(Vec3::ONE, 1.0));
        world.set_entity_position(lamp, v("9", "9", "9")).unwrap();

        let handle = world.entity(lamp).unwrap().light_handle().unwrap();
        assert_eq!(world.lights().get(handle).unwrap().position, v("9", "9", "9"));
    }

    #[test]
    fn test_draw_counts_entities() {
        let mut world = null_world();
        world.spawn(EntityDescriptor::at(v("0", "0", "5")));
        world.spawn(EntityDescriptor::at(v("0", "0", "-5")).with_emission(Vec3::ONE, 50.0));

        let stats = world.frame(0.016).unwrap();
        assert_eq!(stats.entities_drawn, 2);
        assert_eq!(stats.lights_applied, 1);
        assert_eq!(stats.lights_skipped, 0);
        assert_eq!(world.backend().as_recording().unwrap().draws().len(), 2);
    }

    #[test]
    fn test_entity_emission_toggle() {
        let mut world = null_world();
        let id = world.spawn(EntityDescriptor::default());
        world
            .set_entity_emission(id, Emission::new(Vec3::ONE, 2.0))
            .unwrap();
        assert_eq!(world.lights().len(), 1);
        world.despawn(id).unwrap();
        assert!(world.lights().is_empty());
    }

    #[test]
    fn test_failed_draw_leaves_no_partial_frame() {
        let mut world = null_world();
        // Drawn before the failing entity
        world.spawn(EntityDescriptor::at(v("0", "0", "5")));
        world.spawn(EntityDescriptor::at(v("1", "1", "10")));
        let lamp = world.spawn(EntityDescriptor::at(v("0", "0", "20")).with_emission(Vec3::ONE, 1.0));

        assert_eq!(world.draw().unwrap().entities_drawn, 3);
        assert_eq!(world.backend().as_recording().unwrap().draws().len(), 3);

        world.set_entity_position(lamp, v("1", "1", "10")).unwrap();
        assert_eq!(
            world.draw(),
            Err(WorldError::Numeric(NumericError::DivisionByZero))
        );
        assert!(world.backend().as_recording().unwrap().draws().is_empty());
    }
}
