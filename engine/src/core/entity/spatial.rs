//! Spatial entities
//!
//! A [`SpatialEntity`] lives in big space: its position, velocity and acceleration are
//! [`BigVector3`]s integrated exactly every update. At draw time the position is expressed
//! relative to the floating-origin camera, and everything handed to the render backend is plain
//! single precision.

use super::components::{ClipPlanes, Emission, EntityDescriptor};
use super::lights::{Illumination, LightHandle, LightRegistry};
use crate::core::camera::FloatingOriginCamera;
use crate::core::coordinates::{BigVector3, FixedPointBig, NumericError};
use crate::graphics::backend::{
    uniforms, GeometryHandle, RenderBackend, ShaderHandle, TextureHandle,
};
use glam::{Mat4, Vec3};
use tracing::trace;

/// Backend resources an entity draws with; the world owns the resources themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawResources {
    pub geometry: GeometryHandle,
    pub shader: ShaderHandle,
    pub texture: Option<TextureHandle>,
}

/// What happened during one [`SpatialEntity::draw`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawReport {
    /// False when the camera-relative position does not fit in `f32`
    pub drawn: bool,
    pub lights_applied: usize,
    pub lights_skipped: usize,
}

/// Camera-relative placement and incoming light for one draw
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDraw {
    pub local_position: Vec3,
    pub illumination: Illumination,
}

/// An object with an exact big-space position that is drawn relative to the camera
#[derive(Debug)]
pub struct SpatialEntity {
    position: BigVector3,
    /// Units per second
    pub velocity: BigVector3,
    /// Units per second squared
    pub acceleration: BigVector3,
    /// Euler angles in radians
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Radians per second added to `rotation` each update
    pub angular_velocity: Vec3,
    pub clip: ClipPlanes,
    emission: Emission,
    light: Option<LightHandle>,
    resources: DrawResources,
    last_local_position: Option<Vec3>,
}

impl SpatialEntity {
    /// Build an entity, registering it as a light when its emission is non-zero
    pub fn new(
        descriptor: EntityDescriptor,
        default_clip: ClipPlanes,
        resources: DrawResources,
        registry: &mut LightRegistry,
    ) -> Self {
        let light = descriptor
            .emission
            .is_emissive()
            .then(|| registry.register(descriptor.position.clone(), descriptor.emission));

        Self {
            position: descriptor.position,
            velocity: descriptor.velocity,
            acceleration: descriptor.acceleration,
            rotation: descriptor.rotation,
            scale: descriptor.scale,
            angular_velocity: descriptor.angular_velocity,
            clip: descriptor.clip.unwrap_or(default_clip),
            emission: descriptor.emission,
            light,
            resources,
            last_local_position: None,
        }
    }

    /// Exact world position
    pub fn position(&self) -> &BigVector3 {
        &self.position
    }

    /// Move to an exact world position, keeping the light record in step
    pub fn set_position(&mut self, position: BigVector3, registry: &mut LightRegistry) {
        self.position = position;
        self.last_local_position = None;
        if let Some(handle) = self.light {
            registry.move_light(handle, &self.position);
        }
    }

    /// Current emission
    pub fn emission(&self) -> Emission {
        self.emission
    }

    /// Change emission, registering or releasing the light as the intensity crosses zero
    pub fn set_emission(&mut self, emission: Emission, registry: &mut LightRegistry) {
        self.emission = emission;
        match (self.light, emission.is_emissive()) {
            (Some(handle), true) => {
                registry.set_emission(handle, emission);
            }
            (Some(handle), false) => {
                registry.release(handle);
                self.light = None;
            }
            (None, true) => {
                self.light = Some(registry.register(self.position.clone(), emission));
            }
            (None, false) => {}
        }
    }

    /// Registry handle, present iff emission intensity is non-zero
    pub fn light_handle(&self) -> Option<LightHandle> {
        self.light
    }

    /// Backend resources this entity draws with
    pub fn resources(&self) -> DrawResources {
        self.resources
    }

    /// Swap the texture used for subsequent draws
    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        self.resources.texture = texture;
    }

    /// Camera-relative position computed by the most recent draw, cleared by movement
    pub fn last_local_position(&self) -> Option<Vec3> {
        self.last_local_position
    }

    /// Advance motion and spin by `delta_time` seconds
    ///
    /// Position integrates with the velocity from before this step, then velocity integrates
    /// acceleration. Both happen in big space; `delta_time` must be finite.
    pub fn update(
        &mut self,
        delta_time: f32,
        registry: &mut LightRegistry,
    ) -> Result<(), NumericError> {
        let dt = FixedPointBig::from_f32(delta_time)?;
        self.last_local_position = None;

        let moved = !self.velocity.is_zero();
        if moved {
            self.position += &self.velocity * &dt;
        }
        if !self.acceleration.is_zero() {
            self.velocity += &self.acceleration * &dt;
        }
        self.rotation += self.angular_velocity * delta_time;

        if moved {
            if let Some(handle) = self.light {
                registry.move_light(handle, &self.position);
            }
        }
        Ok(())
    }

    /// Model matrix for a camera-relative position: translate, rotate X, Y, Z, then scale
    pub fn model_matrix(&self, local_position: Vec3) -> Mat4 {
        Mat4::from_translation(local_position)
            * Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z)
            * Mat4::from_scale(self.scale)
    }

    /// Issue this entity's draw
    ///
    /// Lighting is resolved before anything reaches the backend, so a coincident light fails the
    /// draw with [`NumericError::DivisionByZero`] without leaving half-bound state behind. An
    /// entity whose camera-relative position overflows `f32` is not drawn.
    pub fn draw(
        &mut self,
        camera: &FloatingOriginCamera,
        registry: &LightRegistry,
        backend: &mut impl RenderBackend,
        gamma: f32,
    ) -> Result<DrawReport, NumericError> {
        let prepared = self.prepare_draw(camera, registry)?;
        Ok(self.submit_draw(prepared.as_ref(), camera, backend, gamma))
    }

    /// Resolve the camera-relative position and incoming light without touching a backend
    ///
    /// Returns `None` when the camera-relative position overflows `f32`.
    pub fn prepare_draw(
        &mut self,
        camera: &FloatingOriginCamera,
        registry: &LightRegistry,
    ) -> Result<Option<PreparedDraw>, NumericError> {
        let local = camera.convert_to_local(&self.position);
        self.last_local_position = Some(local);
        if !local.is_finite() {
            trace!(position = %self.position, "Entity beyond float range, not drawn");
            return Ok(None);
        }

        let illumination = registry.illuminate(&self.position, self.light)?;
        Ok(Some(PreparedDraw {
            local_position: local,
            illumination,
        }))
    }

    /// Hand a prepared draw to the backend; `None` reports the entity as not drawn
    pub fn submit_draw(
        &self,
        prepared: Option<&PreparedDraw>,
        camera: &FloatingOriginCamera,
        backend: &mut impl RenderBackend,
        gamma: f32,
    ) -> DrawReport {
        let Some(prepared) = prepared else {
            return DrawReport::default();
        };
        let lights = &prepared.illumination.lights;

        backend.bind_shader(self.resources.shader);
        backend.set_matrix(uniforms::MODEL, self.model_matrix(prepared.local_position));
        backend.set_matrix(uniforms::VIEW, camera.view_matrix());
        backend.set_matrix(
            uniforms::PROJECTION,
            camera.projection_matrix(self.clip.near, self.clip.far),
        );
        backend.set_scalar(uniforms::CULL_RADIUS, self.clip.near_cull_radius());
        backend.set_scalar(uniforms::GAMMA, gamma);
        backend.set_vec3(uniforms::EMISSION_COLOR, self.emission.color);
        backend.set_scalar(uniforms::EMISSION_INTENSITY, self.emission.intensity);

        for (i, light) in lights.iter().enumerate() {
            backend.set_vec3(&uniforms::light_direction(i), light.direction);
            backend.set_vec3(&uniforms::light_color(i), light.color);
            backend.set_scalar(&uniforms::light_intensity(i), light.intensity);
        }
        backend.set_int(uniforms::LIGHT_COUNT, lights.len() as i32);

        if let Some(texture) = self.resources.texture {
            backend.bind_texture(texture);
        }
        backend.finalize_draw(self.resources.geometry);

        DrawReport {
            drawn: true,
            lights_applied: lights.len(),
            lights_skipped: prepared.illumination.skipped,
        }
    }

    /// Tear the entity down, releasing its light first
    pub fn destroy(self, registry: &mut LightRegistry) {
        if let Some(handle) = self.light {
            registry.release(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::mesh::Mesh;
    use crate::graphics::recording::RecordingBackend;
    use glam::Vec2;

    fn v(x: &str, y: &str, z: &str) -> BigVector3 {
        BigVector3::parse(x, y, z).unwrap()
    }

    fn setup() -> (RecordingBackend, DrawResources, LightRegistry) {
        let mut backend = RecordingBackend::new();
        let geometry = backend.submit_geometry(&Mesh::cube(1.0));
        let resources = DrawResources {
            geometry,
            shader: ShaderHandle::LIT_TEXTURED,
            texture: None,
        };
        (backend, resources, LightRegistry::new())
    }

    fn spawn(
        desc: EntityDescriptor,
        resources: DrawResources,
        registry: &mut LightRegistry,
    ) -> SpatialEntity {
        SpatialEntity::new(desc, ClipPlanes::default(), resources, registry)
    }

    #[test]
    fn test_only_emissive_entities_register() {
        let (_, resources, mut registry) = setup();
        let plain = spawn(EntityDescriptor::default(), resources, &mut registry);
        let lamp = spawn(
            EntityDescriptor::default().with_emission(Vec3::ONE, 5.0),
            resources,
            &mut registry,
        );
        assert!(plain.light_handle().is_none());
        assert!(lamp.light_handle().is_some());
        assert_eq!(registry.len(), 1);

        lamp.destroy(&mut registry);
        assert!(registry.is_empty());
        plain.destroy(&mut registry);
    }

    #[test]
    fn test_update_integrates_position_then_velocity() {
        let (_, resources, mut registry) = setup();
        let mut entity = spawn(
            EntityDescriptor::at(v("1000000000000000000000", "0", "0"))
                .with_velocity(v("2", "0", "0"))
                .with_acceleration(v("0", "10", "0")),
            resources,
            &mut registry,
        );

        entity.update(0.5, &mut registry).unwrap();
        assert_eq!(entity.position(), &v("1000000000000000000001", "0", "0"));
        assert_eq!(entity.velocity, v("2", "5", "0"));

        entity.update(0.5, &mut registry).unwrap();
        assert_eq!(entity.position(), &v("1000000000000000000002", "2.5", "0"));
        assert_eq!(entity.velocity, v("2", "10", "0"));
    }

    #[test]
    fn test_update_spins_by_default() {
        let (_, resources, mut registry) = setup();
        let mut entity = spawn(EntityDescriptor::default(), resources, &mut registry);
        entity.update(0.25, &mut registry).unwrap();
        assert_eq!(entity.rotation, Vec3::splat(-0.25));

        let mut still = spawn(
            EntityDescriptor::default().with_spin(Vec3::ZERO),
            resources,
            &mut registry,
        );
        still.update(0.25, &mut registry).unwrap();
        assert_eq!(still.rotation, Vec3::ZERO);
    }

    #[test]
    fn test_update_rejects_non_finite_delta() {
        let (_, resources, mut registry) = setup();
        let mut entity = spawn(EntityDescriptor::default(), resources, &mut registry);
        assert!(matches!(
            entity.update(f32::NAN, &mut registry),
            Err(NumericError::NonFinite(_))
        ));
    }

    #[test]
    fn test_moving_light_follows_entity() {
        let (_, resources, mut registry) = setup();
        let mut lamp = spawn(
            EntityDescriptor::default()
                .with_velocity(v("1", "0", "0"))
                .with_emission(Vec3::ONE, 1.0),
            resources,
            &mut registry,
        );
        lamp.update(3.0, &mut registry).unwrap();
        let handle = lamp.light_handle().unwrap();
        assert_eq!(registry.get(handle).unwrap().position, v("3", "0", "0"));
    }

    #[test]
    fn test_set_emission_keeps_registry_in_step() {
        let (_, resources, mut registry) = setup();
        let mut entity = spawn(EntityDescriptor::default(), resources, &mut registry);

        entity.set_emission(Emission::new(Vec3::X, 2.0), &mut registry);
        assert_eq!(registry.len(), 1);
        let handle = entity.light_handle().unwrap();
        assert_eq!(registry.get(handle).unwrap().intensity, 2.0);

        entity.set_emission(Emission::none(), &mut registry);
        assert!(registry.is_empty());
        assert!(entity.light_handle().is_none());
    }

    #[test]
    fn test_draw_sends_camera_relative_model_matrix() {
        let (mut backend, resources, mut registry) = setup();
        let far = "1000000000000000000000000000000";
        let camera =
            FloatingOriginCamera::new(Vec2::new(800.0, 600.0), v(far, "0", "-2"));
        let mut entity = spawn(
            EntityDescriptor::at(v(far, "0", "0")).with_spin(Vec3::ZERO),
            resources,
            &mut registry,
        );

        let report = entity.draw(&camera, &registry, &mut backend, 2.2).unwrap();
        assert!(report.drawn);
        assert_eq!(entity.last_local_position(), Some(Vec3::new(0.0, 0.0, -2.0)));

        let draw = &backend.draws()[0];
        assert_eq!(
            draw.matrix(uniforms::MODEL),
            Some(Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)))
        );
        assert_eq!(draw.matrix(uniforms::VIEW), Some(camera.view_matrix()));
        assert_eq!(
            draw.matrix(uniforms::PROJECTION),
            Some(camera.projection_matrix(0.1, 10_000.0))
        );
        assert_eq!(draw.scalar(uniforms::CULL_RADIUS), Some(0.0));
        assert_eq!(draw.scalar(uniforms::GAMMA), Some(2.2));
        assert_eq!(draw.light_count(), 0);
        assert_eq!(draw.geometry, resources.geometry);
    }

    #[test]
    fn test_draw_excludes_own_light_and_sends_others() {
        let (mut backend, resources, mut registry) = setup();
        let camera = FloatingOriginCamera::default();
        let mut lamp = spawn(
            EntityDescriptor::at(v("0", "0", "0")).with_emission(Vec3::new(1.0, 0.5, 0.0), 3.0),
            resources,
            &mut registry,
        );
        let _other = spawn(
            EntityDescriptor::at(v("0", "0", "10")).with_emission(Vec3::ONE, 100.0),
            resources,
            &mut registry,
        );

        let report = lamp.draw(&camera, &registry, &mut backend, 1.0).unwrap();
        assert_eq!(report.lights_applied, 1);

        let draw = &backend.draws()[0];
        assert_eq!(draw.vec3(uniforms::EMISSION_COLOR), Some(Vec3::new(1.0, 0.5, 0.0)));
        assert_eq!(draw.scalar(uniforms::EMISSION_INTENSITY), Some(3.0));
        assert_eq!(draw.light_count(), 1);
        assert_eq!(draw.light(0), Some((Vec3::NEG_Z, Vec3::ONE, 1.0)));
    }

    #[test]
    fn test_draw_with_coincident_light_fails_cleanly() {
        let (mut backend, resources, mut registry) = setup();
        let camera = FloatingOriginCamera::default();
        let mut cube = spawn(EntityDescriptor::at(v("4", "4", "4")), resources, &mut registry);
        let _lamp = spawn(
            EntityDescriptor::at(v("4", "4", "4")).with_emission(Vec3::ONE, 1.0),
            resources,
            &mut registry,
        );

        assert_eq!(
            cube.draw(&camera, &registry, &mut backend, 2.2),
            Err(NumericError::DivisionByZero)
        );
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn test_near_plane_controls_cull_radius() {
        let (mut backend, resources, mut registry) = setup();
        let camera = FloatingOriginCamera::default();
        let mut entity = spawn(
            EntityDescriptor::at(v("0", "0", "5")).with_clip_planes(1.0, 1000.0),
            resources,
            &mut registry,
        );
        entity.draw(&camera, &registry, &mut backend, 2.2).unwrap();
        assert_eq!(backend.draws()[0].scalar(uniforms::CULL_RADIUS), Some(100.0));
    }

    #[test]
    fn test_entity_beyond_float_range_is_not_drawn() {
        let (mut backend, resources, mut registry) = setup();
        let camera = FloatingOriginCamera::default();
        let beyond = format!("1{}", "0".repeat(45));
        let mut entity = spawn(EntityDescriptor::at(v(&beyond, "0", "0")), resources, &mut registry);

        let report = entity.draw(&camera, &registry, &mut backend, 2.2).unwrap();
        assert!(!report.drawn);
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn test_model_matrix_order() {
        let (_, resources, mut registry) = setup();
        let entity = spawn(
            EntityDescriptor::default()
                .with_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0))
                .with_scale(Vec3::splat(2.0)),
            resources,
            &mut registry,
        );
        let model = entity.model_matrix(Vec3::new(1.0, 0.0, 0.0));
        // Scale first, then rotate +X onto -Z, then translate
        let p = model.transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 0.0, -2.0)).length() < 1e-5);
    }
}
