//! Floating-origin camera
//!
//! The camera owns the observer's true position in big space but is always rendered at the float
//! origin. Every other position is expressed relative to it by subtracting in big space first and
//! only then narrowing, which keeps nearby geometry exact at any distance from the world origin.

use crate::core::coordinates::{BigVector3, FixedPointBig, NumericError};
use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Camera whose rendered position is always the float zero vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingOriginCamera {
    /// True world position, potentially astronomically large
    pub position: BigVector3,
    /// Rotation around the vertical axis, in degrees
    pub yaw: f32,
    /// Rotation around the horizontal axis, in degrees
    pub pitch: f32,
    /// Rotation around the view axis, in degrees
    pub roll: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Viewport resolution in pixels
    pub resolution: Vec2,
}

impl Default for FloatingOriginCamera {
    fn default() -> Self {
        Self::new(Vec2::new(800.0, 600.0), BigVector3::zero())
    }
}

impl FloatingOriginCamera {
    /// Create a camera at `position` looking down +Z with a 90 degree field of view
    pub fn new(resolution: Vec2, position: BigVector3) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov: 90.0,
            resolution,
        }
    }

    /// Set the field of view in degrees
    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    /// Express a world position relative to the camera, in float precision
    ///
    /// The difference is taken in big space before narrowing. Components that do not fit in `f32`
    /// come back as signed infinity and must be checked by the caller.
    pub fn convert_to_local(&self, world_position: &BigVector3) -> Vec3 {
        (&self.position - world_position).to_float_vector()
    }

    /// The camera's own rendered position, which is always the origin
    pub fn rendered_position(&self) -> Vec3 {
        Vec3::ZERO
    }

    /// Unit vector pointing where the camera looks
    pub fn forward_vector(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        Vec3::new(pitch.cos() * yaw.sin(), -pitch.sin(), pitch.cos() * yaw.cos()).normalize()
    }

    /// Unit vector pointing to the camera's right, always horizontal
    pub fn right_vector(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        Vec3::new(-yaw.cos(), 0.0, yaw.sin()).normalize()
    }

    /// Unit vector pointing down relative to the camera
    pub fn down_vector(&self) -> Vec3 {
        self.right_vector()
            .cross(self.forward_vector())
            .normalize()
    }

    /// View matrix: rotation only, since the camera sits at the rendering origin
    pub fn view_matrix(&self) -> Mat4 {
        let pitch = Mat4::from_rotation_x((-self.pitch).to_radians());
        let yaw = Mat4::from_rotation_y((-self.yaw).to_radians());
        let roll = Mat4::from_rotation_z((-self.roll).to_radians());
        roll * pitch * yaw
    }

    /// Perspective projection for the given clip planes
    ///
    /// Invalid field of view or resolution produce a degenerate matrix rather than an error.
    pub fn projection_matrix(&self, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect_ratio(), near, far)
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f32 {
        self.resolution.x / self.resolution.y
    }

    /// Update the viewport resolution (useful when the window resizes)
    pub fn set_resolution(&mut self, resolution: Vec2) {
        self.resolution = resolution;
    }

    /// Move the camera by a float offset expressed in world axes
    pub fn translate(&mut self, offset: Vec3) -> Result<(), NumericError> {
        self.position += BigVector3::from_vec3(offset)?;
        Ok(())
    }

    /// Move along the camera's own axes; positive `up` moves against [`Self::down_vector`]
    pub fn fly(&mut self, forward: f32, right: f32, up: f32) -> Result<(), NumericError> {
        let offset =
            self.forward_vector() * forward + self.right_vector() * right - self.down_vector() * up;
        trace!(?offset, "Camera fly");
        self.translate(offset)
    }

    /// Turn the camera by yaw and pitch deltas in degrees
    pub fn look(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch += delta_pitch;
    }

    /// Move the camera to an exact big-space position
    pub fn set_position(&mut self, position: BigVector3) {
        self.position = position;
    }

    /// Exact big-space offset from the camera to a world position
    pub fn offset_to(&self, world_position: &BigVector3) -> BigVector3 {
        world_position - &self.position
    }

    /// Squared distance to a world position, computed in big space
    pub fn distance_squared_to(&self, world_position: &BigVector3) -> FixedPointBig {
        self.offset_to(world_position).length_squared()
    }
}
