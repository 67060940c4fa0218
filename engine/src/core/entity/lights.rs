//! Light registry and inverse-square illumination
//!
//! The registry is owned by the world and handed to entities by reference. An entity registers
//! when it is built with non-zero emission, keeps the returned [`LightHandle`], moves its record
//! when it moves and releases it when it is despawned.

use super::components::Emission;
use crate::core::coordinates::{BigVector3, NumericError};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Registration handle returned by [`LightRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LightHandle(u64);

/// One active light
#[derive(Debug, Clone, PartialEq)]
pub struct LightRecord {
    pub handle: LightHandle,
    pub position: BigVector3,
    pub color: Vec3,
    pub intensity: f32,
}

/// Light arriving at a point after falloff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedLight {
    /// Unit vector from the light towards the lit point
    pub direction: Vec3,
    pub color: Vec3,
    /// Attenuated intensity
    pub intensity: f32,
}

/// Lights reaching one point, plus the number dropped for being out of float range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Illumination {
    pub lights: Vec<ReceivedLight>,
    pub skipped: usize,
}

/// `intensity / distance²` for the big-space offset between a light and the lit point
///
/// The squared distance is the exact sum of squared components, narrowed to `f32` once. Only an
/// exactly zero offset fails with [`NumericError::DivisionByZero`]; a light that is merely close
/// gets a large but finite intensity. A squared distance beyond `f32` gives zero.
pub fn inverse_square(intensity: f32, offset: &BigVector3) -> Result<f32, NumericError> {
    if offset.is_zero() {
        return Err(NumericError::DivisionByZero);
    }
    Ok(intensity / offset.length_squared_f32())
}

/// Ordered set of active lights
#[derive(Debug, Default)]
pub struct LightRegistry {
    records: Vec<LightRecord>,
    next_handle: u64,
}

impl LightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a light at `position` and get its handle
    pub fn register(&mut self, position: BigVector3, emission: Emission) -> LightHandle {
        let handle = LightHandle(self.next_handle);
        self.next_handle += 1;
        debug!(
            ?handle,
            %position,
            intensity = emission.intensity,
            "Registered light"
        );
        self.records.push(LightRecord {
            handle,
            position,
            color: emission.color,
            intensity: emission.intensity,
        });
        handle
    }

    /// Remove a light, returning whether it was registered
    pub fn release(&mut self, handle: LightHandle) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.handle != handle);
        let removed = self.records.len() != before;
        if removed {
            debug!(?handle, remaining = self.records.len(), "Released light");
        } else {
            warn!(?handle, "Release of unknown light handle");
        }
        removed
    }

    /// Move a light to a new position, returning whether it was registered
    pub fn move_light(&mut self, handle: LightHandle, position: &BigVector3) -> bool {
        match self.records.iter_mut().find(|record| record.handle == handle) {
            Some(record) => {
                record.position.clone_from(position);
                true
            }
            None => false,
        }
    }

    /// Change color and intensity of a registered light
    pub fn set_emission(&mut self, handle: LightHandle, emission: Emission) -> bool {
        match self.records.iter_mut().find(|record| record.handle == handle) {
            Some(record) => {
                record.color = emission.color;
                record.intensity = emission.intensity;
                true
            }
            None => false,
        }
    }

    /// Look up a light
    pub fn get(&self, handle: LightHandle) -> Option<&LightRecord> {
        self.records.iter().find(|record| record.handle == handle)
    }

    /// True if `handle` is still registered
    pub fn contains(&self, handle: LightHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Lights in registration order
    pub fn iter(&self) -> impl Iterator<Item = &LightRecord> {
        self.records.iter()
    }

    /// Number of active lights
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no light is registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Light arriving at `target` from every registered light except `exclude`
    ///
    /// The offset from each light to the target is taken in big space. Lights whose narrowed
    /// offset has an infinite component are counted as skipped and contribute nothing. A light
    /// sitting exactly on the target fails with [`NumericError::DivisionByZero`].
    pub fn illuminate(
        &self,
        target: &BigVector3,
        exclude: Option<LightHandle>,
    ) -> Result<Illumination, NumericError> {
        let mut illumination = Illumination::default();

        for record in self.iter().filter(|record| Some(record.handle) != exclude) {
            let offset = target - &record.position;
            if !offset.to_float_vector().is_finite() {
                trace!(handle = ?record.handle, "Light out of float range, skipped");
                illumination.skipped += 1;
                continue;
            }

            let intensity = inverse_square(record.intensity, &offset)?;
            let direction = offset.to_double_vector().normalize_or_zero().as_vec3();

            illumination.lights.push(ReceivedLight {
                direction,
                color: record.color,
                intensity,
            });
        }

        Ok(illumination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: &str, y: &str, z: &str) -> BigVector3 {
        BigVector3::parse(x, y, z).unwrap()
    }

    #[test]
    fn test_register_and_release_preserve_order() {
        let mut registry = LightRegistry::new();
        let a = registry.register(v("0", "0", "0"), Emission::new(Vec3::X, 1.0));
        let b = registry.register(v("1", "0", "0"), Emission::new(Vec3::Y, 2.0));
        let c = registry.register(v("2", "0", "0"), Emission::new(Vec3::Z, 3.0));
        assert_eq!(registry.len(), 3);

        assert!(registry.release(b));
        assert!(!registry.release(b));
        let handles: Vec<_> = registry.iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![a, c]);
        assert!(!registry.contains(b));
    }

    #[test]
    fn test_handles_are_never_reused() {
        let mut registry = LightRegistry::new();
        let a = registry.register(BigVector3::zero(), Emission::new(Vec3::ONE, 1.0));
        registry.release(a);
        let b = registry.register(BigVector3::zero(), Emission::new(Vec3::ONE, 1.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_move_light() {
        let mut registry = LightRegistry::new();
        let a = registry.register(BigVector3::zero(), Emission::new(Vec3::ONE, 1.0));
        assert!(registry.move_light(a, &v("5", "5", "5")));
        assert_eq!(registry.get(a).unwrap().position, v("5", "5", "5"));
        registry.release(a);
        assert!(!registry.move_light(a, &BigVector3::zero()));
    }

    #[test]
    fn test_inverse_square_at_ten_units() {
        let mut registry = LightRegistry::new();
        registry.register(v("10", "0", "0"), Emission::new(Vec3::ONE, 100.0));

        let illumination = registry.illuminate(&BigVector3::zero(), None).unwrap();
        assert_eq!(illumination.lights.len(), 1);
        let light = illumination.lights[0];
        assert_eq!(light.intensity, 1.0);
        // Points from the light towards the target
        assert_eq!(light.direction, Vec3::NEG_X);
    }

    #[test]
    fn test_inverse_square_far_from_origin() {
        let far = format!("1{}", "0".repeat(40));
        let mut registry = LightRegistry::new();
        registry.register(v(&far, "0", "3"), Emission::new(Vec3::ONE, 100.0));

        let illumination = registry.illuminate(&v(&far, "4", "0"), None).unwrap();
        assert!((illumination.lights[0].intensity - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_squared_beyond_float_range_gives_zero() {
        // Offset fits in f32, its square does not
        let far = format!("1{}", "0".repeat(25));
        let mut registry = LightRegistry::new();
        registry.register(v(&far, "0", "0"), Emission::new(Vec3::ONE, 100.0));

        let illumination = registry.illuminate(&BigVector3::zero(), None).unwrap();
        assert_eq!(illumination.lights[0].intensity, 0.0);
        assert_eq!(illumination.lights[0].direction, Vec3::NEG_X);
    }

    #[test]
    fn test_offset_beyond_float_range_is_skipped() {
        let far = format!("1{}", "0".repeat(45));
        let mut registry = LightRegistry::new();
        registry.register(v(&far, "0", "0"), Emission::new(Vec3::ONE, 100.0));
        registry.register(v("0", "2", "0"), Emission::new(Vec3::ONE, 4.0));

        let illumination = registry.illuminate(&BigVector3::zero(), None).unwrap();
        assert_eq!(illumination.skipped, 1);
        assert_eq!(illumination.lights.len(), 1);
        assert_eq!(illumination.lights[0].intensity, 1.0);
        assert!(illumination.lights.iter().all(|l| !l.intensity.is_nan()));
    }

    #[test]
    fn test_coincident_light_is_division_by_zero() {
        let mut registry = LightRegistry::new();
        registry.register(v("7", "7", "7"), Emission::new(Vec3::ONE, 1.0));
        assert_eq!(
            registry.illuminate(&v("7", "7", "7"), None),
            Err(NumericError::DivisionByZero)
        );
    }

    #[test]
    fn test_close_light_is_not_coincident() {
        let mut registry = LightRegistry::new();
        registry.register(v("0.003", "0", "0"), Emission::new(Vec3::ONE, 1.0));

        let illumination = registry.illuminate(&BigVector3::zero(), None).unwrap();
        let light = illumination.lights[0];
        assert!(light.intensity.is_finite());
        assert!((light.intensity - 1.0 / 9e-6).abs() < 1.0);
        assert_eq!(light.direction, Vec3::NEG_X);
    }

    #[test]
    fn test_smallest_offset_still_lights() {
        let mut registry = LightRegistry::new();
        registry.register(v("5", "5", "5.00001"), Emission::new(Vec3::ONE, 1e-6));

        let illumination = registry.illuminate(&v("5", "5", "5"), None).unwrap();
        assert_eq!(illumination.lights.len(), 1);
        assert!(illumination.lights[0].intensity > 0.0);
        assert_eq!(illumination.lights[0].direction, Vec3::NEG_Z);
    }

    #[test]
    fn test_excluded_light_is_ignored() {
        let mut registry = LightRegistry::new();
        let own = registry.register(v("7", "7", "7"), Emission::new(Vec3::ONE, 1.0));
        let illumination = registry.illuminate(&v("7", "7", "7"), Some(own)).unwrap();
        assert!(illumination.lights.is_empty());
        assert_eq!(illumination.skipped, 0);
    }
}
