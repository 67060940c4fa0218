//! Arbitrary-precision world coordinates
//!
//! Positions far from the origin lose precision in `f32` and eventually in `f64`. Coordinates
//! here are stored as unbounded fixed-point decimals instead:
//! - [`FixedPointBig`] for scalars, with [`SCALE_DIGITS`] fractional digits
//! - [`BigVector3`] for world positions, velocities and accelerations
//!
//! Narrowing to GPU-friendly floats only happens after subtracting the camera position in big
//! space, so nearby objects stay exact no matter how far both are from the origin.

pub mod big_vector;
pub mod error;
pub mod fixed_point;


pub use big_vector::{BigVector2, BigVector3};
pub use error::NumericError;
pub use fixed_point::{FixedPointBig, SCALE, SCALE_DIGITS};
