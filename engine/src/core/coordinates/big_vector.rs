//! Vectors of arbitrary-precision fixed-point components
//!
//! [`BigVector3`] carries world positions, velocities and accelerations without any magnitude
//! limit. Narrowing to `Vec3`/`DVec3` happens per component, so a narrowed vector may mix finite
//! and infinite components and callers must check before using it.

use super::error::NumericError;
use super::fixed_point::{FixedPointBig, SCALE};
use glam::{DVec2, DVec3, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Three-component vector of [`FixedPointBig`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BigVector3 {
    /// X component
    pub x: FixedPointBig,
    /// Y component
    pub y: FixedPointBig,
    /// Z component
    pub z: FixedPointBig,
}

impl BigVector3 {
    /// Create a vector from three components
    pub fn new(x: FixedPointBig, y: FixedPointBig, z: FixedPointBig) -> Self {
        Self { x, y, z }
    }

    /// The zero vector
    pub fn zero() -> Self {
        Self::default()
    }

    /// A vector with all three components set to `value`
    pub fn splat(value: FixedPointBig) -> Self {
        Self {
            x: value.clone(),
            y: value.clone(),
            z: value,
        }
    }

    /// Parse three decimal literals
    pub fn parse(x: &str, y: &str, z: &str) -> Result<Self, NumericError> {
        Ok(Self::new(x.parse()?, y.parse()?, z.parse()?))
    }

    /// Convert a single-precision vector, truncating each component below the fixed scale
    pub fn from_vec3(v: Vec3) -> Result<Self, NumericError> {
        Ok(Self::new(
            FixedPointBig::from_f32(v.x)?,
            FixedPointBig::from_f32(v.y)?,
            FixedPointBig::from_f32(v.z)?,
        ))
    }

    /// Convert a double-precision vector, truncating each component below the fixed scale
    pub fn from_dvec3(v: DVec3) -> Result<Self, NumericError> {
        Ok(Self::new(
            FixedPointBig::from_f64(v.x)?,
            FixedPointBig::from_f64(v.y)?,
            FixedPointBig::from_f64(v.z)?,
        ))
    }

    /// True iff all three components are exactly zero
    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero() && self.z.is_zero()
    }

    /// Componentwise division by another vector
    pub fn divide(&self, rhs: &BigVector3) -> Result<BigVector3, NumericError> {
        Ok(BigVector3::new(
            self.x.divide(&rhs.x)?,
            self.y.divide(&rhs.y)?,
            self.z.divide(&rhs.z)?,
        ))
    }

    /// Divide every component by a scalar
    pub fn divide_scalar(&self, rhs: &FixedPointBig) -> Result<BigVector3, NumericError> {
        Ok(BigVector3::new(
            self.x.divide(rhs)?,
            self.y.divide(rhs)?,
            self.z.divide(rhs)?,
        ))
    }

    /// In-place componentwise division
    pub fn divide_assign(&mut self, rhs: &BigVector3) -> Result<(), NumericError> {
        *self = self.divide(rhs)?;
        Ok(())
    }

    /// In-place division by a scalar
    pub fn divide_scalar_assign(&mut self, rhs: &FixedPointBig) -> Result<(), NumericError> {
        *self = self.divide_scalar(rhs)?;
        Ok(())
    }

    /// Dot product, computed with the truncating fixed-point multiply
    pub fn dot(&self, rhs: &BigVector3) -> FixedPointBig {
        &self.x * &rhs.x + &self.y * &rhs.y + &self.z * &rhs.z
    }

    /// Squared length in big space; never overflows
    pub fn length_squared(&self) -> FixedPointBig {
        self.dot(self)
    }

    /// Squared length narrowed to `f32` from the exact sum of squared raw components
    ///
    /// Unlike [`BigVector3::length_squared`] nothing is truncated before narrowing, so every
    /// non-zero vector gives a positive result however short it is. Lengths beyond `f32` give
    /// infinity.
    pub fn length_squared_f32(&self) -> f32 {
        let sum = self.x.raw() * self.x.raw()
            + self.y.raw() * self.y.raw()
            + self.z.raw() * self.z.raw();
        // The sum carries the scale twice
        (FixedPointBig::from_raw(sum).to_f64() / SCALE as f64) as f32
    }

    /// Narrow every component to `f32` (out-of-range components become signed infinity)
    pub fn to_float_vector(&self) -> Vec3 {
        Vec3::new(self.x.to_f32(), self.y.to_f32(), self.z.to_f32())
    }

    /// Narrow every component to `f64` (out-of-range components become signed infinity)
    pub fn to_double_vector(&self) -> DVec3 {
        DVec3::new(self.x.to_f64(), self.y.to_f64(), self.z.to_f64())
    }
}

impl fmt::Display for BigVector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Neg for &BigVector3 {
    type Output = BigVector3;

    fn neg(self) -> Self::Output {
        BigVector3::new(-&self.x, -&self.y, -&self.z)
    }
}

impl Neg for BigVector3 {
    type Output = BigVector3;

    fn neg(self) -> Self::Output {
        -&self
    }
}

macro_rules! impl_vector_ops {
    ($($imp:ident, $method:ident, $assign_imp:ident, $assign_method:ident);* $(;)?) => {
        $(
            impl $imp<&BigVector3> for &BigVector3 {
                type Output = BigVector3;

                fn $method(self, rhs: &BigVector3) -> Self::Output {
                    BigVector3::new(
                        (&self.x).$method(&rhs.x),
                        (&self.y).$method(&rhs.y),
                        (&self.z).$method(&rhs.z),
                    )
                }
            }

            impl $imp<&FixedPointBig> for &BigVector3 {
                type Output = BigVector3;

                fn $method(self, rhs: &FixedPointBig) -> Self::Output {
                    BigVector3::new(
                        (&self.x).$method(rhs),
                        (&self.y).$method(rhs),
                        (&self.z).$method(rhs),
                    )
                }
            }

            impl $imp<BigVector3> for BigVector3 {
                type Output = BigVector3;

                fn $method(self, rhs: BigVector3) -> Self::Output {
                    (&self).$method(&rhs)
                }
            }

            impl $imp<&BigVector3> for BigVector3 {
                type Output = BigVector3;

                fn $method(self, rhs: &BigVector3) -> Self::Output {
                    (&self).$method(rhs)
                }
            }

            impl $imp<FixedPointBig> for BigVector3 {
                type Output = BigVector3;

                fn $method(self, rhs: FixedPointBig) -> Self::Output {
                    (&self).$method(&rhs)
                }
            }

            impl $imp<&FixedPointBig> for BigVector3 {
                type Output = BigVector3;

                fn $method(self, rhs: &FixedPointBig) -> Self::Output {
                    (&self).$method(rhs)
                }
            }

            impl $assign_imp<&BigVector3> for BigVector3 {
                fn $assign_method(&mut self, rhs: &BigVector3) {
                    *self = (&*self).$method(rhs);
                }
            }

            impl $assign_imp<BigVector3> for BigVector3 {
                fn $assign_method(&mut self, rhs: BigVector3) {
                    *self = (&*self).$method(&rhs);
                }
            }

            impl $assign_imp<&FixedPointBig> for BigVector3 {
                fn $assign_method(&mut self, rhs: &FixedPointBig) {
                    *self = (&*self).$method(rhs);
                }
            }

            impl $assign_imp<FixedPointBig> for BigVector3 {
                fn $assign_method(&mut self, rhs: FixedPointBig) {
                    *self = (&*self).$method(&rhs);
                }
            }
        )*
    };
}

impl_vector_ops! {
    Add, add, AddAssign, add_assign;
    Sub, sub, SubAssign, sub_assign;
    Mul, mul, MulAssign, mul_assign;
}

/// Two-component vector of [`FixedPointBig`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BigVector2 {
    /// X component
    pub x: FixedPointBig,
    /// Y component
    pub y: FixedPointBig,
}

impl BigVector2 {
    /// Create a vector from two components
    pub fn new(x: FixedPointBig, y: FixedPointBig) -> Self {
        Self { x, y }
    }

    /// Convert a single-precision vector
    pub fn from_vec2(v: Vec2) -> Result<Self, NumericError> {
        Ok(Self::new(
            FixedPointBig::from_f32(v.x)?,
            FixedPointBig::from_f32(v.y)?,
        ))
    }

    /// True iff both components are exactly zero
    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    /// Narrow both components to `f32`
    pub fn to_float_vector(&self) -> Vec2 {
        Vec2::new(self.x.to_f32(), self.y.to_f32())
    }

    /// Narrow both components to `f64`
    pub fn to_double_vector(&self) -> DVec2 {
        DVec2::new(self.x.to_f64(), self.y.to_f64())
    }
}

impl Add<&BigVector2> for &BigVector2 {
    type Output = BigVector2;

    fn add(self, rhs: &BigVector2) -> Self::Output {
        BigVector2::new(&self.x + &rhs.x, &self.y + &rhs.y)
    }
}

impl Sub<&BigVector2> for &BigVector2 {
    type Output = BigVector2;

    fn sub(self, rhs: &BigVector2) -> Self::Output {
        BigVector2::new(&self.x - &rhs.x, &self.y - &rhs.y)
    }
}

impl AddAssign<&BigVector2> for BigVector2 {
    fn add_assign(&mut self, rhs: &BigVector2) {
        *self = &*self + rhs;
    }
}

impl SubAssign<&BigVector2> for BigVector2 {
    fn sub_assign(&mut self, rhs: &BigVector2) {
        *self = &*self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> FixedPointBig {
        s.parse().unwrap()
    }

    fn v(x: &str, y: &str, z: &str) -> BigVector3 {
        BigVector3::parse(x, y, z).unwrap()
    }

    #[test]
    fn test_componentwise_vector_ops() {
        let a = v("1", "2", "3");
        let b = v("0.5", "-1", "4");
        assert_eq!(&a + &b, v("1.5", "1", "7"));
        assert_eq!(&a - &b, v("0.5", "3", "-1"));
        assert_eq!(&a * &b, v("0.5", "-2", "12"));
        assert_eq!(a.divide(&b).unwrap(), v("2", "-2", "0.75"));
    }

    #[test]
    fn test_scalar_ops() {
        let a = v("1", "-2", "3");
        let two = fp("2");
        assert_eq!(&a * &two, v("2", "-4", "6"));
        assert_eq!(&a + &two, v("3", "0", "5"));
        assert_eq!(&a - &two, v("-1", "-4", "1"));
        assert_eq!(a.divide_scalar(&two).unwrap(), v("0.5", "-1", "1.5"));
    }

    #[test]
    fn test_in_place_ops_match_non_mutating() {
        let a = v("1.25", "2", "-3");
        let b = v("2", "0.5", "1");

        let mut c = a.clone();
        c += &b;
        assert_eq!(c, &a + &b);

        let mut c = a.clone();
        c -= b.clone();
        assert_eq!(c, &a - &b);

        let mut c = a.clone();
        c *= &fp("3");
        assert_eq!(c, &a * &fp("3"));

        let mut c = a.clone();
        c.divide_assign(&b).unwrap();
        assert_eq!(c, a.divide(&b).unwrap());
    }

    #[test]
    fn test_division_by_zero_component_fails() {
        let a = v("1", "1", "1");
        let b = v("1", "0", "1");
        assert_eq!(a.divide(&b), Err(NumericError::DivisionByZero));
        assert_eq!(
            a.divide_scalar(&FixedPointBig::zero()),
            Err(NumericError::DivisionByZero)
        );

        let mut c = a.clone();
        assert!(c.divide_scalar_assign(&FixedPointBig::zero()).is_err());
        assert_eq!(c, a);
    }

    #[test]
    fn test_is_zero_is_exact() {
        assert!(BigVector3::zero().is_zero());
        assert!(BigVector3::splat(FixedPointBig::zero()).is_zero());
        assert!(!v("0", "0", "0.00001").is_zero());
    }

    #[test]
    fn test_velocity_becomes_non_zero_after_acceleration() {
        let mut velocity = BigVector3::zero();
        let acceleration = v("0", "-9.81", "0");
        velocity += &acceleration * &fp("1.0");
        assert!(!velocity.is_zero());
    }

    #[test]
    fn test_length_squared() {
        assert_eq!(v("3", "4", "0").length_squared(), fp("25"));
        let big = format!("1{}", "0".repeat(30));
        let expected = format!("1{}", "0".repeat(60));
        assert_eq!(v(&big, "0", "0").length_squared(), fp(&expected));
    }

    #[test]
    fn test_length_squared_f32_keeps_short_offsets() {
        // 0.003² truncates to zero in fixed point but not in the exact sum
        let short = v("0.003", "0", "0");
        assert!(short.length_squared().is_zero());
        assert!((short.length_squared_f32() - 9e-6).abs() < 1e-11);

        let smallest = v("0", "0", "0.00001");
        assert!(smallest.length_squared_f32() > 0.0);
        assert_eq!(BigVector3::zero().length_squared_f32(), 0.0);

        assert_eq!(v("3", "4", "0").length_squared_f32(), 25.0);
        let far = format!("1{}", "0".repeat(25));
        assert_eq!(v(&far, "0", "0").length_squared_f32(), f32::INFINITY);
    }

    #[test]
    fn test_narrowing_is_per_component() {
        let huge = format!("1{}", "0".repeat(40));
        let mixed = v("1.5", &huge, &format!("-{huge}"));
        let narrowed = mixed.to_float_vector();
        assert_eq!(narrowed.x, 1.5);
        assert_eq!(narrowed.y, f32::INFINITY);
        assert_eq!(narrowed.z, f32::NEG_INFINITY);

        let wide = mixed.to_double_vector();
        assert!(wide.is_finite());
    }

    #[test]
    fn test_from_float_vectors() {
        let a = BigVector3::from_vec3(Vec3::new(1.5, -2.0, 0.25)).unwrap();
        assert_eq!(a, v("1.5", "-2", "0.25"));
        let b = BigVector3::from_dvec3(DVec3::new(1e15, 0.0, -1.0)).unwrap();
        assert_eq!(b, v("1000000000000000", "0", "-1"));
        assert!(BigVector3::from_vec3(Vec3::new(f32::NAN, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_vector2() {
        let mut a = BigVector2::new(fp("1"), fp("2"));
        let b = BigVector2::from_vec2(Vec2::new(0.5, -1.0)).unwrap();
        a += &b;
        assert_eq!(a, BigVector2::new(fp("1.5"), fp("1")));
        a -= &b;
        assert_eq!(a.to_float_vector(), Vec2::new(1.0, 2.0));
        assert!(!a.is_zero());
        assert_eq!((&a - &a).to_double_vector(), DVec2::ZERO);
    }

    #[test]
    fn test_display_and_serde() {
        let a = v("1", "-0.5", "2.25");
        assert_eq!(a.to_string(), "(1.00000, -0.50000, 2.25000)");
        let json = serde_json::to_string(&a).unwrap();
        let back: BigVector3 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
