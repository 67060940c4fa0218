//! Arbitrary-precision fixed-point decimal numbers
//!
//! [`FixedPointBig`] stores an unbounded signed integer that represents a real value scaled by
//! [`SCALE`]. The integer part can grow without limit, so positions at interstellar distances stay
//! exact. Only multiplication and division shed precision, and only below the fifth decimal.

use super::error::NumericError;
use lazy_static::lazy_static;
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of fractional decimal digits carried by every [`FixedPointBig`]
pub const SCALE_DIGITS: usize = 5;

/// Fixed scale factor shared by every [`FixedPointBig`] (`10^SCALE_DIGITS`)
pub const SCALE: i64 = 100_000;

const SCALE_F32: f32 = SCALE as f32;
const SCALE_F64: f64 = SCALE as f64;

lazy_static! {
    static ref SCALE_BIG: BigInt = BigInt::from(SCALE);
    /// Largest raw magnitude that still narrows to a finite `f32`
    static ref MAX_F32_RAW: BigInt = BigInt::from_f32(f32::MAX).unwrap_or_default() * SCALE;
    /// Largest raw magnitude that still narrows to a finite `f64`
    static ref MAX_F64_RAW: BigInt = BigInt::from_f64(f64::MAX).unwrap_or_default() * SCALE;
}

/// Signed decimal number with unbounded magnitude and [`SCALE_DIGITS`] fractional digits
///
/// The stored integer is `trunc(real_value * SCALE)`. Values are immutable by convention: every
/// operator returns a new value and the assigning operators are defined in terms of them.
///
/// ```
/// use farpoint::core::coordinates::FixedPointBig;
///
/// let a: FixedPointBig = "1.00001".parse().unwrap();
/// let b: FixedPointBig = "2.00002".parse().unwrap();
/// assert_eq!(a + b, "3.00003".parse().unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FixedPointBig {
    raw: BigInt,
}

impl FixedPointBig {
    /// The value zero
    pub fn zero() -> Self {
        Self { raw: BigInt::zero() }
    }

    /// The value one
    pub fn one() -> Self {
        Self {
            raw: SCALE_BIG.clone(),
        }
    }

    /// Build a value directly from its scaled integer representation
    pub fn from_raw(raw: BigInt) -> Self {
        Self { raw }
    }

    /// The scaled integer `trunc(value * SCALE)`
    pub fn raw(&self) -> &BigInt {
        &self.raw
    }

    /// Parse a decimal literal of the form `[-+]?digits('.'digits)?`
    ///
    /// Fractional digits beyond [`SCALE_DIGITS`] are truncated, missing ones are zero-padded.
    pub fn parse(text: &str) -> Result<Self, NumericError> {
        let invalid = || NumericError::InvalidFormat(text.to_string());

        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            Some(_) => (false, text),
            None => return Err(invalid()),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (unsigned, None),
        };

        let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(int_part) || frac_part.is_some_and(|f| !is_digits(f)) {
            return Err(invalid());
        }

        let mut digits = String::with_capacity(int_part.len() + SCALE_DIGITS);
        digits.push_str(int_part);
        let frac = frac_part.unwrap_or("");
        let kept = &frac[..frac.len().min(SCALE_DIGITS)];
        digits.push_str(kept);
        digits.extend(std::iter::repeat('0').take(SCALE_DIGITS - kept.len()));

        let magnitude = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;
        Ok(Self {
            raw: if negative { -magnitude } else { magnitude },
        })
    }

    /// Convert a single-precision float, truncating toward zero below the fixed scale
    ///
    /// The product with [`SCALE`] is taken in single precision like any other `f32` math. When that
    /// product would overflow the input is already a whole number and is scaled exactly.
    pub fn from_f32(value: f32) -> Result<Self, NumericError> {
        if !value.is_finite() {
            return Err(NumericError::NonFinite(value as f64));
        }
        let scaled = value * SCALE_F32;
        let raw = if scaled.is_finite() {
            BigInt::from_f32(scaled.trunc())
        } else {
            BigInt::from_f32(value.trunc()).map(|int| int * SCALE)
        };
        raw.map(Self::from_raw)
            .ok_or(NumericError::NonFinite(value as f64))
    }

    /// Convert a double-precision float, truncating toward zero below the fixed scale
    pub fn from_f64(value: f64) -> Result<Self, NumericError> {
        if !value.is_finite() {
            return Err(NumericError::NonFinite(value));
        }
        let scaled = value * SCALE_F64;
        let raw = if scaled.is_finite() {
            BigInt::from_f64(scaled.trunc())
        } else {
            BigInt::from_f64(value.trunc()).map(|int| int * SCALE)
        };
        raw.map(Self::from_raw).ok_or(NumericError::NonFinite(value))
    }

    /// Exact test against zero
    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// True when the value is strictly below zero
    pub fn is_negative(&self) -> bool {
        self.raw.is_negative()
    }

    /// Absolute value
    pub fn abs(&self) -> Self {
        Self {
            raw: self.raw.abs(),
        }
    }

    /// `-1`, `0` or `1` as an integer, matching the sign of the value
    pub fn signum(&self) -> i32 {
        match self.raw.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// Divide, computing `(self.raw * SCALE) / rhs.raw` with truncation toward zero
    pub fn divide(&self, rhs: &Self) -> Result<Self, NumericError> {
        if rhs.raw.is_zero() {
            return Err(NumericError::DivisionByZero);
        }
        Ok(Self {
            raw: (&self.raw * &*SCALE_BIG) / &rhs.raw,
        })
    }

    /// Narrow to `f64`, mapping out-of-range magnitudes to signed infinity
    pub fn to_f64(&self) -> f64 {
        if self.raw.magnitude() > MAX_F64_RAW.magnitude() {
            return self.signed_infinity();
        }
        match self.raw.to_f64() {
            Some(raw) if raw.is_finite() => raw / SCALE_F64,
            // The raw integer itself is wider than f64, but the scaled value is not.
            _ => {
                let (int, frac) = self.raw.div_rem(&SCALE_BIG);
                let int = int.to_f64().unwrap_or_else(|| self.signed_infinity());
                let frac = frac.to_f64().unwrap_or(0.0) / SCALE_F64;
                int + frac
            }
        }
    }

    /// Narrow to `f32`, mapping out-of-range magnitudes to signed infinity
    pub fn to_f32(&self) -> f32 {
        if self.raw.magnitude() > MAX_F32_RAW.magnitude() {
            return self.signed_infinity() as f32;
        }
        self.to_f64() as f32
    }

    fn signed_infinity(&self) -> f64 {
        if self.raw.is_negative() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    }
}

impl FromStr for FixedPointBig {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<i32> for FixedPointBig {
    fn from(value: i32) -> Self {
        Self::from(value as i64)
    }
}

impl From<i64> for FixedPointBig {
    fn from(value: i64) -> Self {
        Self {
            raw: BigInt::from(value) * SCALE,
        }
    }
}

impl From<BigInt> for FixedPointBig {
    /// Interpret an integer as a whole number (not as a raw scaled value)
    fn from(value: BigInt) -> Self {
        Self {
            raw: value * SCALE,
        }
    }
}

impl fmt::Display for FixedPointBig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (int, frac) = self.raw.magnitude().div_rem(SCALE_BIG.magnitude());
        let sign = if self.raw.is_negative() { "-" } else { "" };
        write!(f, "{sign}{int}.{frac:0>width$}", width = SCALE_DIGITS)
    }
}

impl PartialOrd for FixedPointBig {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FixedPointBig {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Neg for FixedPointBig {
    type Output = FixedPointBig;

    fn neg(self) -> Self::Output {
        Self { raw: -self.raw }
    }
}

impl Neg for &FixedPointBig {
    type Output = FixedPointBig;

    fn neg(self) -> Self::Output {
        FixedPointBig {
            raw: -&self.raw,
        }
    }
}

impl Add<&FixedPointBig> for &FixedPointBig {
    type Output = FixedPointBig;

    fn add(self, rhs: &FixedPointBig) -> Self::Output {
        FixedPointBig {
            raw: &self.raw + &rhs.raw,
        }
    }
}

impl Sub<&FixedPointBig> for &FixedPointBig {
    type Output = FixedPointBig;

    fn sub(self, rhs: &FixedPointBig) -> Self::Output {
        FixedPointBig {
            raw: &self.raw - &rhs.raw,
        }
    }
}

impl Mul<&FixedPointBig> for &FixedPointBig {
    type Output = FixedPointBig;

    /// `(a.raw * b.raw) / SCALE`, truncating toward zero
    fn mul(self, rhs: &FixedPointBig) -> Self::Output {
        FixedPointBig {
            raw: (&self.raw * &rhs.raw) / &*SCALE_BIG,
        }
    }
}

macro_rules! forward_owned_binop {
    ($($imp:ident, $method:ident, $assign_imp:ident, $assign_method:ident);* $(;)?) => {
        $(
            impl $imp<FixedPointBig> for FixedPointBig {
                type Output = FixedPointBig;

                fn $method(self, rhs: FixedPointBig) -> Self::Output {
                    (&self).$method(&rhs)
                }
            }

            impl $imp<&FixedPointBig> for FixedPointBig {
                type Output = FixedPointBig;

                fn $method(self, rhs: &FixedPointBig) -> Self::Output {
                    (&self).$method(rhs)
                }
            }

            impl $imp<FixedPointBig> for &FixedPointBig {
                type Output = FixedPointBig;

                fn $method(self, rhs: FixedPointBig) -> Self::Output {
                    self.$method(&rhs)
                }
            }

            impl $assign_imp<&FixedPointBig> for FixedPointBig {
                fn $assign_method(&mut self, rhs: &FixedPointBig) {
                    *self = (&*self).$method(rhs);
                }
            }

            impl $assign_imp<FixedPointBig> for FixedPointBig {
                fn $assign_method(&mut self, rhs: FixedPointBig) {
                    *self = (&*self).$method(&rhs);
                }
            }
        )*
    };
}

forward_owned_binop! {
    Add, add, AddAssign, add_assign;
    Sub, sub, SubAssign, sub_assign;
    Mul, mul, MulAssign, mul_assign;
}

impl Serialize for FixedPointBig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FixedPointBig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FixedPointVisitor;

        impl de::Visitor<'_> for FixedPointVisitor {
            type Value = FixedPointBig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a decimal string or a number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                FixedPointBig::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(FixedPointBig::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(FixedPointBig::from(BigInt::from(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                FixedPointBig::from_f64(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FixedPointVisitor)
    }
}
