//! Exact arbitrary-precision fractions used for every rate computation.
//! Values are always kept in lowest terms with a positive denominator, so structural
//! equality and hashing coincide with numeric equality.
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ArbError;

/// Fractional digits kept when a rational has to be squeezed through a float.
const LOSSY_SCALE: i64 = 20;

/// Largest decimal exponent accepted from a `BigDecimal` or a decimal string.
pub const MAX_DECIMAL_EXPONENT: u64 = 4096;

/// Integers up to this many bits convert to a finite `f64`.
const F64_SAFE_BITS: u64 = 1000;

/// A signed fraction `numerator / denominator` in lowest terms.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
}

impl Rational {
    /// Creates a rational from a numerator and a denominator, reducing it to lowest terms.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::DivisionByZero` if the denominator is zero.
    pub fn new(
        numerator: impl Into<BigInt>,
        denominator: impl Into<BigInt>,
    ) -> Result<Self, ArbError> {
        let denominator = denominator.into();
        if denominator.is_zero() {
            return Err(ArbError::DivisionByZero);
        }
        Ok(Self::reduced(numerator.into(), denominator))
    }

    /// Creates a whole-number rational.
    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Self {
            numerator: value.into(),
            denominator: BigInt::one(),
        }
    }

    /// The additive identity.
    #[must_use]
    pub fn zero() -> Self {
        Self::from_integer(0)
    }

    /// The multiplicative identity.
    #[must_use]
    pub fn one() -> Self {
        Self::from_integer(1)
    }

    /// Converts a decimal exactly, honouring both positive and negative scales.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::DecimalExponentOutOfRange` if the scale exceeds
    /// [`MAX_DECIMAL_EXPONENT`] in either direction.
    pub fn from_big_decimal(value: &BigDecimal) -> Result<Self, ArbError> {
        let (digits, scale) = value.as_bigint_and_exponent();
        let exponent = scale.unsigned_abs();
        if exponent > MAX_DECIMAL_EXPONENT {
            return Err(ArbError::DecimalExponentOutOfRange {
                scale,
                limit: MAX_DECIMAL_EXPONENT,
            });
        }
        Ok(if scale >= 0 {
            Self::reduced(digits, pow10(exponent))
        } else {
            Self::from_integer(digits * pow10(exponent))
        })
    }

    /// Numerator in lowest terms. Carries the sign.
    #[must_use]
    pub const fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    /// Denominator in lowest terms. Always positive.
    #[must_use]
    pub const fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.numerator.is_positive()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.numerator.is_negative()
    }

    /// Divides by `other`.
    ///
    /// # Errors
    ///
    /// Returns `ArbError::DivisionByZero` if `other` is zero.
    pub fn checked_div(&self, other: &Self) -> Result<Self, ArbError> {
        if other.is_zero() {
            return Err(ArbError::DivisionByZero);
        }
        Ok(Self::reduced(
            &self.numerator * &other.denominator,
            &self.denominator * &other.numerator,
        ))
    }

    /// Truncates toward zero to `scale` fractional digits.
    #[must_use]
    pub fn to_big_decimal(&self, scale: i64) -> BigDecimal {
        let digits = if scale >= 0 {
            (&self.numerator * pow10(scale.unsigned_abs())) / &self.denominator
        } else {
            &self.numerator / (&self.denominator * pow10(scale.unsigned_abs()))
        };
        BigDecimal::new(digits, scale)
    }

    /// Approximate float, not correctly rounded. Never use this in ratio comparisons.
    #[must_use]
    pub fn to_f64_lossy(&self) -> f64 {
        match (self.numerator.to_f64(), self.denominator.to_f64()) {
            (Some(n), Some(d)) if n.is_finite() && d.is_finite() => n / d,
            _ => self
                .to_big_decimal(LOSSY_SCALE)
                .to_f64()
                .unwrap_or(f64::NAN),
        }
    }

    /// Natural logarithm through a float round trip, for log-space heuristics only.
    ///
    /// # Errors
    ///
    /// * `ArbError::NonPositiveLogarithm` if the value is not strictly positive
    /// * `ArbError::NotRepresentable` if the logarithm has no finite float value
    pub fn log_lossy(&self) -> Result<Self, ArbError> {
        if !self.is_positive() {
            return Err(ArbError::NonPositiveLogarithm {
                value: self.to_string(),
            });
        }
        // ln(n/d) = ln n - ln d keeps huge and tiny values finite
        let ln = ln_positive(&self.numerator) - ln_positive(&self.denominator);
        BigDecimal::from_f64(ln)
            .and_then(|ln| Self::from_big_decimal(&ln).ok())
            .ok_or_else(|| ArbError::NotRepresentable {
                value: self.to_string(),
            })
    }

    fn reduced(numerator: BigInt, denominator: BigInt) -> Self {
        let gcd = numerator.gcd(&denominator);
        let (mut numerator, mut denominator) = (numerator / &gcd, denominator / &gcd);
        if denominator.is_negative() {
            numerator = -numerator;
            denominator = -denominator;
        }
        Self {
            numerator,
            denominator,
        }
    }

    fn add_ref(&self, other: &Self) -> Self {
        Self::reduced(
            &self.numerator * &other.denominator + &other.numerator * &self.denominator,
            &self.denominator * &other.denominator,
        )
    }

    fn sub_ref(&self, other: &Self) -> Self {
        Self::reduced(
            &self.numerator * &other.denominator - &other.numerator * &self.denominator,
            &self.denominator * &other.denominator,
        )
    }

    fn mul_ref(&self, other: &Self) -> Self {
        Self::reduced(
            &self.numerator * &other.numerator,
            &self.denominator * &other.denominator,
        )
    }

    fn div_ref(&self, other: &Self) -> Self {
        assert!(!other.is_zero(), "division by a zero rational");
        Self::reduced(
            &self.numerator * &other.denominator,
            &self.denominator * &other.numerator,
        )
    }
}

/// Natural log of a positive integer of any size.
fn ln_positive(value: &BigInt) -> f64 {
    let bits = value.bits();
    if bits <= F64_SAFE_BITS {
        return value.to_f64().map_or(f64::NAN, f64::ln);
    }
    let shift = bits - 64;
    let head = value >> shift;
    #[allow(clippy::cast_precision_loss)]
    let scaled = shift as f64 * std::f64::consts::LN_2;
    head.to_f64().map_or(f64::NAN, f64::ln) + scaled
}

fn pow10(exponent: u64) -> BigInt {
    #[allow(clippy::cast_possible_truncation)]
    num_traits::pow(BigInt::from(10), exponent as usize)
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Rational {
                fn from(value: $t) -> Self {
                    Self::from_integer(value)
                }
            }
        )*
    };
}

impl_from_int!(i32, i64, u32, u64);

impl From<BigInt> for Rational {
    fn from(value: BigInt) -> Self {
        Self::from_integer(value)
    }
}

// Operators delegate to the by-reference helpers for every owned/borrowed combination.
// `Div` panics on a zero divisor like integer division does; use `checked_div` otherwise.
macro_rules! impl_binop {
    ($trait:ident, $method:ident, $helper:ident) => {
        impl $trait<&Rational> for &Rational {
            type Output = Rational;
            fn $method(self, rhs: &Rational) -> Rational {
                self.$helper(rhs)
            }
        }

        impl $trait<Rational> for Rational {
            type Output = Rational;
            fn $method(self, rhs: Rational) -> Rational {
                self.$helper(&rhs)
            }
        }

        impl $trait<&Rational> for Rational {
            type Output = Rational;
            fn $method(self, rhs: &Rational) -> Rational {
                self.$helper(rhs)
            }
        }

        impl $trait<Rational> for &Rational {
            type Output = Rational;
            fn $method(self, rhs: Rational) -> Rational {
                self.$helper(&rhs)
            }
        }
    };
}

impl_binop!(Add, add, add_ref);
impl_binop!(Sub, sub, sub_ref);
impl_binop!(Mul, mul, mul_ref);
impl_binop!(Div, div, div_ref);

impl Neg for Rational {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator))
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Accepts `n/d`, a plain integer, or a decimal such as `0.0025` or `1e-3`.
impl FromStr for Rational {
    type Err = ArbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let malformed = || ArbError::ParseRational {
            input: s.to_string(),
        };
        match input.split_once('/') {
            Some((numerator, denominator)) => {
                let numerator = numerator.trim().parse::<BigInt>().map_err(|_| malformed())?;
                let denominator = denominator
                    .trim()
                    .parse::<BigInt>()
                    .map_err(|_| malformed())?;
                Self::new(numerator, denominator)
            }
            None => BigDecimal::from_str(input)
                .map_err(|_| malformed())
                .and_then(|decimal| Self::from_big_decimal(&decimal).map_err(|_| malformed())),
        }
    }
}

impl Serialize for Rational {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rational {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
