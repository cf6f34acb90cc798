//! Fixed-point fractions for rates, ratios and prices.
//!
//! `Exp` stores a 256-bit mantissa scaled by 1e18. Every multiply-then-divide
//! truncates toward zero so no operation manufactures value; the few places that
//! must round against the user call the explicit `_ceil` variants. Overflow is a
//! `MathError`, never a wrap.

use crate::error::{MathError, MathResult};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 1e18, the fixed-point scale.
pub const EXP_SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Number of decimal places represented by the mantissa.
pub const EXP_DECIMALS: u32 = 18;

/// Unsigned fixed-point fraction with an 18-decimal mantissa.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Exp(U256);

impl Exp {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const ONE: Self = Self(EXP_SCALE);

    #[inline]
    pub const fn from_mantissa(mantissa: U256) -> Self {
        Self(mantissa)
    }

    #[inline]
    pub fn mantissa(&self) -> U256 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whole number as a fraction.
    pub fn from_integer(n: u64) -> Self {
        Self(U256::from(n) * EXP_SCALE)
    }

    /// `num / den`, truncated.
    pub fn from_ratio(num: U256, den: U256) -> MathResult<Self> {
        if den.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let scaled = num.checked_mul(EXP_SCALE).ok_or(MathError::Overflow)?;
        Ok(Self(scaled / den))
    }

    /// Exact conversion from a decimal; digits past the 18th place are truncated.
    pub fn from_decimal(value: Decimal) -> MathResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MathError::Negative);
        }
        let digits = U256::from(value.mantissa().unsigned_abs());
        let divisor = pow10(value.scale());
        let scaled = digits.checked_mul(EXP_SCALE).ok_or(MathError::Overflow)?;
        Ok(Self(scaled / divisor))
    }

    /// Lossless conversion to a decimal when the mantissa fits 96 bits.
    pub fn to_decimal(&self) -> MathResult<Decimal> {
        let raw = u128::try_from(self.0).map_err(|_| MathError::Conversion)?;
        let raw = i128::try_from(raw).map_err(|_| MathError::Conversion)?;
        Decimal::try_from_i128_with_scale(raw, EXP_DECIMALS)
            .map(|d| d.normalize())
            .map_err(|_| MathError::Conversion)
    }

    pub fn checked_add(self, rhs: Self) -> MathResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> MathResult<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(MathError::Underflow)
    }

    /// `self * rhs`, truncated.
    pub fn checked_mul(self, rhs: Self) -> MathResult<Self> {
        let product = self.0.checked_mul(rhs.0).ok_or(MathError::Overflow)?;
        Ok(Self(product / EXP_SCALE))
    }

    /// `self / rhs`, truncated.
    pub fn checked_div(self, rhs: Self) -> MathResult<Self> {
        if rhs.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let scaled = self.0.checked_mul(EXP_SCALE).ok_or(MathError::Overflow)?;
        Ok(Self(scaled / rhs.0))
    }

    /// `self * scalar` as a fraction (no truncation).
    pub fn mul_scalar(self, scalar: U256) -> MathResult<Self> {
        self.0
            .checked_mul(scalar)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    /// Integer part.
    #[inline]
    pub fn truncate(&self) -> U256 {
        self.0 / EXP_SCALE
    }

    /// `floor(self * scalar)`.
    pub fn mul_scalar_truncate(self, scalar: U256) -> MathResult<U256> {
        Ok(self.mul_scalar(scalar)?.truncate())
    }

    /// `floor(self * scalar) + addend`.
    pub fn mul_scalar_truncate_add(self, scalar: U256, addend: U256) -> MathResult<U256> {
        self.mul_scalar_truncate(scalar)?
            .checked_add(addend)
            .ok_or(MathError::Overflow)
    }

    /// `floor(scalar / self)`.
    pub fn div_into_scalar(self, scalar: U256) -> MathResult<U256> {
        if self.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let scaled = scalar.checked_mul(EXP_SCALE).ok_or(MathError::Overflow)?;
        Ok(scaled / self.0)
    }

    /// `ceil(scalar / self)`.
    pub fn div_into_scalar_ceil(self, scalar: U256) -> MathResult<U256> {
        if self.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let scaled = scalar.checked_mul(EXP_SCALE).ok_or(MathError::Overflow)?;
        let quotient = scaled / self.0;
        if (scaled % self.0).is_zero() {
            Ok(quotient)
        } else {
            quotient.checked_add(U256::from(1u8)).ok_or(MathError::Overflow)
        }
    }
}

fn pow10(exp: u32) -> U256 {
    (0..exp).fold(U256::from(1u8), |acc, _| acc * U256::from(10u8))
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(d) => write!(f, "{d}"),
            Err(_) => write!(f, "{}e-18", self.0),
        }
    }
}

impl TryFrom<Decimal> for Exp {
    type Error = MathError;

    fn try_from(value: Decimal) -> MathResult<Self> {
        Self::from_decimal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exp(d: Decimal) -> Exp {
        Exp::from_decimal(d).unwrap()
    }

    #[test]
    fn test_from_decimal_exact() {
        assert_eq!(exp(dec!(1)), Exp::ONE);
        assert_eq!(
            exp(dec!(0.5)).mantissa(),
            U256::from(500_000_000_000_000_000u64)
        );
        assert_eq!(exp(dec!(0.000000000000000001)).mantissa(), U256::from(1u8));
    }

    #[test]
    fn test_from_decimal_truncates_past_18_places() {
        let d = Decimal::from_i128_with_scale(19, 19); // 1.9e-18
        assert_eq!(exp(d).mantissa(), U256::from(1u8));
    }

    #[test]
    fn test_from_decimal_rejects_negative() {
        assert_eq!(Exp::from_decimal(dec!(-0.1)), Err(MathError::Negative));
    }

    #[test]
    fn test_decimal_roundtrip_display() {
        assert_eq!(exp(dec!(0.75)).to_string(), "0.75");
        assert_eq!(exp(dec!(1.08)).to_decimal().unwrap(), dec!(1.08));
    }

    #[test]
    fn test_mul_truncates() {
        // 1/3 * 3 = 0.999...9 (floor), never 1
        let third = Exp::from_ratio(U256::from(1u8), U256::from(3u8)).unwrap();
        let product = third.checked_mul(Exp::from_integer(3)).unwrap();
        assert!(product < Exp::ONE);
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(
            Exp::ONE.checked_div(Exp::ZERO),
            Err(MathError::DivisionByZero)
        );
        assert_eq!(
            Exp::from_ratio(U256::from(1u8), U256::ZERO),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn test_overflow_is_error() {
        let huge = Exp::from_mantissa(U256::MAX);
        assert_eq!(huge.checked_add(Exp::ONE), Err(MathError::Overflow));
        assert_eq!(
            huge.mul_scalar_truncate(U256::from(2u8)),
            Err(MathError::Overflow)
        );
    }

    #[test]
    fn test_underflow_is_error() {
        assert_eq!(
            Exp::ZERO.checked_sub(Exp::ONE),
            Err(MathError::Underflow)
        );
    }

    #[test]
    fn test_scalar_helpers() {
        let rate = exp(dec!(0.02));
        assert_eq!(
            rate.mul_scalar_truncate(U256::from(1_000u64)).unwrap(),
            U256::from(20u64)
        );
        assert_eq!(
            rate.mul_scalar_truncate_add(U256::from(1_000u64), U256::from(5u64))
                .unwrap(),
            U256::from(25u64)
        );
        // 1000 / 0.02 = 50000
        assert_eq!(
            rate.div_into_scalar(U256::from(1_000u64)).unwrap(),
            U256::from(50_000u64)
        );
    }

    #[test]
    fn test_div_into_scalar_ceil() {
        let three = Exp::from_integer(3);
        assert_eq!(
            three.div_into_scalar(U256::from(10u8)).unwrap(),
            U256::from(3u8)
        );
        assert_eq!(
            three.div_into_scalar_ceil(U256::from(10u8)).unwrap(),
            U256::from(4u8)
        );
        assert_eq!(
            three.div_into_scalar_ceil(U256::from(9u8)).unwrap(),
            U256::from(3u8)
        );
    }
}
