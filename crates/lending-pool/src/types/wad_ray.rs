//! Fixed-point newtypes and checked arithmetic.
//!
//! Amounts, prices and health factors are WAD-scaled (18 decimals); interest
//! rates and accrual indices are RAY-scaled (27 decimals). The mantissa is a
//! `U256` and every operation is checked: overflow and zero divisors surface
//! as [`ArithmeticError`] instead of wrapping or panicking. No floating point
//! is involved anywhere, so results are bit-reproducible.

use alloy::primitives::{uint, U256};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::constants::SECONDS_PER_YEAR;
use crate::errors::ArithmeticError;

const WAD_RAW: U256 = uint!(1_000_000_000_000_000_000_U256);
const HALF_WAD_RAW: U256 = uint!(500_000_000_000_000_000_U256);
const RAY_RAW: U256 = uint!(1_000_000_000_000_000_000_000_000_000_U256);
const HALF_RAY_RAW: U256 = uint!(500_000_000_000_000_000_000_000_000_U256);

// ---------------------------------------------------------------------------
// Raw U256 helpers
// ---------------------------------------------------------------------------

pub(crate) fn add(a: U256, b: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_add(b).ok_or(ArithmeticError::Overflow(op))
}

pub(crate) fn sub(a: U256, b: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_sub(b).ok_or(ArithmeticError::Overflow(op))
}

pub(crate) fn mul(a: U256, b: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_mul(b).ok_or(ArithmeticError::Overflow(op))
}

pub(crate) fn div(a: U256, b: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    if b.is_zero() {
        return Err(ArithmeticError::DivisionByZero(op));
    }
    Ok(a / b)
}

/// `a * b / c`, rounded down.
pub(crate) fn mul_div(a: U256, b: U256, c: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    div(mul(a, b, op)?, c, op)
}

/// `(a * b + half) / scale`, the half-up rounding used by WAD/RAY math.
fn mul_half_up(a: U256, b: U256, half: U256, scale: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    div(add(mul(a, b, op)?, half, op)?, scale, op)
}

/// `(a * scale + b / 2) / b`, half-up division.
fn div_half_up(a: U256, b: U256, scale: U256, op: &'static str) -> Result<U256, ArithmeticError> {
    if b.is_zero() {
        return Err(ArithmeticError::DivisionByZero(op));
    }
    div(add(mul(a, scale, op)?, b / U256::from(2u8), op)?, b, op)
}

fn pow10(exp: u32, op: &'static str) -> Result<U256, ArithmeticError> {
    U256::from(10u8)
        .checked_pow(U256::from(exp))
        .ok_or(ArithmeticError::Overflow(op))
}

/// Convert a non-negative `Decimal` into a `U256` mantissa with `decimals`
/// fractional digits. Digits beyond `decimals` are truncated.
fn decimal_to_scaled(value: Decimal, decimals: u32, op: &'static str) -> Result<U256, ArithmeticError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ArithmeticError::Overflow(op));
    }
    let value = value.normalize();
    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let scale = value.scale();
    if scale <= decimals {
        mul(mantissa, pow10(decimals - scale, op)?, op)
    } else {
        div(mantissa, pow10(scale - decimals, op)?, op)
    }
}

/// Render a scaled mantissa as a `Decimal`. Values too large for `Decimal`
/// render as zero; this is display-only.
fn scaled_to_decimal(raw: U256, decimals: u32) -> Decimal {
    let whole = Decimal::from_str(&raw.to_string()).unwrap_or_default();
    let mut out = whole;
    for _ in 0..decimals {
        out /= Decimal::TEN;
    }
    out
}

// ---------------------------------------------------------------------------
// WAD (1e18) — amounts, prices, health factors
// ---------------------------------------------------------------------------

/// WAD-scaled value (18 decimals). Used for amounts, prices and health factors.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wad(pub U256);

impl Wad {
    pub const ONE: Wad = Wad(WAD_RAW);
    pub const ZERO: Wad = Wad(U256::ZERO);

    /// Create from a `U256` that is already WAD-scaled.
    pub fn from_raw(val: U256) -> Self {
        Self(val)
    }

    /// Inner `U256`.
    pub fn raw(self) -> U256 {
        self.0
    }

    /// Whole units, e.g. `from_units(10)` is 10.0.
    pub fn from_units(units: u64) -> Self {
        // u64::MAX * 1e18 < 2^128, cannot overflow.
        Self(U256::from(units) * WAD_RAW)
    }

    /// Exact conversion from an off-chain `Decimal`. Fails on negative input.
    pub fn from_decimal(value: Decimal) -> Result<Self, ArithmeticError> {
        decimal_to_scaled(value, 18, "wad_from_decimal").map(Self)
    }

    /// Convert to off-chain `Decimal` for display and logging.
    pub fn to_decimal(self) -> Decimal {
        scaled_to_decimal(self.0, 18)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Wad) -> Result<Wad, ArithmeticError> {
        add(self.0, other.0, "wad_add").map(Wad)
    }

    /// Fails with `Overflow` if `other > self`; amounts never go negative.
    pub fn checked_sub(self, other: Wad) -> Result<Wad, ArithmeticError> {
        sub(self.0, other.0, "wad_sub").map(Wad)
    }

    pub fn saturating_sub(self, other: Wad) -> Wad {
        Wad(self.0.saturating_sub(other.0))
    }

    /// `self * other / 1e18`, rounded half up.
    pub fn wad_mul(self, other: Wad) -> Result<Wad, ArithmeticError> {
        mul_half_up(self.0, other.0, HALF_WAD_RAW, WAD_RAW, "wad_mul").map(Wad)
    }

    /// `self * 1e18 / other`, rounded half up.
    pub fn wad_div(self, other: Wad) -> Result<Wad, ArithmeticError> {
        div_half_up(self.0, other.0, WAD_RAW, "wad_div").map(Wad)
    }

    /// `self * pct / base`, rounded down. `percent_of(x, 80, 100)` is 80% of x.
    pub fn percent_of(self, pct: u64, base: u64) -> Result<Wad, ArithmeticError> {
        mul_div(self.0, U256::from(pct), U256::from(base), "percent_of").map(Wad)
    }

    /// Scale by an index ratio: `self * numerator / denominator`, rounded down.
    pub fn mul_ratio(self, numerator: Ray, denominator: Ray) -> Result<Wad, ArithmeticError> {
        mul_div(self.0, numerator.0, denominator.0, "mul_ratio").map(Wad)
    }
}

impl fmt::Debug for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wad({})", self.to_decimal())
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl From<U256> for Wad {
    fn from(val: U256) -> Self {
        Self(val)
    }
}

// ---------------------------------------------------------------------------
// RAY (1e27) — interest rates and accrual indices
// ---------------------------------------------------------------------------

/// RAY-scaled value (27 decimals). Used for annual rates and accrual indices.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ray(pub U256);

impl Ray {
    pub const ONE: Ray = Ray(RAY_RAW);
    pub const ZERO: Ray = Ray(U256::ZERO);

    /// Create from a `U256` that is already RAY-scaled.
    pub fn from_raw(val: U256) -> Self {
        Self(val)
    }

    /// Inner `U256`.
    pub fn raw(self) -> U256 {
        self.0
    }

    /// Exact conversion from an off-chain `Decimal` (e.g. `0.04` for 4% APR).
    pub fn from_decimal(value: Decimal) -> Result<Self, ArithmeticError> {
        decimal_to_scaled(value, 27, "ray_from_decimal").map(Self)
    }

    /// Convert RAY to off-chain `Decimal`.
    pub fn to_decimal(self) -> Decimal {
        scaled_to_decimal(self.0, 27)
    }

    /// Convert a RAY annual rate to an APR percentage (× 100).
    pub fn to_apr_percent(self) -> Decimal {
        self.to_decimal() * Decimal::ONE_HUNDRED
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Ray) -> Result<Ray, ArithmeticError> {
        add(self.0, other.0, "ray_add").map(Ray)
    }

    pub fn checked_sub(self, other: Ray) -> Result<Ray, ArithmeticError> {
        sub(self.0, other.0, "ray_sub").map(Ray)
    }

    /// `self * other / 1e27`, rounded half up.
    pub fn ray_mul(self, other: Ray) -> Result<Ray, ArithmeticError> {
        mul_half_up(self.0, other.0, HALF_RAY_RAW, RAY_RAW, "ray_mul").map(Ray)
    }

    /// `self * 1e27 / other`, rounded half up.
    pub fn ray_div(self, other: Ray) -> Result<Ray, ArithmeticError> {
        div_half_up(self.0, other.0, RAY_RAW, "ray_div").map(Ray)
    }

    /// `self * numerator / denominator`, rounded down.
    pub fn mul_div(self, numerator: U256, denominator: U256) -> Result<Ray, ArithmeticError> {
        mul_div(self.0, numerator, denominator, "ray_mul_div").map(Ray)
    }
}

impl fmt::Debug for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ray({})", self.to_decimal())
    }
}

impl fmt::Display for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl From<U256> for Ray {
    fn from(val: U256) -> Self {
        Self(val)
    }
}

// ---------------------------------------------------------------------------
// Compounding
// ---------------------------------------------------------------------------

/// Compound growth factor over `elapsed_seconds` at a per-second compounded
/// annual rate, using the 3-term binomial expansion:
///
///   1 + n·x + n(n−1)/2·x² + n(n−1)(n−2)/6·x³,   x = rate / SECONDS_PER_YEAR
///
/// Returns exactly `Ray::ONE` for zero elapsed time or a zero rate.
pub fn compound_interest(annual_rate: Ray, elapsed_seconds: u64) -> Result<Ray, ArithmeticError> {
    if elapsed_seconds == 0 || annual_rate.is_zero() {
        return Ok(Ray::ONE);
    }

    let op = "compound_interest";
    let n = U256::from(elapsed_seconds);
    let n_minus_one = U256::from(elapsed_seconds - 1);
    let n_minus_two = U256::from(elapsed_seconds.saturating_sub(2));
    let year = U256::from(SECONDS_PER_YEAR);

    let base_power_two = div(annual_rate.ray_mul(annual_rate)?.0, mul(year, year, op)?, op)?;
    let base_power_three = div(Ray(base_power_two).ray_mul(annual_rate)?.0, year, op)?;

    let first_term = mul_div(annual_rate.0, n, year, op)?;
    let second_term = div(
        mul(mul(n, n_minus_one, op)?, base_power_two, op)?,
        U256::from(2u8),
        op,
    )?;
    let third_term = div(
        mul(mul(mul(n, n_minus_one, op)?, n_minus_two, op)?, base_power_three, op)?,
        U256::from(6u8),
        op,
    )?;

    let growth = add(add(first_term, second_term, op)?, third_term, op)?;
    Ray::ONE.checked_add(Ray(growth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wad_one_is_one() {
        assert_eq!(Wad::ONE.to_decimal(), dec!(1));
        assert_eq!(Wad::from_units(1), Wad::ONE);
    }

    #[test]
    fn test_ray_one_is_one() {
        assert_eq!(Ray::ONE.to_decimal(), dec!(1));
    }

    #[test]
    fn test_wad_from_decimal_is_exact() {
        let v = Wad::from_decimal(dec!(8.5)).unwrap();
        assert_eq!(v.raw(), U256::from(8_500_000_000_000_000_000u128));
        assert_eq!(v.to_decimal(), dec!(8.5));
    }

    #[test]
    fn test_wad_from_negative_decimal_fails() {
        assert!(Wad::from_decimal(dec!(-1)).is_err());
    }

    #[test]
    fn test_ray_to_apr() {
        // 3% APR in RAY = 0.03 * 1e27 = 3e25
        let rate = Ray::from_raw(U256::from(30_000_000_000_000_000_000_000_000u128));
        assert_eq!(rate.to_apr_percent(), dec!(3));
    }

    #[test]
    fn test_percent_of() {
        let ten = Wad::from_units(10);
        assert_eq!(ten.percent_of(80, 100).unwrap(), Wad::from_units(8));
        let debt = Wad::from_decimal(dec!(8.5)).unwrap();
        assert_eq!(
            debt.percent_of(65, 100).unwrap(),
            Wad::from_decimal(dec!(5.525)).unwrap()
        );
    }

    #[test]
    fn test_percent_of_zero_base_fails() {
        let err = Wad::ONE.percent_of(1, 0).unwrap_err();
        assert_eq!(err, ArithmeticError::DivisionByZero("percent_of"));
    }

    #[test]
    fn test_wad_mul_rounds_half_up() {
        // 1 wei * 0.5 = 0.5 wei -> rounds to 1
        let half = Wad::from_decimal(dec!(0.5)).unwrap();
        assert_eq!(Wad(U256::from(1u8)).wad_mul(half).unwrap(), Wad(U256::from(1u8)));
    }

    #[test]
    fn test_wad_div_by_zero() {
        let err = Wad::ONE.wad_div(Wad::ZERO).unwrap_err();
        assert!(matches!(err, ArithmeticError::DivisionByZero(_)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = Wad(U256::MAX);
        assert!(matches!(
            max.checked_add(Wad::ONE).unwrap_err(),
            ArithmeticError::Overflow(_)
        ));
        assert!(matches!(
            max.wad_mul(Wad::from_units(2)).unwrap_err(),
            ArithmeticError::Overflow(_)
        ));
    }

    #[test]
    fn test_sub_below_zero_fails() {
        assert!(Wad::ONE.checked_sub(Wad::from_units(2)).is_err());
        assert_eq!(Wad::ONE.saturating_sub(Wad::from_units(2)), Wad::ZERO);
    }

    #[test]
    fn test_compound_interest_identity() {
        let rate = Ray::from_decimal(dec!(0.1)).unwrap();
        assert_eq!(compound_interest(rate, 0).unwrap(), Ray::ONE);
        assert_eq!(compound_interest(Ray::ZERO, 1_000).unwrap(), Ray::ONE);
    }

    #[test]
    fn test_compound_interest_one_year_close_to_exp() {
        // e^0.1 ≈ 1.10517; the 3-term expansion gives ≈ 1.10517 as well.
        let rate = Ray::from_decimal(dec!(0.1)).unwrap();
        let factor = compound_interest(rate, SECONDS_PER_YEAR).unwrap().to_decimal();
        assert!(factor > dec!(1.1051) && factor < dec!(1.1052), "factor {factor}");
    }

    #[test]
    fn test_compound_exceeds_linear() {
        let rate = Ray::from_decimal(dec!(0.2)).unwrap();
        let compound = compound_interest(rate, SECONDS_PER_YEAR).unwrap();
        // Simple interest over the same year would be exactly 1.2.
        assert!(compound > Ray::from_decimal(dec!(1.2)).unwrap());
    }

    proptest! {
        #[test]
        fn compound_interest_is_monotonic_in_time(
            rate_bps in 1u64..10_000u64,
            t in 1u64..(2 * SECONDS_PER_YEAR),
        ) {
            let rate = Ray::from_decimal(Decimal::from(rate_bps) / dec!(10000)).unwrap();
            let earlier = compound_interest(rate, t - 1).unwrap();
            let later = compound_interest(rate, t).unwrap();
            prop_assert!(later >= earlier);
            prop_assert!(later >= Ray::ONE);
        }

        #[test]
        fn percent_of_never_exceeds_value(
            units in 0u64..1_000_000_000u64,
            pct in 0u64..=100u64,
        ) {
            let v = Wad::from_units(units);
            prop_assert!(v.percent_of(pct, 100).unwrap() <= v);
        }
    }
}
