use rust_decimal::Decimal;
use std::fmt;

use super::wad_ray::Wad;

/// Health factor: risk-weighted collateral value over debt value.
///
/// A position without debt has no liquidation risk and is reported as
/// `Infinite` rather than dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthFactor {
    /// WAD-scaled, rounded down (1e18 = 1.0).
    Finite(Wad),
    Infinite,
}

impl HealthFactor {
    /// `>= 1.0`. Exact: the value is a floor, so `floor(x) >= 1` iff `x >= 1`.
    pub fn is_healthy(&self) -> bool {
        match self {
            Self::Finite(hf) => *hf >= Wad::ONE,
            Self::Infinite => true,
        }
    }

    /// `Decimal::MAX` for a debt-free position.
    pub fn to_decimal(&self) -> Decimal {
        match self {
            Self::Finite(hf) => hf.to_decimal(),
            Self::Infinite => Decimal::MAX,
        }
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(hf) => write!(f, "{hf}"),
            Self::Infinite => write!(f, "inf"),
        }
    }
}

/// Per-account view in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Collateral in asset units, including earned supply interest.
    pub collateral: Wad,
    /// Debt including accrued borrow interest.
    pub debt: Wad,
    pub collateral_value: Wad,
    pub debt_value: Wad,
    /// Additional debt the position could take on at the loan-to-value limit.
    pub available_borrow: Wad,
    pub loan_to_value: Decimal,
    pub liquidation_threshold: Decimal,
    pub health_factor: HealthFactor,
    /// Debt value above the liquidation-threshold-weighted collateral; zero
    /// while healthy.
    pub shortfall: Wad,
    /// Cap on a single liquidation's repay; zero while healthy.
    pub max_liquidatable_debt: Wad,
}
