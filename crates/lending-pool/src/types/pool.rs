use alloy::primitives::Address;
use rust_decimal::Decimal;

use crate::constants::{
    DEFAULT_LIQUIDATION_BONUS, DEFAULT_LIQUIDATION_CLOSE_FACTOR, DEFAULT_LIQUIDATION_THRESHOLD,
    DEFAULT_LOAN_TO_VALUE, DEFAULT_PRECISION_BASE, DEFAULT_RESERVE_FACTOR,
};
use crate::errors::ArithmeticError;

use super::wad_ray::{Ray, Wad};

/// Immutable risk parameters, each an integer scaled by `precision_base`
/// (80 with a base of 100 means 80%).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskParameters {
    /// Maximum debt as a share of collateral value.
    pub loan_to_value: u64,
    /// Risk-weighting of collateral in the health factor.
    pub liquidation_threshold: u64,
    /// Collateral paid per unit of repaid debt value (110 = 10% premium).
    pub liquidation_bonus: u64,
    /// Maximum share of debt repayable in one liquidation.
    pub liquidation_close_factor: u64,
    /// Share of borrow interest kept as protocol reserves.
    pub reserve_factor: u64,
    pub precision_base: u64,
}

impl RiskParameters {
    /// Check the ordering constraints between parameters.
    ///
    /// Returns every violation found, not just the first.
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let base = self.precision_base;

        if base == 0 {
            errors.push("precision_base must be > 0".to_string());
            return errors;
        }
        if self.loan_to_value == 0 {
            errors.push("loan_to_value must be > 0".to_string());
        }
        if self.loan_to_value >= self.liquidation_threshold {
            errors.push(format!(
                "loan_to_value ({}) must be < liquidation_threshold ({})",
                self.loan_to_value, self.liquidation_threshold
            ));
        }
        if self.liquidation_threshold > base {
            errors.push(format!(
                "liquidation_threshold ({}) exceeds precision_base ({base})",
                self.liquidation_threshold
            ));
        }
        if self.liquidation_bonus < base {
            errors.push(format!(
                "liquidation_bonus ({}) must be >= precision_base ({base})",
                self.liquidation_bonus
            ));
        }
        if self.liquidation_close_factor == 0 || self.liquidation_close_factor > base {
            errors.push(format!(
                "liquidation_close_factor ({}) must be in (0, {base}]",
                self.liquidation_close_factor
            ));
        }
        if self.reserve_factor > base {
            errors.push(format!(
                "reserve_factor ({}) exceeds precision_base ({base})",
                self.reserve_factor
            ));
        }
        errors
    }

    /// Loan-to-value as a fraction, for display.
    pub fn loan_to_value_ratio(&self) -> Decimal {
        ratio(self.loan_to_value, self.precision_base)
    }

    /// Liquidation threshold as a fraction, for display.
    pub fn liquidation_threshold_ratio(&self) -> Decimal {
        ratio(self.liquidation_threshold, self.precision_base)
    }
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            loan_to_value: DEFAULT_LOAN_TO_VALUE,
            liquidation_threshold: DEFAULT_LIQUIDATION_THRESHOLD,
            liquidation_bonus: DEFAULT_LIQUIDATION_BONUS,
            liquidation_close_factor: DEFAULT_LIQUIDATION_CLOSE_FACTOR,
            reserve_factor: DEFAULT_RESERVE_FACTOR,
            precision_base: DEFAULT_PRECISION_BASE,
        }
    }
}

fn ratio(value: u64, base: u64) -> Decimal {
    if base == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(value) / Decimal::from(base)
}

/// Aggregate state of one deployed pool.
///
/// `total_collateral` and `total_debt` are always exactly the sum of every
/// position's current balance at `supply_index` / `borrow_index`. Balance
/// updates adjust them by the position's change; accrual re-sums them over
/// the ledger at the new indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub asset: Address,
    pub params: RiskParameters,
    pub total_collateral: Wad,
    pub total_debt: Wad,
    /// Protocol share of accrued interest.
    pub reserves: Wad,
    pub borrow_index: Ray,
    pub supply_index: Ray,
    pub last_accrual_timestamp: u64,
}

impl PoolState {
    pub fn new(asset: Address, params: RiskParameters, now: u64) -> Self {
        Self {
            asset,
            params,
            total_collateral: Wad::ZERO,
            total_debt: Wad::ZERO,
            reserves: Wad::ZERO,
            borrow_index: Ray::ONE,
            supply_index: Ray::ONE,
            last_accrual_timestamp: now,
        }
    }

    /// `total_debt / total_collateral` in RAY, capped at 1.0; zero without collateral.
    pub fn utilization(&self) -> Result<Ray, ArithmeticError> {
        if self.total_collateral.is_zero() || self.total_debt.is_zero() {
            return Ok(Ray::ZERO);
        }
        let u = Ray::ONE.mul_div(self.total_debt.raw(), self.total_collateral.raw())?;
        Ok(u.min(Ray::ONE))
    }
}
