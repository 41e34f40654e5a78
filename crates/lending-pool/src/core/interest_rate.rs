//! Kinked utilization interest-rate model and index accrual.
//!
//! Below the optimal utilization the borrow rate climbs gently along
//! `slope_1`; above it, steeply along `slope_2`. Rates are annual and
//! RAY-scaled. Suppliers earn the realised borrow interest minus the
//! reserve-factor share, distributed through the supply index; whatever
//! index rounding keeps from suppliers stays in reserves.

use alloy::primitives::{uint, U256};

use crate::config::InterestConfig;
use crate::errors::ArithmeticError;
use crate::types::{compound_interest, PoolState, Ray, Wad};

use super::ledger::PositionLedger;

/// Interest split produced by one accrual step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accrual {
    pub borrow_rate: Ray,
    /// Growth of the summed position debt over the step.
    pub interest: Wad,
    pub to_reserves: Wad,
    pub to_suppliers: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestRateModel {
    pub base_rate: Ray,
    pub slope_1: Ray,
    pub slope_2: Ray,
    pub optimal_utilization: Ray,
}

impl InterestRateModel {
    pub fn from_config(config: &InterestConfig) -> Result<Self, ArithmeticError> {
        Ok(Self {
            base_rate: Ray::from_decimal(config.base_rate)?,
            slope_1: Ray::from_decimal(config.slope_1)?,
            slope_2: Ray::from_decimal(config.slope_2)?,
            optimal_utilization: Ray::from_decimal(config.optimal_utilization)?,
        })
    }

    /// Every broken curve invariant, as human-readable messages.
    pub fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let optimal = self.optimal_utilization;
        if optimal.is_zero() || optimal >= Ray::ONE {
            errors.push(format!(
                "optimal_utilization ({}) must be in (0, 1)",
                optimal.to_decimal()
            ));
        }
        errors
    }

    /// Borrow rate at a given utilization (RAY, clamped to `[0, 1]`).
    pub fn rate_at(&self, utilization: Ray) -> Result<Ray, ArithmeticError> {
        let u = utilization.min(Ray::ONE);
        let optimal = self.optimal_utilization;

        if u <= optimal {
            let ramp = self.slope_1.mul_div(u.raw(), optimal.raw())?;
            return self.base_rate.checked_add(ramp);
        }

        let excess = u.checked_sub(optimal)?;
        let headroom = Ray::ONE.checked_sub(optimal)?;
        let steep = self.slope_2.mul_div(excess.raw(), headroom.raw())?;
        self.base_rate.checked_add(self.slope_1)?.checked_add(steep)
    }

    /// Annual borrow rate for the pool's current utilization; zero without debt.
    pub fn borrow_rate(&self, pool: &PoolState) -> Result<Ray, ArithmeticError> {
        if pool.total_debt.is_zero() {
            return Ok(Ray::ZERO);
        }
        self.rate_at(pool.utilization()?)
    }

    /// `borrow_rate * utilization * (1 - reserve_factor)`.
    pub fn supply_rate(&self, pool: &PoolState) -> Result<Ray, ArithmeticError> {
        let borrow_rate = self.borrow_rate(pool)?;
        if borrow_rate.is_zero() {
            return Ok(Ray::ZERO);
        }
        let params = &pool.params;
        let supplier_pct = params.precision_base.saturating_sub(params.reserve_factor);
        borrow_rate
            .ray_mul(pool.utilization()?)?
            .mul_div(U256::from(supplier_pct), U256::from(params.precision_base))
    }

    /// Advance the pool's indices by `elapsed_seconds` at the current rate.
    ///
    /// Updates `borrow_index`, `supply_index`, `reserves`, and re-sums the
    /// totals over `ledger` at the new indices, so interest is exactly what
    /// the positions now owe. Leaves `last_accrual_timestamp` to the caller.
    /// A zero interval or zero rate leaves the pool untouched.
    pub fn accrue(
        &self,
        pool: &mut PoolState,
        ledger: &PositionLedger,
        elapsed_seconds: u64,
    ) -> Result<Accrual, ArithmeticError> {
        if elapsed_seconds == 0 {
            return Ok(Accrual::default());
        }
        let borrow_rate = self.borrow_rate(pool)?;
        if borrow_rate.is_zero() {
            return Ok(Accrual::default());
        }

        let growth = compound_interest(borrow_rate, elapsed_seconds)?;
        let borrow_index = pool.borrow_index.ray_mul(growth)?;
        let debt_after = ledger.total_debt_at(borrow_index)?;
        let interest = debt_after.saturating_sub(pool.total_debt);

        let reserve_share = interest.percent_of(pool.params.reserve_factor, pool.params.precision_base)?;
        let supplier_share = interest.checked_sub(reserve_share)?;
        let collateral_before = pool.total_collateral;
        let supply_index = if collateral_before.is_zero() {
            pool.supply_index
        } else {
            pool.supply_index.mul_div(
                collateral_before.checked_add(supplier_share)?.raw(),
                collateral_before.raw(),
            )?
        };
        let collateral_after = ledger.total_collateral_at(supply_index)?;
        let to_suppliers = collateral_after.saturating_sub(collateral_before);
        let to_reserves = interest.saturating_sub(to_suppliers);

        pool.borrow_index = borrow_index;
        pool.supply_index = supply_index;
        pool.total_debt = debt_after;
        pool.total_collateral = collateral_after;
        pool.reserves = pool.reserves.checked_add(to_reserves)?;

        Ok(Accrual {
            borrow_rate,
            interest,
            to_reserves,
            to_suppliers,
        })
    }
}

impl Default for InterestRateModel {
    /// 0% base, 4% at the 80% kink, 79% at full utilization.
    fn default() -> Self {
        Self {
            base_rate: Ray::ZERO,
            slope_1: Ray::from_raw(uint!(40_000_000_000_000_000_000_000_000_U256)),
            slope_2: Ray::from_raw(uint!(750_000_000_000_000_000_000_000_000_U256)),
            optimal_utilization: Ray::from_raw(uint!(800_000_000_000_000_000_000_000_000_U256)),
        }
    }
}
