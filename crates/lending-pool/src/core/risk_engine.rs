//! Health factor, borrow/withdraw limits and liquidation.
//!
//! Collateral is valued at the oracle price; debt is valued at par. Every
//! threshold test is an exact integer comparison of cross-multiplied values,
//! so positions sitting exactly on a boundary are classified correctly.
//!
//! With collateral `c`, debt `d`, price `p` (all WAD) and a threshold `t`
//! scaled by `base`:
//!
//!   HF = c·p·t / (d·base)          (WAD, floor)
//!   HF ≥ 1  ⇔  c·p·t ≥ d·base·1e18

use alloy::primitives::U256;
use tracing::debug;

use crate::errors::{ArithmeticError, PoolError, RiskError};
use crate::types::wad_ray::{div, mul, sub};
use crate::types::{AccountSnapshot, HealthFactor, PoolState, Position, Wad};

use super::ledger;

/// Risk-weighted collateral value scaled by `base`: `c · p · weight`, WAD².
fn weighted_collateral(collateral: Wad, price: Wad, weight: u64) -> Result<U256, ArithmeticError> {
    let op = "weighted_collateral";
    mul(mul(collateral.raw(), price.raw(), op)?, U256::from(weight), op)
}

/// Debt value in the same units as [`weighted_collateral`]: `d · base · 1e18`.
fn scaled_debt_value(debt: Wad, base: u64) -> Result<U256, ArithmeticError> {
    let op = "scaled_debt_value";
    mul(mul(debt.raw(), U256::from(base), op)?, Wad::ONE.raw(), op)
}

fn balances(position: &Position, pool: &PoolState) -> Result<(Wad, Wad), ArithmeticError> {
    Ok((
        position.current_collateral(pool.supply_index)?,
        position.current_debt(pool.borrow_index)?,
    ))
}

fn health_factor_of(collateral: Wad, debt: Wad, price: Wad, pool: &PoolState) -> Result<HealthFactor, ArithmeticError> {
    if debt.is_zero() {
        return Ok(HealthFactor::Infinite);
    }
    let op = "health_factor";
    let params = &pool.params;
    let numerator = weighted_collateral(collateral, price, params.liquidation_threshold)?;
    let denominator = mul(debt.raw(), U256::from(params.precision_base), op)?;
    Ok(HealthFactor::Finite(Wad::from_raw(div(numerator, denominator, op)?)))
}

/// Current health factor; `Infinite` for a debt-free position.
pub fn health_factor(position: &Position, pool: &PoolState, price: Wad) -> Result<HealthFactor, ArithmeticError> {
    let (collateral, debt) = balances(position, pool)?;
    health_factor_of(collateral, debt, price, pool)
}

/// Additional debt the position could take on at the loan-to-value limit.
pub fn available_borrow(position: &Position, pool: &PoolState, price: Wad) -> Result<Wad, ArithmeticError> {
    let (collateral, debt) = balances(position, pool)?;
    let op = "available_borrow";
    let limit = div(
        weighted_collateral(collateral, price, pool.params.loan_to_value)?,
        mul(U256::from(pool.params.precision_base), Wad::ONE.raw(), op)?,
        op,
    )?;
    Ok(Wad::from_raw(limit).saturating_sub(debt))
}

/// Whether debt plus `requested` stays within the loan-to-value limit.
pub fn can_borrow(position: &Position, pool: &PoolState, price: Wad, requested: Wad) -> Result<bool, ArithmeticError> {
    let (collateral, debt) = balances(position, pool)?;
    let params = &pool.params;
    let debt_after = debt.checked_add(requested)?;
    Ok(scaled_debt_value(debt_after, params.precision_base)?
        <= weighted_collateral(collateral, price, params.loan_to_value)?)
}

/// Whether removing `requested` collateral leaves the position healthy.
pub fn can_withdraw(position: &Position, pool: &PoolState, price: Wad, requested: Wad) -> Result<bool, ArithmeticError> {
    let (collateral, debt) = balances(position, pool)?;
    if requested > collateral {
        return Ok(false);
    }
    if debt.is_zero() {
        return Ok(true);
    }
    let remaining = collateral.checked_sub(requested)?;
    let params = &pool.params;
    Ok(weighted_collateral(remaining, price, params.liquidation_threshold)?
        >= scaled_debt_value(debt, params.precision_base)?)
}

/// `HF < 1` with non-zero debt.
pub fn is_liquidatable(position: &Position, pool: &PoolState, price: Wad) -> Result<bool, ArithmeticError> {
    let (collateral, debt) = balances(position, pool)?;
    if debt.is_zero() {
        return Ok(false);
    }
    let params = &pool.params;
    Ok(weighted_collateral(collateral, price, params.liquidation_threshold)?
        < scaled_debt_value(debt, params.precision_base)?)
}

/// Account view at `price`.
pub fn account_snapshot(position: &Position, pool: &PoolState, price: Wad) -> Result<AccountSnapshot, ArithmeticError> {
    let (collateral, debt) = balances(position, pool)?;
    Ok(AccountSnapshot {
        collateral,
        debt,
        collateral_value: collateral.wad_mul(price)?,
        debt_value: debt,
        available_borrow: available_borrow(position, pool, price)?,
        loan_to_value: pool.params.loan_to_value_ratio(),
        liquidation_threshold: pool.params.liquidation_threshold_ratio(),
        health_factor: health_factor_of(collateral, debt, price, pool)?,
        shortfall: shortfall(position, pool, price)?,
        max_liquidatable_debt: max_liquidatable_debt(position, pool, price)?,
    })
}

// ---------------------------------------------------------------------------
// Liquidation
// ---------------------------------------------------------------------------

/// Amounts a liquidation will move, decided before anything is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationPlan {
    pub repay_applied: Wad,
    pub collateral_seized: Wad,
    pub health_factor_before: HealthFactor,
}

/// Size a liquidation of `position`.
///
/// The repay amount is capped at `close_factor × current_debt`; the seized
/// collateral is the repaid value converted at `price` plus the bonus,
/// rounded down.
pub fn plan_liquidation(
    position: &Position,
    pool: &PoolState,
    price: Wad,
    repay_amount: Wad,
) -> Result<LiquidationPlan, PoolError> {
    if repay_amount.is_zero() {
        return Err(PoolError::InvalidAmount {
            operation: "liquidation",
        });
    }
    let (collateral, debt) = balances(position, pool)?;
    let health_factor_before = health_factor_of(collateral, debt, price, pool)?;
    if !is_liquidatable(position, pool, price)? {
        return Err(RiskError::NotLiquidatable {
            health_factor: health_factor_before,
        }
        .into());
    }

    let params = &pool.params;
    let max_repay = debt.percent_of(params.liquidation_close_factor, params.precision_base)?;
    let repay_applied = repay_amount.min(max_repay);

    let op = "collateral_seized";
    let seized = div(
        mul(mul(repay_applied.raw(), Wad::ONE.raw(), op)?, U256::from(params.liquidation_bonus), op)?,
        mul(price.raw(), U256::from(params.precision_base), op)?,
        op,
    )?;
    let collateral_seized = Wad::from_raw(seized);
    if collateral_seized > collateral {
        return Err(RiskError::InsufficientCollateral {
            required: collateral_seized,
            available: collateral,
        }
        .into());
    }

    debug!(
        requested = %repay_amount,
        max_repay = %max_repay,
        repay_applied = %repay_applied,
        collateral_seized = %collateral_seized,
        "liquidation sized"
    );

    Ok(LiquidationPlan {
        repay_applied,
        collateral_seized,
        health_factor_before,
    })
}

/// Size and apply a liquidation to the borrower's position: repay the
/// capped amount and remove the seized collateral. Crediting the liquidator
/// is left to the caller.
pub fn liquidate(
    pool: &mut PoolState,
    position: &mut Position,
    price: Wad,
    repay_amount: Wad,
) -> Result<LiquidationPlan, PoolError> {
    let plan = plan_liquidation(position, pool, price, repay_amount)?;
    if !plan.repay_applied.is_zero() {
        ledger::repay(pool, position, plan.repay_applied)?;
    }
    if !plan.collateral_seized.is_zero() {
        ledger::withdraw(pool, position, plan.collateral_seized)?;
    }
    Ok(plan)
}

/// Most debt one liquidation may repay at `price`: `close_factor × current_debt`
/// while the position is liquidatable, zero otherwise.
pub fn max_liquidatable_debt(position: &Position, pool: &PoolState, price: Wad) -> Result<Wad, ArithmeticError> {
    if !is_liquidatable(position, pool, price)? {
        return Ok(Wad::ZERO);
    }
    let debt = position.current_debt(pool.borrow_index)?;
    debt.percent_of(pool.params.liquidation_close_factor, pool.params.precision_base)
}

/// Shortfall of risk-weighted collateral against debt, in base units; zero
/// for a healthy position.
pub fn shortfall(position: &Position, pool: &PoolState, price: Wad) -> Result<Wad, ArithmeticError> {
    let (collateral, debt) = balances(position, pool)?;
    let params = &pool.params;
    let weighted = weighted_collateral(collateral, price, params.liquidation_threshold)?;
    let owed = scaled_debt_value(debt, params.precision_base)?;
    if weighted >= owed {
        return Ok(Wad::ZERO);
    }
    let op = "shortfall";
    let scale = mul(U256::from(params.precision_base), Wad::ONE.raw(), op)?;
    Ok(Wad::from_raw(div(sub(owed, weighted, op)?, scale, op)?))
}
