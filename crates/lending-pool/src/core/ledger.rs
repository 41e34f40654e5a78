//! Per-user positions and the balance updates applied to them.
//!
//! The free functions here mutate a `(PoolState, Position)` pair and move
//! the pool's totals by exactly the position's change. They perform no risk
//! checks and no transfers; `LendingPool` runs them on working copies and
//! commits only when the whole operation has succeeded.

use std::collections::BTreeMap;

use alloy::primitives::Address;

use crate::errors::{ArithmeticError, PoolError};
use crate::types::{PoolState, Position, Ray, RepayOutcome, Wad};

/// All positions in the pool plus credit-delegation allowances.
///
/// Positions are created on first touch and never removed.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: BTreeMap<Address, Position>,
    /// `(delegator, delegatee) -> amount` the delegatee may borrow against
    /// the delegator's position.
    allowances: BTreeMap<(Address, Address), Wad>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: &Address) -> Option<&Position> {
        self.positions.get(user)
    }

    /// Copy of the user's position, or a fresh one at the pool's indices.
    pub fn position_or_new(&self, user: &Address, pool: &PoolState) -> Position {
        self.positions
            .get(user)
            .copied()
            .unwrap_or_else(|| Position::new(pool))
    }

    pub fn insert(&mut self, user: Address, position: Position) {
        self.positions.insert(user, position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Position)> {
        self.positions.iter()
    }

    pub fn allowance(&self, delegator: &Address, delegatee: &Address) -> Wad {
        self.allowances
            .get(&(*delegator, *delegatee))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_allowance(&mut self, delegator: Address, delegatee: Address, amount: Wad) {
        self.allowances.insert((delegator, delegatee), amount);
    }

    /// Sum of every position's current collateral and debt at the pool's indices.
    pub fn current_totals(&self, pool: &PoolState) -> Result<(Wad, Wad), ArithmeticError> {
        Ok((
            self.total_collateral_at(pool.supply_index)?,
            self.total_debt_at(pool.borrow_index)?,
        ))
    }

    pub fn total_collateral_at(&self, supply_index: Ray) -> Result<Wad, ArithmeticError> {
        self.positions.values().try_fold(Wad::ZERO, |sum, position| {
            sum.checked_add(position.current_collateral(supply_index)?)
        })
    }

    pub fn total_debt_at(&self, borrow_index: Ray) -> Result<Wad, ArithmeticError> {
        self.positions.values().try_fold(Wad::ZERO, |sum, position| {
            sum.checked_add(position.current_debt(borrow_index)?)
        })
    }
}

// ---------------------------------------------------------------------------
// Balance updates
// ---------------------------------------------------------------------------

/// Resolve the position's balances at the current indices, re-snapshot it,
/// and take those balances out of the pool totals. Must be paired with
/// [`reinstate`].
fn settle(pool: &mut PoolState, position: &mut Position) -> Result<(), ArithmeticError> {
    let collateral = position.current_collateral(pool.supply_index)?;
    let debt = position.current_debt(pool.borrow_index)?;
    pool.total_collateral = pool.total_collateral.checked_sub(collateral)?;
    pool.total_debt = pool.total_debt.checked_sub(debt)?;

    position.collateral_amount = collateral;
    position.supply_index_snapshot = pool.supply_index;
    position.debt_principal = debt;
    position.debt_index_snapshot = pool.borrow_index;
    Ok(())
}

/// Put the settled position's balances back into the pool totals. A
/// position snapshotted at the current indices is worth exactly its
/// recorded amounts.
fn reinstate(pool: &mut PoolState, position: &Position) -> Result<(), ArithmeticError> {
    pool.total_collateral = pool.total_collateral.checked_add(position.collateral_amount)?;
    pool.total_debt = pool.total_debt.checked_add(position.debt_principal)?;
    Ok(())
}

fn require_positive(amount: Wad, operation: &'static str) -> Result<(), PoolError> {
    if amount.is_zero() {
        return Err(PoolError::InvalidAmount { operation });
    }
    Ok(())
}

/// Add `amount` to the position's collateral.
pub fn deposit(pool: &mut PoolState, position: &mut Position, amount: Wad) -> Result<(), PoolError> {
    require_positive(amount, "deposit")?;
    settle(pool, position)?;
    position.collateral_amount = position.collateral_amount.checked_add(amount)?;
    reinstate(pool, position)?;
    Ok(())
}

/// Remove `amount` of collateral. No health check; callers gate this.
pub fn withdraw(pool: &mut PoolState, position: &mut Position, amount: Wad) -> Result<(), PoolError> {
    require_positive(amount, "withdraw")?;
    settle(pool, position)?;
    if amount > position.collateral_amount {
        return Err(PoolError::ExceedsBalance {
            operation: "withdraw",
            requested: amount,
            available: position.collateral_amount,
        });
    }
    position.collateral_amount = position.collateral_amount.checked_sub(amount)?;
    reinstate(pool, position)?;
    Ok(())
}

/// Add `amount` to the position's debt. No loan-to-value check; callers gate this.
pub fn borrow(pool: &mut PoolState, position: &mut Position, amount: Wad) -> Result<(), PoolError> {
    require_positive(amount, "borrow")?;
    settle(pool, position)?;
    position.debt_principal = position.debt_principal.checked_add(amount)?;
    reinstate(pool, position)?;
    Ok(())
}

/// Reduce debt by `min(amount, current_debt)`; the rest is reported as refund.
pub fn repay(pool: &mut PoolState, position: &mut Position, amount: Wad) -> Result<RepayOutcome, PoolError> {
    require_positive(amount, "repay")?;
    settle(pool, position)?;
    let applied = amount.min(position.debt_principal);
    position.debt_principal = position.debt_principal.checked_sub(applied)?;
    reinstate(pool, position)?;
    Ok(RepayOutcome {
        applied,
        refund: amount.checked_sub(applied)?,
        remaining_debt: position.debt_principal,
    })
}
