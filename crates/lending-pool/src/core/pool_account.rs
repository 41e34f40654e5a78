use tracing::debug;

use crate::errors::{ArithmeticError, PoolError};
use crate::types::{PoolState, Ray, Wad};

use super::interest_rate::{Accrual, InterestRateModel};
use super::ledger::PositionLedger;

/// Pool-level state plus the rate model that drives its accrual.
#[derive(Debug, Clone)]
pub struct PoolAccount {
    state: PoolState,
    model: InterestRateModel,
}

impl PoolAccount {
    pub fn new(state: PoolState, model: InterestRateModel) -> Self {
        Self { state, model }
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut PoolState {
        &mut self.state
    }

    pub fn model(&self) -> &InterestRateModel {
        &self.model
    }

    /// `(borrow_rate, supply_rate)` at the current utilization.
    pub fn current_rates(&self) -> Result<(Ray, Ray), ArithmeticError> {
        Ok((
            self.model.borrow_rate(&self.state)?,
            self.model.supply_rate(&self.state)?,
        ))
    }

    /// Bring indices up to `now` and re-sum the totals over `ledger`. Does
    /// nothing unless `now` is past the last accrual, so repeated calls with
    /// the same `now` are no-ops.
    pub fn accrue_if_needed(&mut self, now: u64, ledger: &PositionLedger) -> Result<Accrual, ArithmeticError> {
        let last = self.state.last_accrual_timestamp;
        if now <= last {
            return Ok(Accrual::default());
        }
        let elapsed = now - last;
        let accrual = self.model.accrue(&mut self.state, ledger, elapsed)?;
        self.state.last_accrual_timestamp = now;

        if !accrual.interest.is_zero() {
            debug!(
                elapsed,
                borrow_rate = %accrual.borrow_rate.to_apr_percent(),
                interest = %accrual.interest,
                to_reserves = %accrual.to_reserves,
                borrow_index = %self.state.borrow_index,
                supply_index = %self.state.supply_index,
                "interest accrued"
            );
        }
        Ok(accrual)
    }

    /// Check that the recorded totals equal the sum of all positions'
    /// current balances.
    pub fn verify_totals(&self, ledger: &PositionLedger) -> Result<(), PoolError> {
        let (collateral, debt) = ledger.current_totals(&self.state)?;
        check_equal("total_collateral", self.state.total_collateral, collateral)?;
        check_equal("total_debt", self.state.total_debt, debt)
    }
}

fn check_equal(field: &'static str, recorded: Wad, computed: Wad) -> Result<(), PoolError> {
    if recorded != computed {
        return Err(PoolError::InvariantViolated {
            field,
            recorded,
            computed,
        });
    }
    Ok(())
}
