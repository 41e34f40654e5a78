use crate::errors::ArithmeticError;

use super::pool::PoolState;
use super::wad_ray::{Ray, Wad};

/// One user's balances in the pool.
///
/// Balances are recorded as of the index snapshot taken when the position was
/// last touched; current balances are resolved lazily as
/// `recorded * index_now / index_snapshot`. Entries are never removed, only
/// zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub collateral_amount: Wad,
    pub supply_index_snapshot: Ray,
    pub debt_principal: Wad,
    pub debt_index_snapshot: Ray,
}

impl Position {
    /// Empty position snapshotted at the pool's current indices.
    pub fn new(pool: &PoolState) -> Self {
        Self {
            collateral_amount: Wad::ZERO,
            supply_index_snapshot: pool.supply_index,
            debt_principal: Wad::ZERO,
            debt_index_snapshot: pool.borrow_index,
        }
    }

    /// Collateral including supply interest earned up to `supply_index`.
    pub fn current_collateral(&self, supply_index: Ray) -> Result<Wad, ArithmeticError> {
        if self.collateral_amount.is_zero() {
            return Ok(Wad::ZERO);
        }
        self.collateral_amount
            .mul_ratio(supply_index, self.supply_index_snapshot)
    }

    /// Debt including borrow interest accrued up to `borrow_index`.
    pub fn current_debt(&self, borrow_index: Ray) -> Result<Wad, ArithmeticError> {
        if self.debt_principal.is_zero() {
            return Ok(Wad::ZERO);
        }
        self.debt_principal
            .mul_ratio(borrow_index, self.debt_index_snapshot)
    }

    pub fn has_debt(&self) -> bool {
        !self.debt_principal.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskParameters;
    use alloy::primitives::Address;
    use rust_decimal_macros::dec;

    fn pool() -> PoolState {
        PoolState::new(Address::ZERO, RiskParameters::default(), 0)
    }

    #[test]
    fn test_new_position_is_empty() {
        let p = Position::new(&pool());
        assert_eq!(p.current_collateral(Ray::ONE).unwrap(), Wad::ZERO);
        assert_eq!(p.current_debt(Ray::ONE).unwrap(), Wad::ZERO);
        assert!(!p.has_debt());
    }

    #[test]
    fn test_debt_accrues_with_index() {
        let mut p = Position::new(&pool());
        p.debt_principal = Wad::from_units(100);
        let index = Ray::from_decimal(dec!(1.05)).unwrap();
        assert_eq!(
            p.current_debt(index).unwrap(),
            Wad::from_units(105)
        );
    }

    #[test]
    fn test_snapshot_is_respected() {
        let mut p = Position::new(&pool());
        p.collateral_amount = Wad::from_units(10);
        p.supply_index_snapshot = Ray::from_decimal(dec!(1.25)).unwrap();
        let index = Ray::from_decimal(dec!(1.5)).unwrap();
        assert_eq!(p.current_collateral(index).unwrap(), Wad::from_units(12));
    }

    #[test]
    fn test_zero_snapshot_with_balance_is_an_error() {
        let p = Position {
            collateral_amount: Wad::ONE,
            supply_index_snapshot: Ray::ZERO,
            debt_principal: Wad::ZERO,
            debt_index_snapshot: Ray::ONE,
        };
        assert!(matches!(
            p.current_collateral(Ray::ONE),
            Err(ArithmeticError::DivisionByZero(_))
        ));
    }
}
