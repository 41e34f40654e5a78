//! Asset custody: the single transfer capability the engine needs.
//!
//! Native value transfers and ERC-20 style tokens are both expressed as
//! balance moves between accounts. The engine never needs to know which.

use std::collections::HashMap;

use alloy::primitives::Address;
use tracing::debug;

use crate::errors::TransferError;
use crate::types::Wad;

/// Balance ledger for the pool asset.
pub trait AssetCustody {
    fn balance_of(&self, account: &Address) -> Wad;

    /// Move `amount` from `from` to `to`. Fails without moving anything.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Wad) -> Result<(), TransferError>;
}

/// In-memory balances, used by the replay binary and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVault {
    balances: HashMap<Address, Wad>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` out of thin air, e.g. to fund test accounts.
    pub fn mint(&mut self, account: Address, amount: Wad) -> Result<(), TransferError> {
        let balance = self.balance_of(&account);
        let updated = balance
            .checked_add(amount)
            .map_err(|_| TransferError::BalanceOverflow { account })?;
        self.balances.insert(account, updated);
        Ok(())
    }
}

impl AssetCustody for InMemoryVault {
    fn balance_of(&self, account: &Address) -> Wad {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Wad) -> Result<(), TransferError> {
        if amount.is_zero() || from == to {
            return Ok(());
        }
        let from_balance = self.balance_of(from);
        let debited = from_balance
            .checked_sub(amount)
            .map_err(|_| TransferError::InsufficientFunds {
                account: *from,
                balance: from_balance,
                requested: amount,
            })?;
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .map_err(|_| TransferError::BalanceOverflow { account: *to })?;

        self.balances.insert(*from, debited);
        self.balances.insert(*to, credited);
        debug!(from = %from, to = %to, amount = %amount, "transfer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};

    const A: Address = address!("000000000000000000000000000000000000000a");
    const B: Address = address!("000000000000000000000000000000000000000b");

    #[test]
    fn test_transfer_moves_balance() {
        let mut vault = InMemoryVault::new();
        vault.mint(A, Wad::from_units(5)).unwrap();
        vault.transfer(&A, &B, Wad::from_units(2)).unwrap();
        assert_eq!(vault.balance_of(&A), Wad::from_units(3));
        assert_eq!(vault.balance_of(&B), Wad::from_units(2));
    }

    #[test]
    fn test_insufficient_funds_moves_nothing() {
        let mut vault = InMemoryVault::new();
        vault.mint(A, Wad::ONE).unwrap();
        let err = vault.transfer(&A, &B, Wad::from_units(2)).unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                account: A,
                balance: Wad::ONE,
                requested: Wad::from_units(2),
            }
        );
        assert_eq!(vault.balance_of(&A), Wad::ONE);
        assert_eq!(vault.balance_of(&B), Wad::ZERO);
    }

    #[test]
    fn test_credit_overflow_moves_nothing() {
        let mut vault = InMemoryVault::new();
        vault.mint(A, Wad::ONE).unwrap();
        vault.mint(B, Wad::from_raw(U256::MAX)).unwrap();
        let err = vault.transfer(&A, &B, Wad::ONE).unwrap_err();
        assert_eq!(err, TransferError::BalanceOverflow { account: B });
        assert_eq!(vault.balance_of(&A), Wad::ONE);
    }
}
