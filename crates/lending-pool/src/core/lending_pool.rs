//! The pool's public operations.
//!
//! Every operation follows the same shape: accrue interest on a working copy
//! of the pool, update working copies of the affected positions, run the
//! risk checks, verify that every balance a transfer needs is there, move
//! funds, and only then commit the working copies. Any failure before the
//! commit leaves the pool exactly as it was.
//!
//! The oracle is read at most once per operation, and only by operations
//! whose outcome depends on price.

use alloy::primitives::Address;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::config::validate::validate_address;
use crate::errors::{PoolError, RiskError, TransferError};
use crate::execution::AssetCustody;
use crate::types::{
    AccountSnapshot, HealthFactor, LiquidationPayout, LiquidationResult, PoolState, Position, Ray,
    RepayOutcome, RiskParameters, Wad,
};

use super::clock::Clock;
use super::interest_rate::{Accrual, InterestRateModel};
use super::ledger::{self, PositionLedger};
use super::oracle::{PriceFeed, PriceOracleAdapter};
use super::pool_account::PoolAccount;
use super::risk_engine;

/// Single-asset lending pool.
///
/// `C` holds the asset balances (the pool's own cash sits under `address`),
/// `F` is the price feed behind the oracle adapter.
pub struct LendingPool<C, F> {
    address: Address,
    account: PoolAccount,
    ledger: PositionLedger,
    oracle: PriceOracleAdapter<F>,
    custody: C,
    clock: Box<dyn Clock>,
}

impl<C: AssetCustody, F: PriceFeed> LendingPool<C, F> {
    /// Create a pool for `asset` with immutable risk parameters.
    pub fn new(
        address: Address,
        asset: Address,
        params: RiskParameters,
        model: InterestRateModel,
        oracle: PriceOracleAdapter<F>,
        custody: C,
        clock: Box<dyn Clock>,
    ) -> Result<Self, PoolError> {
        let mut violations = params.violations();
        violations.extend(model.violations());
        if !violations.is_empty() {
            return Err(PoolError::Config(violations.join("; ")));
        }
        let now = clock.now();
        info!(
            pool = %address,
            asset = %asset,
            loan_to_value = params.loan_to_value,
            liquidation_threshold = params.liquidation_threshold,
            liquidation_bonus = params.liquidation_bonus,
            liquidation_close_factor = params.liquidation_close_factor,
            reserve_factor = params.reserve_factor,
            precision_base = params.precision_base,
            "lending pool created"
        );
        Ok(Self {
            address,
            account: PoolAccount::new(PoolState::new(asset, params, now), model),
            ledger: PositionLedger::new(),
            oracle,
            custody,
            clock,
        })
    }

    /// Build from validated configuration.
    pub fn from_config(
        config: &EngineConfig,
        address: Address,
        feed: F,
        custody: C,
        clock: Box<dyn Clock>,
    ) -> Result<Self, PoolError> {
        let asset = validate_address(&config.pool.asset).map_err(PoolError::Config)?;
        let model = InterestRateModel::from_config(&config.interest)?;
        let oracle = PriceOracleAdapter::from_config(feed, &config.oracle);
        Self::new(
            address,
            asset,
            config.pool.risk_parameters(),
            model,
            oracle,
            custody,
            clock,
        )
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Supply `amount` of `asset` as collateral. Returns the caller's new
    /// collateral balance.
    pub fn deposit(&mut self, caller: Address, asset: Address, amount: Wad) -> Result<Wad, PoolError> {
        let result = self.try_deposit(caller, asset, amount);
        log_rejection("deposit", &caller, amount, &result);
        result
    }

    fn try_deposit(&mut self, caller: Address, asset: Address, amount: Wad) -> Result<Wad, PoolError> {
        self.ensure_asset(asset)?;
        require_positive(amount, "deposit")?;

        let mut account = self.accrued()?;
        let mut position = self.ledger.position_or_new(&caller, account.state());
        ledger::deposit(account.state_mut(), &mut position, amount)?;

        self.custody.transfer(&caller, &self.address, amount)?;
        self.commit(account, &[(caller, position)]);

        info!(
            user = %caller,
            amount = %amount,
            collateral = %position.collateral_amount,
            total_collateral = %self.account.state().total_collateral,
            "deposit"
        );
        Ok(position.collateral_amount)
    }

    /// Borrow `amount` against `beneficiary`'s collateral; funds go to
    /// `caller`. Borrowing on another account's behalf consumes the credit
    /// delegation it granted to `caller`. Returns the beneficiary's health
    /// factor after the borrow.
    pub fn borrow(&mut self, caller: Address, amount: Wad, beneficiary: Address) -> Result<HealthFactor, PoolError> {
        let result = self.try_borrow(caller, amount, beneficiary);
        log_rejection("borrow", &caller, amount, &result);
        result
    }

    fn try_borrow(&mut self, caller: Address, amount: Wad, beneficiary: Address) -> Result<HealthFactor, PoolError> {
        require_positive(amount, "borrow")?;

        let remaining_allowance = if beneficiary != caller {
            let allowance = self.ledger.allowance(&beneficiary, &caller);
            if amount > allowance {
                return Err(RiskError::InsufficientDelegation {
                    requested: amount,
                    allowance,
                }
                .into());
            }
            Some(allowance.checked_sub(amount)?)
        } else {
            None
        };

        let now = self.clock.now();
        let mut account = self.accrued_at(now)?;
        let mut position = self.ledger.position_or_new(&beneficiary, account.state());

        let price = self.oracle.get_price(now)?;
        if !risk_engine::can_borrow(&position, account.state(), price, amount)? {
            return Err(RiskError::ExceedsLoanToValue {
                requested: amount,
                available: risk_engine::available_borrow(&position, account.state(), price)?,
            }
            .into());
        }
        self.ensure_liquidity(amount, Wad::ZERO)?;

        ledger::borrow(account.state_mut(), &mut position, amount)?;
        let health_factor = risk_engine::health_factor(&position, account.state(), price)?;

        self.custody.transfer(&self.address, &caller, amount)?;
        self.commit(account, &[(beneficiary, position)]);
        if let Some(remaining) = remaining_allowance {
            self.ledger.set_allowance(beneficiary, caller, remaining);
        }

        info!(
            user = %caller,
            on_behalf_of = %beneficiary,
            amount = %amount,
            price = %price,
            debt = %position.debt_principal,
            health_factor = %health_factor,
            "borrow"
        );
        Ok(health_factor)
    }

    /// Repay up to `amount` of `beneficiary`'s debt from `payer`'s funds.
    /// Only the applied amount is taken; the excess is reported as refund.
    pub fn repay(&mut self, payer: Address, beneficiary: Address, amount: Wad) -> Result<RepayOutcome, PoolError> {
        let result = self.try_repay(payer, beneficiary, amount);
        log_rejection("repay", &payer, amount, &result);
        result
    }

    fn try_repay(&mut self, payer: Address, beneficiary: Address, amount: Wad) -> Result<RepayOutcome, PoolError> {
        require_positive(amount, "repay")?;

        let mut account = self.accrued()?;
        let mut position = self.ledger.position_or_new(&beneficiary, account.state());
        let outcome = ledger::repay(account.state_mut(), &mut position, amount)?;

        self.custody.transfer(&payer, &self.address, outcome.applied)?;
        if self.ledger.get(&beneficiary).is_some() {
            self.commit(account, &[(beneficiary, position)]);
        } else {
            self.commit(account, &[]);
        }

        info!(
            user = %payer,
            on_behalf_of = %beneficiary,
            applied = %outcome.applied,
            refund = %outcome.refund,
            remaining_debt = %outcome.remaining_debt,
            "repay"
        );
        Ok(outcome)
    }

    /// Withdraw `amount` of collateral. Returns the caller's remaining
    /// collateral balance.
    pub fn withdraw(&mut self, caller: Address, amount: Wad, asset: Address) -> Result<Wad, PoolError> {
        let result = self.try_withdraw(caller, amount, asset);
        log_rejection("withdraw", &caller, amount, &result);
        result
    }

    fn try_withdraw(&mut self, caller: Address, amount: Wad, asset: Address) -> Result<Wad, PoolError> {
        self.ensure_asset(asset)?;
        require_positive(amount, "withdraw")?;

        let now = self.clock.now();
        let mut account = self.accrued_at(now)?;
        let before = self.ledger.position_or_new(&caller, account.state());
        let mut position = before;
        ledger::withdraw(account.state_mut(), &mut position, amount)?;

        if before.has_debt() {
            let price = self.oracle.get_price(now)?;
            if !risk_engine::can_withdraw(&before, account.state(), price, amount)? {
                return Err(RiskError::WithdrawalUnsafe {
                    requested: amount,
                    health_factor: risk_engine::health_factor(&position, account.state(), price)?,
                }
                .into());
            }
        }
        self.ensure_liquidity(amount, Wad::ZERO)?;

        self.custody.transfer(&self.address, &caller, amount)?;
        self.commit(account, &[(caller, position)]);

        info!(
            user = %caller,
            amount = %amount,
            collateral = %position.collateral_amount,
            "withdraw"
        );
        Ok(position.collateral_amount)
    }

    /// Liquidate an unhealthy position.
    ///
    /// `liquidator` repays up to the close-factor share of `borrower`'s debt
    /// and receives the equivalent collateral plus the bonus, either
    /// transferred out (`receive_collateral`) or credited to the
    /// liquidator's own position as supplied collateral.
    pub fn liquidation_call(
        &mut self,
        liquidator: Address,
        borrower: Address,
        repay_amount: Wad,
        receive_collateral: bool,
    ) -> Result<LiquidationResult, PoolError> {
        let result = self.try_liquidation_call(liquidator, borrower, repay_amount, receive_collateral);
        log_rejection("liquidation", &liquidator, repay_amount, &result);
        result
    }

    fn try_liquidation_call(
        &mut self,
        liquidator: Address,
        borrower: Address,
        repay_amount: Wad,
        receive_collateral: bool,
    ) -> Result<LiquidationResult, PoolError> {
        require_positive(repay_amount, "liquidation")?;

        let now = self.clock.now();
        let mut account = self.accrued_at(now)?;
        let mut position = self.ledger.position_or_new(&borrower, account.state());

        let price = self.oracle.get_price(now)?;
        let plan = risk_engine::liquidate(account.state_mut(), &mut position, price, repay_amount)?;

        let balance = self.custody.balance_of(&liquidator);
        if balance < plan.repay_applied {
            return Err(TransferError::InsufficientFunds {
                account: liquidator,
                balance,
                requested: plan.repay_applied,
            }
            .into());
        }

        let (payout, liquidator_position) = if receive_collateral {
            self.ensure_liquidity(plan.collateral_seized, plan.repay_applied)?;
            (LiquidationPayout::Transferred, None)
        } else {
            let mut credited = if liquidator == borrower {
                position
            } else {
                self.ledger.position_or_new(&liquidator, account.state())
            };
            if !plan.collateral_seized.is_zero() {
                ledger::deposit(account.state_mut(), &mut credited, plan.collateral_seized)?;
            }
            (LiquidationPayout::Supplied, Some(credited))
        };

        // A self-liquidation's credit lands back on the borrower's own position.
        let borrower_after = match liquidator_position {
            Some(credited) if liquidator == borrower => credited,
            _ => position,
        };
        let health_factor_after = risk_engine::health_factor(&borrower_after, account.state(), price)?;

        self.custody.transfer(&liquidator, &self.address, plan.repay_applied)?;
        if payout == LiquidationPayout::Transferred {
            if let Err(e) = self.custody.transfer(&self.address, &liquidator, plan.collateral_seized) {
                error!(error = %e, "collateral payout failed, returning repayment");
                self.custody.transfer(&self.address, &liquidator, plan.repay_applied)?;
                return Err(e.into());
            }
        }

        match liquidator_position {
            Some(credited) if liquidator != borrower => {
                self.commit(account, &[(borrower, position), (liquidator, credited)])
            }
            _ => self.commit(account, &[(borrower, borrower_after)]),
        }

        info!(
            liquidator = %liquidator,
            borrower = %borrower,
            price = %price,
            requested = %repay_amount,
            repaid = %plan.repay_applied,
            seized = %plan.collateral_seized,
            hf_before = %plan.health_factor_before,
            hf_after = %health_factor_after,
            receive_collateral,
            "liquidation"
        );

        Ok(LiquidationResult {
            borrower,
            liquidator,
            repay_applied: plan.repay_applied,
            collateral_seized: plan.collateral_seized,
            payout,
            health_factor_before: plan.health_factor_before,
            health_factor_after,
        })
    }

    /// Let `delegatee` borrow up to `amount` against `delegator`'s position.
    /// Replaces any previous allowance.
    pub fn approve_delegation(&mut self, delegator: Address, delegatee: Address, amount: Wad) {
        self.ledger.set_allowance(delegator, delegatee, amount);
        info!(delegator = %delegator, delegatee = %delegatee, amount = %amount, "credit delegation approved");
    }

    /// Run accrual up to the clock's current time.
    pub fn accrue(&mut self) -> Result<Accrual, PoolError> {
        let now = self.clock.now();
        Ok(self.account.accrue_if_needed(now, &self.ledger)?)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn asset(&self) -> Address {
        self.account.state().asset
    }

    /// Pool state as of the last operation.
    pub fn pool_state(&self) -> &PoolState {
        self.account.state()
    }

    /// Stored position, balances as of its last update.
    pub fn position(&self, user: &Address) -> Option<Position> {
        self.ledger.get(user).copied()
    }

    pub fn positions(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn borrow_allowance(&self, delegator: &Address, delegatee: &Address) -> Wad {
        self.ledger.allowance(delegator, delegatee)
    }

    /// `(borrow_rate, supply_rate)` at the current utilization, annual RAY.
    pub fn current_rates(&self) -> Result<(Ray, Ray), PoolError> {
        Ok(self.account.current_rates()?)
    }

    /// Account view with interest accrued to now, at the current oracle price.
    pub fn account_snapshot(&self, user: &Address) -> Result<AccountSnapshot, PoolError> {
        let now = self.clock.now();
        let account = self.accrued_at(now)?;
        let position = self.ledger.position_or_new(user, account.state());
        let price = self.oracle.get_price(now)?;
        Ok(risk_engine::account_snapshot(&position, account.state(), price)?)
    }

    /// Check the recorded totals against the sum of all positions.
    pub fn check_invariants(&self) -> Result<(), PoolError> {
        self.account.verify_totals(&self.ledger)
    }

    pub fn oracle(&self) -> &PriceOracleAdapter<F> {
        &self.oracle
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn accrued(&self) -> Result<PoolAccount, PoolError> {
        self.accrued_at(self.clock.now())
    }

    /// Working copy of the pool account, accrued to `now`.
    fn accrued_at(&self, now: u64) -> Result<PoolAccount, PoolError> {
        let mut account = self.account.clone();
        account.accrue_if_needed(now, &self.ledger)?;
        Ok(account)
    }

    fn commit(&mut self, account: PoolAccount, positions: &[(Address, Position)]) {
        self.account = account;
        for (user, position) in positions {
            self.ledger.insert(*user, *position);
        }
    }

    fn ensure_asset(&self, asset: Address) -> Result<(), PoolError> {
        let expected = self.asset();
        if asset != expected {
            return Err(PoolError::UnsupportedAsset { asset, expected });
        }
        Ok(())
    }

    /// Pool cash, plus `incoming` about to be received, must cover `amount`.
    fn ensure_liquidity(&self, amount: Wad, incoming: Wad) -> Result<(), PoolError> {
        let available = self.custody.balance_of(&self.address).checked_add(incoming)?;
        if amount > available {
            return Err(PoolError::InsufficientLiquidity {
                requested: amount,
                available,
            });
        }
        Ok(())
    }
}

fn require_positive(amount: Wad, operation: &'static str) -> Result<(), PoolError> {
    if amount.is_zero() {
        return Err(PoolError::InvalidAmount { operation });
    }
    Ok(())
}

fn log_rejection<T>(operation: &'static str, user: &Address, amount: Wad, result: &Result<T, PoolError>) {
    if let Err(e) = result {
        warn!(operation, user = %user, amount = %amount, error = %e, "operation rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::oracle::MockAggregator;
    use crate::errors::OracleError;
    use crate::execution::InMemoryVault;
    use alloy::primitives::address;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const POOL: Address = address!("00000000000000000000000000000000000000f0");
    const ASSET: Address = address!("0000000000000000000000000000000000000001");
    const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0000000000000000000000000000000000000b0b");
    const START: u64 = 1_700_000_000;

    type TestPool = LendingPool<InMemoryVault, Arc<MockAggregator>>;

    fn wad(d: Decimal) -> Wad {
        Wad::from_decimal(d).unwrap()
    }

    fn setup() -> (TestPool, Arc<MockAggregator>, Arc<ManualClock>) {
        let feed = Arc::new(MockAggregator::new(8, 100_000_000, START));
        let clock = Arc::new(ManualClock::new(START));
        let mut vault = InMemoryVault::new();
        vault.mint(ALICE, Wad::from_units(100)).unwrap();
        vault.mint(BOB, Wad::from_units(100)).unwrap();
        let pool = LendingPool::new(
            POOL,
            ASSET,
            RiskParameters::default(),
            InterestRateModel::default(),
            PriceOracleAdapter::new(feed.clone(), 3_600),
            vault,
            Box::new(clock.clone()),
        )
        .unwrap();
        (pool, feed, clock)
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let feed = MockAggregator::new(8, 1, 0);
        let params = RiskParameters {
            loan_to_value: 90,
            ..RiskParameters::default()
        };
        let result = LendingPool::new(
            POOL,
            ASSET,
            params,
            InterestRateModel::default(),
            PriceOracleAdapter::new(feed, 1),
            InMemoryVault::new(),
            Box::new(ManualClock::new(0)),
        );
        assert!(matches!(result, Err(PoolError::Config(_))));
    }

    #[test]
    fn test_invalid_rate_curve_rejected() {
        let model = InterestRateModel {
            optimal_utilization: Ray::ZERO,
            ..InterestRateModel::default()
        };
        let result = LendingPool::new(
            POOL,
            ASSET,
            RiskParameters::default(),
            model,
            PriceOracleAdapter::new(MockAggregator::new(8, 1, 0), 1),
            InMemoryVault::new(),
            Box::new(ManualClock::new(0)),
        );
        match result {
            Err(PoolError::Config(msg)) => assert!(msg.contains("optimal_utilization"), "{msg}"),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("pool accepted an invalid rate curve"),
        }
    }

    #[test]
    fn test_deposit_moves_funds() {
        let (mut pool, _, _) = setup();
        let collateral = pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        assert_eq!(collateral, Wad::from_units(10));
        assert_eq!(pool.custody().balance_of(&ALICE), Wad::from_units(90));
        assert_eq!(pool.custody().balance_of(&POOL), Wad::from_units(10));
        assert_eq!(pool.pool_state().total_collateral, Wad::from_units(10));
    }

    #[test]
    fn test_deposit_rejects_other_asset() {
        let (mut pool, _, _) = setup();
        let err = pool.deposit(ALICE, Address::ZERO, Wad::ONE).unwrap_err();
        assert_eq!(
            err,
            PoolError::UnsupportedAsset {
                asset: Address::ZERO,
                expected: ASSET
            }
        );
        assert!(pool.position(&ALICE).is_none());
    }

    #[test]
    fn test_deposit_without_funds_changes_nothing() {
        let (mut pool, _, _) = setup();
        let err = pool.deposit(ALICE, ASSET, Wad::from_units(101)).unwrap_err();
        assert!(matches!(err, PoolError::Transfer(TransferError::InsufficientFunds { .. })));
        assert!(pool.position(&ALICE).is_none());
        assert_eq!(pool.pool_state().total_collateral, Wad::ZERO);
    }

    #[test]
    fn test_deposit_does_not_read_oracle() {
        let (mut pool, feed, _) = setup();
        feed.set_answer(0, START);
        pool.deposit(ALICE, ASSET, Wad::ONE).unwrap();
        pool.repay(ALICE, ALICE, Wad::ONE).unwrap();
    }

    #[test]
    fn test_borrow_fails_on_stale_oracle_without_side_effects() {
        let (mut pool, _, clock) = setup();
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        clock.advance(3_601);
        let state_before = pool.pool_state().clone();
        let err = pool.borrow(ALICE, Wad::ONE, ALICE).unwrap_err();
        assert!(matches!(err, PoolError::Oracle(OracleError::StalePrice { .. })));
        assert_eq!(pool.pool_state(), &state_before);
        assert_eq!(pool.position(&ALICE).unwrap().debt_principal, Wad::ZERO);
    }

    #[test]
    fn test_borrow_needs_pool_liquidity() {
        let (mut pool, feed, _) = setup();
        // At price 2.0, 10 units of collateral support 16 of debt, more
        // than the pool holds.
        feed.set_answer(200_000_000, START);
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        let err = pool.borrow(ALICE, Wad::from_units(12), ALICE).unwrap_err();
        assert_eq!(
            err,
            PoolError::InsufficientLiquidity {
                requested: Wad::from_units(12),
                available: Wad::from_units(10),
            }
        );
        assert_eq!(pool.position(&ALICE).unwrap().debt_principal, Wad::ZERO);
        assert_eq!(pool.custody().balance_of(&POOL), Wad::from_units(10));
    }

    #[test]
    fn test_withdraw_with_debt_checks_health() {
        let (mut pool, _, _) = setup();
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        pool.borrow(ALICE, Wad::from_units(8), ALICE).unwrap();
        // Keeping HF >= 1 needs 8 / 0.85 = 9.41 collateral.
        let err = pool.withdraw(ALICE, Wad::ONE, ASSET).unwrap_err();
        assert!(matches!(err, PoolError::Risk(RiskError::WithdrawalUnsafe { .. })));
        let remaining = pool.withdraw(ALICE, wad(dec!(0.5)), ASSET).unwrap();
        assert_eq!(remaining, wad(dec!(9.5)));
    }

    #[test]
    fn test_withdraw_more_than_collateral() {
        let (mut pool, _, _) = setup();
        pool.deposit(ALICE, ASSET, Wad::ONE).unwrap();
        let err = pool.withdraw(ALICE, Wad::from_units(2), ASSET).unwrap_err();
        assert!(matches!(err, PoolError::ExceedsBalance { .. }));
    }

    #[test]
    fn test_delegated_borrow() {
        let (mut pool, _, _) = setup();
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();

        let err = pool.borrow(BOB, Wad::ONE, ALICE).unwrap_err();
        assert_eq!(
            err,
            PoolError::Risk(RiskError::InsufficientDelegation {
                requested: Wad::ONE,
                allowance: Wad::ZERO
            })
        );

        pool.approve_delegation(ALICE, BOB, Wad::from_units(3));
        pool.borrow(BOB, Wad::from_units(2), ALICE).unwrap();
        assert_eq!(pool.borrow_allowance(&ALICE, &BOB), Wad::ONE);
        assert_eq!(pool.position(&ALICE).unwrap().debt_principal, Wad::from_units(2));
        assert!(pool.position(&BOB).is_none());
        assert_eq!(pool.custody().balance_of(&BOB), Wad::from_units(102));
    }

    #[test]
    fn test_repay_on_behalf_takes_only_applied() {
        let (mut pool, _, _) = setup();
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        pool.borrow(ALICE, Wad::from_units(4), ALICE).unwrap();
        let outcome = pool.repay(BOB, ALICE, Wad::from_units(5)).unwrap();
        assert_eq!(outcome.applied, Wad::from_units(4));
        assert_eq!(outcome.refund, Wad::ONE);
        assert_eq!(pool.custody().balance_of(&BOB), Wad::from_units(96));
    }

    #[test]
    fn test_repay_without_position_creates_nothing() {
        let (mut pool, _, _) = setup();
        let outcome = pool.repay(BOB, ALICE, Wad::ONE).unwrap();
        assert_eq!(outcome.applied, Wad::ZERO);
        assert_eq!(outcome.refund, Wad::ONE);
        assert!(pool.position(&ALICE).is_none());
        assert_eq!(pool.custody().balance_of(&BOB), Wad::from_units(100));
    }

    #[test]
    fn test_liquidation_supplied_payout() {
        let (mut pool, feed, _) = setup();
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        pool.borrow(ALICE, Wad::from_units(8), ALICE).unwrap();
        feed.set_answer(90_000_000, START);

        let result = pool.liquidation_call(BOB, ALICE, Wad::from_units(8), false).unwrap();
        assert_eq!(result.payout, LiquidationPayout::Supplied);
        assert_eq!(result.repay_applied, wad(dec!(5.2)));
        assert_eq!(
            pool.position(&BOB).unwrap().collateral_amount,
            result.collateral_seized
        );
        // Bob paid the debt and received no cash.
        assert_eq!(pool.custody().balance_of(&BOB), wad(dec!(94.8)));
        pool.check_invariants().unwrap();
    }

    #[test]
    fn test_liquidation_requires_liquidator_funds() {
        let (mut pool, feed, _) = setup();
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        pool.borrow(ALICE, Wad::from_units(8), ALICE).unwrap();
        feed.set_answer(90_000_000, START);
        let broke = address!("00000000000000000000000000000000000000b2");

        let err = pool.liquidation_call(broke, ALICE, Wad::from_units(8), true).unwrap_err();
        assert!(matches!(err, PoolError::Transfer(TransferError::InsufficientFunds { .. })));
        assert_eq!(pool.position(&ALICE).unwrap().debt_principal, Wad::from_units(8));
    }

    #[test]
    fn test_self_liquidation_supplied_merges_position() {
        let (mut pool, feed, _) = setup();
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        pool.borrow(ALICE, Wad::from_units(8), ALICE).unwrap();
        feed.set_answer(90_000_000, START);

        let result = pool.liquidation_call(ALICE, ALICE, Wad::ONE, false).unwrap();
        let position = pool.position(&ALICE).unwrap();
        assert_eq!(position.debt_principal, Wad::from_units(7));
        assert_eq!(position.collateral_amount, Wad::from_units(10));
        assert_eq!(result.repay_applied, Wad::ONE);
        // 10 * 0.9 * 0.85 / 7, reported for the merged position.
        assert_eq!(
            result.health_factor_after,
            pool.account_snapshot(&ALICE).unwrap().health_factor
        );
        assert!(result.health_factor_after.is_healthy());
        pool.check_invariants().unwrap();
    }

    #[test]
    fn test_snapshot_accrues_without_mutating() {
        let (mut pool, feed, clock) = setup();
        pool.deposit(ALICE, ASSET, Wad::from_units(10)).unwrap();
        pool.borrow(ALICE, Wad::from_units(5), ALICE).unwrap();
        let now = clock.advance(86_400 * 30);
        feed.set_answer(100_000_000, now);

        let snap = pool.account_snapshot(&ALICE).unwrap();
        assert!(snap.debt > Wad::from_units(5));
        assert_eq!(pool.pool_state().last_accrual_timestamp, START);
        pool.accrue().unwrap();
        assert_eq!(pool.pool_state().last_accrual_timestamp, now);
        pool.check_invariants().unwrap();
    }
}
