//! Replays of the pool's deployment exercise scripts.
//!
//! Each script runs against a fresh pool backed by an in-memory vault, a
//! settable aggregator and a manual clock, and records the user and pool
//! balances after every step.

use std::sync::Arc;

use alloy::primitives::{address, Address};
use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::config::EngineConfig;
use crate::core::clock::{Clock, ManualClock};
use crate::core::lending_pool::LendingPool;
use crate::core::oracle::MockAggregator;
use crate::execution::{AssetCustody, InMemoryVault};
use crate::types::{LiquidationResult, RepayOutcome, Wad};

/// Deterministic test accounts, as a local dev chain hands them out.
pub const ACCOUNT_0: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
pub const ACCOUNT_1: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
pub const POOL_ADDRESS: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");

/// Starting balance of every test account.
const ACCOUNT_FUNDING: u64 = 10_000;

type ReplayPool = LendingPool<InMemoryVault, Arc<MockAggregator>>;

/// Balances after one script step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub label: &'static str,
    pub account: Address,
    pub account_balance: Wad,
    pub pool_balance: Wad,
}

#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub name: &'static str,
    pub steps: Vec<StepRecord>,
    pub repay: Option<RepayOutcome>,
    pub liquidation: Option<LiquidationResult>,
}

impl ScriptReport {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
            repay: None,
            liquidation: None,
        }
    }

    fn record(&mut self, pool: &ReplayPool, label: &'static str, account: Address) {
        let step = StepRecord {
            label,
            account,
            account_balance: pool.custody().balance_of(&account),
            pool_balance: pool.custody().balance_of(&pool.address()),
        };
        info!(
            script = self.name,
            step = label,
            account = %account,
            account_balance = %step.account_balance,
            pool_balance = %step.pool_balance,
            "balances"
        );
        self.steps.push(step);
    }
}

/// Everything a replay needs to drive one pool.
struct Harness {
    pool: ReplayPool,
    feed: Arc<MockAggregator>,
    clock: Arc<ManualClock>,
    decimals: u8,
}

impl Harness {
    fn new(config: &EngineConfig, start: u64, price: Decimal) -> Result<Self> {
        let decimals = config.oracle.decimals;
        let feed = Arc::new(MockAggregator::new(decimals, feed_answer(price, decimals)?, start));
        let clock = Arc::new(ManualClock::new(start));

        let mut vault = InMemoryVault::new();
        for account in [ACCOUNT_0, ACCOUNT_1] {
            vault.mint(account, Wad::from_units(ACCOUNT_FUNDING))?;
        }

        let pool = LendingPool::from_config(
            config,
            POOL_ADDRESS,
            feed.clone(),
            vault,
            Box::new(clock.clone()),
        )
        .context("failed to create lending pool")?;
        Ok(Self {
            pool,
            feed,
            clock,
            decimals,
        })
    }

    fn set_price(&self, price: Decimal) -> Result<()> {
        let answer = feed_answer(price, self.decimals)?;
        self.feed.set_answer(answer, self.clock.now());
        Ok(())
    }
}

/// Express `price` as a feed answer with `decimals` fractional digits.
fn feed_answer(price: Decimal, decimals: u8) -> Result<i128> {
    let scale = 10i128
        .checked_pow(u32::from(decimals))
        .context("feed decimals too large")?;
    let scale = Decimal::try_from_i128_with_scale(scale, 0).context("feed decimals too large")?;
    price
        .checked_mul(scale)
        .and_then(|v| v.trunc().to_i128())
        .context("price does not fit the feed")
}

fn units(d: Decimal) -> Result<Wad> {
    Wad::from_decimal(d).context("amount out of range")
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// Deposit 10, withdraw 10.
pub fn deposit_withdraw(config: &EngineConfig, start: u64) -> Result<ScriptReport> {
    let mut h = Harness::new(config, start, Decimal::ONE)?;
    let asset = h.pool.asset();
    let mut report = ScriptReport::new("deposit-withdraw");

    let deposit = Wad::from_units(10);
    h.pool.deposit(ACCOUNT_0, asset, deposit)?;
    report.record(&h.pool, "after deposit", ACCOUNT_0);

    h.pool.withdraw(ACCOUNT_0, deposit, asset)?;
    report.record(&h.pool, "after withdraw", ACCOUNT_0);

    h.pool.check_invariants()?;
    Ok(report)
}

/// Deposit 10, borrow 8, repay 9 (1 refunded), withdraw 10.
pub fn borrow_repay(config: &EngineConfig, start: u64) -> Result<ScriptReport> {
    let mut h = Harness::new(config, start, Decimal::ONE)?;
    let asset = h.pool.asset();
    let mut report = ScriptReport::new("borrow-repay");

    let deposit = Wad::from_units(10);
    h.pool.deposit(ACCOUNT_0, asset, deposit)?;
    report.record(&h.pool, "after deposit", ACCOUNT_0);

    h.pool.borrow(ACCOUNT_0, Wad::from_units(8), ACCOUNT_0)?;
    report.record(&h.pool, "after borrow", ACCOUNT_0);

    let outcome = h.pool.repay(ACCOUNT_0, ACCOUNT_0, Wad::from_units(9))?;
    info!(applied = %outcome.applied, refund = %outcome.refund, "repaid 9");
    report.repay = Some(outcome);
    report.record(&h.pool, "after repay", ACCOUNT_0);

    h.pool.withdraw(ACCOUNT_0, deposit, asset)?;
    report.record(&h.pool, "after withdraw", ACCOUNT_0);

    h.pool.check_invariants()?;
    Ok(report)
}

/// Deposit 10 and borrow 8.5 at a price where that is exactly the
/// loan-to-value limit, let the price fall to 1.0 (health factor exactly
/// 1.0), wait two seconds for interest to tip it under, and liquidate 8.5
/// from a second account with `receive_collateral` set.
pub fn liquidation(config: &EngineConfig, start: u64) -> Result<ScriptReport> {
    let mut h = Harness::new(config, start, dec!(1.0625))?;
    let asset = h.pool.asset();
    let mut report = ScriptReport::new("liquidation");

    h.pool.deposit(ACCOUNT_0, asset, Wad::from_units(10))?;
    report.record(&h.pool, "after deposit", ACCOUNT_0);

    h.pool.borrow(ACCOUNT_0, units(dec!(8.5))?, ACCOUNT_0)?;
    report.record(&h.pool, "after borrow", ACCOUNT_0);

    h.clock.advance(2);
    h.set_price(Decimal::ONE)?;
    report.record(&h.pool, "before liquidation", ACCOUNT_1);

    let result = h.pool.liquidation_call(ACCOUNT_1, ACCOUNT_0, units(dec!(8.5))?, true)?;
    report.liquidation = Some(result);
    report.record(&h.pool, "after liquidation", ACCOUNT_1);

    h.pool.check_invariants()?;
    Ok(report)
}

/// Run every script in order.
pub fn run_all(config: &EngineConfig, start: u64) -> Result<Vec<ScriptReport>> {
    Ok(vec![
        deposit_withdraw(config, start).context("deposit-withdraw script failed")?,
        borrow_repay(config, start).context("borrow-repay script failed")?,
        liquidation(config, start).context("liquidation script failed")?,
    ])
}
