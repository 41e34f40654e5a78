use alloy::primitives::Address;
use thiserror::Error;

use crate::types::{HealthFactor, Wad};

/// Typed error hierarchy for the lending engine.
///
/// Every public operation returns `Result<_, PoolError>`; the kind-specific
/// enums below convert into it with `?`. Application code (config loading,
/// the replay binary) wraps with `anyhow::Context` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    // -- Input --------------------------------------------------------------
    #[error("invalid amount for {operation}: amount must be > 0")]
    InvalidAmount { operation: &'static str },

    #[error("unsupported asset {asset} (pool asset is {expected})")]
    UnsupportedAsset { asset: Address, expected: Address },

    #[error("{operation} of {requested} exceeds balance {available}")]
    ExceedsBalance {
        operation: &'static str,
        requested: Wad,
        available: Wad,
    },

    // -- Liquidity ----------------------------------------------------------
    #[error("insufficient pool liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: Wad, available: Wad },

    // -- Accounting ---------------------------------------------------------
    #[error("pool invariant violated: {field} recorded {recorded}, positions sum to {computed}")]
    InvariantViolated {
        field: &'static str,
        recorded: Wad,
        computed: Wad,
    },

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    // -- Configuration ------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

/// Fixed-point failures. Always fatal to the operation: they point at a
/// scale or configuration bug, never at caller input.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),
}

/// Price feed failures. The operation is aborted; the caller may retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle stale: {age_seconds}s old (max {max_age_seconds}s)")]
    StalePrice {
        age_seconds: u64,
        max_age_seconds: u64,
    },

    #[error("oracle returned invalid price {answer}")]
    InvalidPrice { answer: i128 },

    #[error("oracle unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Business-rule violations. State is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error("borrow of {requested} exceeds loan-to-value limit (max additional debt {available})")]
    ExceedsLoanToValue { requested: Wad, available: Wad },

    #[error("withdrawal of {requested} would drop health factor to {health_factor}")]
    WithdrawalUnsafe {
        requested: Wad,
        health_factor: HealthFactor,
    },

    #[error("position is not liquidatable (health factor {health_factor})")]
    NotLiquidatable { health_factor: HealthFactor },

    #[error("liquidation requires {required} collateral, position holds {available}")]
    InsufficientCollateral { required: Wad, available: Wad },

    #[error("borrow of {requested} exceeds delegated allowance {allowance}")]
    InsufficientDelegation { requested: Wad, allowance: Wad },
}

/// Custody failures raised by an [`crate::execution::AssetCustody`] backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient funds in {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: Address,
        balance: Wad,
        requested: Wad,
    },

    #[error("balance overflow crediting {account}")]
    BalanceOverflow { account: Address },
}
