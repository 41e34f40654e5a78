// ---------------------------------------------------------------------------
// Numeric Constants
// ---------------------------------------------------------------------------

/// Seconds in a non-leap year. Annual rates are spread over this many seconds.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Decimals of a WAD-scaled value.
pub const WAD_DECIMALS: u8 = 18;

/// Largest feed precision the oracle adapter will rescale.
pub const MAX_FEED_DECIMALS: u8 = 36;

// ---------------------------------------------------------------------------
// Default Risk Parameters
// ---------------------------------------------------------------------------
//
// The constructor arguments used by every deployment of the pool:
// `80, 85, 110, 65, 10, 100` — LTV, liquidation threshold, liquidation
// bonus, close factor, reserve factor, precision base.

pub const DEFAULT_LOAN_TO_VALUE: u64 = 80;
pub const DEFAULT_LIQUIDATION_THRESHOLD: u64 = 85;
pub const DEFAULT_LIQUIDATION_BONUS: u64 = 110;
pub const DEFAULT_LIQUIDATION_CLOSE_FACTOR: u64 = 65;
pub const DEFAULT_RESERVE_FACTOR: u64 = 10;
pub const DEFAULT_PRECISION_BASE: u64 = 100;

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// Chainlink-style feeds report 8 decimals.
pub const DEFAULT_FEED_DECIMALS: u8 = 8;

pub const DEFAULT_ORACLE_MAX_STALENESS_SECONDS: u64 = 3_600;
