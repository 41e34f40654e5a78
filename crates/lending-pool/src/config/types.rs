use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::constants::{DEFAULT_FEED_DECIMALS, DEFAULT_ORACLE_MAX_STALENESS_SECONDS};
use crate::types::RiskParameters;

// ---------------------------------------------------------------------------
// Top-level aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub app: AppConfig,
    pub pool: PoolConfig,
    pub oracle: OracleConfig,
    pub interest: InterestConfig,
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
}

fn default_log_file_name() -> String {
    "lending-pool.log".into()
}

// ---------------------------------------------------------------------------
// pool.json
// ---------------------------------------------------------------------------

/// Deployment parameters of the pool. Risk values are integers scaled by
/// `precision_base`.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Asset id as a 0x-prefixed address.
    pub asset: String,
    pub precision_base: u64,
    pub loan_to_value: u64,
    pub liquidation_threshold: u64,
    pub liquidation_bonus: u64,
    pub liquidation_close_factor: u64,
    pub reserve_factor: u64,
}

impl PoolConfig {
    pub fn risk_parameters(&self) -> RiskParameters {
        RiskParameters {
            loan_to_value: self.loan_to_value,
            liquidation_threshold: self.liquidation_threshold,
            liquidation_bonus: self.liquidation_bonus,
            liquidation_close_factor: self.liquidation_close_factor,
            reserve_factor: self.reserve_factor,
            precision_base: self.precision_base,
        }
    }
}

// ---------------------------------------------------------------------------
// oracle.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_feed_decimals")]
    pub decimals: u8,
    #[serde(default = "default_max_staleness")]
    pub max_staleness_seconds: u64,
}

fn default_feed_decimals() -> u8 {
    DEFAULT_FEED_DECIMALS
}

fn default_max_staleness() -> u64 {
    DEFAULT_ORACLE_MAX_STALENESS_SECONDS
}

// ---------------------------------------------------------------------------
// interest.json
// ---------------------------------------------------------------------------

/// Kinked rate curve. All values are annual fractions (`"0.04"` = 4%).
#[derive(Debug, Clone, Deserialize)]
pub struct InterestConfig {
    #[serde(with = "rust_decimal::serde::str")]
    pub base_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub slope_1: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub slope_2: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub optimal_utilization: Decimal,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            base_rate: dec!(0),
            slope_1: dec!(0.04),
            slope_2: dec!(0.75),
            optimal_utilization: dec!(0.8),
        }
    }
}
