use alloy::primitives::Address;
use anyhow::{bail, Result};
use rust_decimal::Decimal;

use crate::constants::MAX_FEED_DECIMALS;
use crate::core::InterestRateModel;

use super::types::EngineConfig;

/// Validate invariants across the merged config that serde alone cannot enforce.
///
/// Every violation is collected and reported together. Called automatically
/// by [`super::load_config`].
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_app_config(config, &mut errors);
    validate_pool_config(config, &mut errors);
    validate_oracle_config(config, &mut errors);
    validate_interest_config(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let msg = format!(
            "Configuration validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        );
        bail!("{msg}");
    }
}

// ---------------------------------------------------------------------------
// App config
// ---------------------------------------------------------------------------

fn validate_app_config(config: &EngineConfig, errors: &mut Vec<String>) {
    let logging = &config.app.logging;
    if logging.log_dir.is_empty() {
        errors.push("app.logging: log_dir is empty".into());
    }
    if logging.file_name.is_empty() {
        errors.push("app.logging: file_name is empty".into());
    }
}

// ---------------------------------------------------------------------------
// Pool config
// ---------------------------------------------------------------------------

fn validate_pool_config(config: &EngineConfig, errors: &mut Vec<String>) {
    let pool = &config.pool;

    if let Err(e) = validate_address(&pool.asset) {
        errors.push(format!("pool.asset: {e}"));
    }

    for violation in pool.risk_parameters().violations() {
        errors.push(format!("pool: {violation}"));
    }
}

// ---------------------------------------------------------------------------
// Oracle config
// ---------------------------------------------------------------------------

fn validate_oracle_config(config: &EngineConfig, errors: &mut Vec<String>) {
    let oracle = &config.oracle;

    if oracle.max_staleness_seconds == 0 {
        errors.push("oracle: max_staleness_seconds must be > 0".into());
    }
    if oracle.decimals > MAX_FEED_DECIMALS {
        errors.push(format!(
            "oracle: decimals ({}) must be <= {MAX_FEED_DECIMALS}",
            oracle.decimals
        ));
    }
}

// ---------------------------------------------------------------------------
// Interest config
// ---------------------------------------------------------------------------

fn validate_interest_config(config: &EngineConfig, errors: &mut Vec<String>) {
    let interest = &config.interest;

    let mut negative = false;
    for (name, value) in [
        ("base_rate", interest.base_rate),
        ("slope_1", interest.slope_1),
        ("slope_2", interest.slope_2),
        ("optimal_utilization", interest.optimal_utilization),
    ] {
        if value < Decimal::ZERO {
            errors.push(format!("interest: {name} ({value}) must be >= 0"));
            negative = true;
        }
    }
    if negative {
        return;
    }

    // Curve shape is checked by the model itself, as the pool does.
    match InterestRateModel::from_config(interest) {
        Ok(model) => errors.extend(model.violations().into_iter().map(|v| format!("interest: {v}"))),
        Err(e) => errors.push(format!("interest: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a 0x-prefixed, 40-hex-digit address.
pub fn validate_address(addr: &str) -> Result<Address, String> {
    if addr.is_empty() {
        return Err("address is empty".into());
    }
    if !addr.starts_with("0x") && !addr.starts_with("0X") {
        return Err(format!("address '{addr}' must start with 0x"));
    }
    if addr.len() != 42 {
        return Err(format!(
            "address '{addr}' has length {} (expected 42)",
            addr.len()
        ));
    }
    if !addr[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("address '{addr}' contains non-hex characters"));
    }
    addr[2..]
        .parse::<Address>()
        .map_err(|e| format!("address '{addr}' is invalid: {e}"))
}
