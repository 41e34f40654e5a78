use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};

use lending_pool::config;
use lending_pool::core::{Clock, SystemClock};
use lending_pool::logging;
use lending_pool::replay;

fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    let config_dir = std::env::var("POOL_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let config = config::load_config(&config_dir)?;

    // Hold the guard for the process lifetime.
    let _guard = logging::init_tracing(&config.app.logging)?;

    let params = config.pool.risk_parameters();
    info!(
        asset = %config.pool.asset,
        loan_to_value = params.loan_to_value,
        liquidation_threshold = params.liquidation_threshold,
        liquidation_bonus = params.liquidation_bonus,
        liquidation_close_factor = params.liquidation_close_factor,
        reserve_factor = params.reserve_factor,
        precision_base = params.precision_base,
        "configuration loaded"
    );

    let start = SystemClock.now();
    let reports = match replay::run_all(&config, start) {
        Ok(reports) => reports,
        Err(e) => {
            error!(error = %format!("{e:#}"), "replay failed");
            return Err(e);
        }
    };

    for report in &reports {
        let last = report
            .steps
            .last()
            .context("replay produced no steps")?;
        info!(
            script = report.name,
            steps = report.steps.len(),
            final_account_balance = %last.account_balance,
            final_pool_balance = %last.pool_balance,
            "replay finished"
        );
        if let Some(result) = &report.liquidation {
            info!(
                repaid = %result.repay_applied,
                seized = %result.collateral_seized,
                hf_before = %result.health_factor_before,
                hf_after = %result.health_factor_after,
                "liquidation summary"
            );
        }
    }

    info!(scripts = reports.len(), "all replays completed");
    Ok(())
}
