pub mod types;
pub mod validate;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Load and merge all config JSON files into a single [`EngineConfig`],
/// then apply environment variable overrides and validate.
///
/// Expected directory layout:
/// ```text
/// config/
///   app.json
///   pool.json
///   oracle.json
///   interest.json
/// ```
///
/// # Environment variable overrides
///
/// | Env Var                         | Config Field                      |
/// |---------------------------------|-----------------------------------|
/// | `ORACLE_MAX_STALENESS_SECONDS`  | `oracle.max_staleness_seconds`    |
/// | `POOL_LOG_DIR`                  | `app.logging.log_dir`             |
/// | `POOL_RESERVE_FACTOR`           | `pool.reserve_factor`             |
pub fn load_config(config_dir: &Path) -> Result<EngineConfig> {
    let read = |name: &str| -> Result<String> {
        let path = config_dir.join(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
    };

    let app: AppConfig = serde_json::from_str(&read("app.json")?).context("parsing app.json")?;

    let pool: PoolConfig = serde_json::from_str(&read("pool.json")?).context("parsing pool.json")?;

    let oracle: OracleConfig =
        serde_json::from_str(&read("oracle.json")?).context("parsing oracle.json")?;

    let interest: InterestConfig =
        serde_json::from_str(&read("interest.json")?).context("parsing interest.json")?;

    let mut config = EngineConfig {
        app,
        pool,
        oracle,
        interest,
    };

    apply_env_overrides(&mut config);
    validate::validate_config(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Only non-empty env vars take effect. Parse failures are logged and skipped
/// (the JSON value remains).
fn apply_env_overrides(config: &mut EngineConfig) {
    if let Some(val) = env_parse::<u64>("ORACLE_MAX_STALENESS_SECONDS") {
        info!(val, "env override: ORACLE_MAX_STALENESS_SECONDS");
        config.oracle.max_staleness_seconds = val;
    }

    if let Some(val) = env_string("POOL_LOG_DIR") {
        info!(%val, "env override: POOL_LOG_DIR");
        config.app.logging.log_dir = val;
    }

    if let Some(val) = env_parse::<u64>("POOL_RESERVE_FACTOR") {
        info!(val, "env override: POOL_RESERVE_FACTOR");
        config.pool.reserve_factor = val;
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var and parse it as `T`, logging unparsable values.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(val) => Some(val),
        Err(_) => {
            info!(key, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serial_test::serial;
    use std::path::PathBuf;

    fn project_config_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
    }

    fn write_test_configs(dir: &Path) {
        std::fs::write(
            dir.join("app.json"),
            r#"{ "logging": { "log_dir": "logs", "file_name": "test.log" } }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("pool.json"),
            r#"{
                "asset": "0x0000000000000000000000000000000000000000",
                "precision_base": 100,
                "loan_to_value": 80,
                "liquidation_threshold": 85,
                "liquidation_bonus": 110,
                "liquidation_close_factor": 65,
                "reserve_factor": 10
            }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("oracle.json"),
            r#"{ "decimals": 8, "max_staleness_seconds": 600 }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("interest.json"),
            r#"{
                "base_rate": "0.01",
                "slope_1": "0.04",
                "slope_2": "0.75",
                "optimal_utilization": "0.8"
            }"#,
        )
        .unwrap();
    }

    /// Remove all pool-related env vars so tests don't interfere with each other.
    fn clean_pool_env() {
        for key in [
            "ORACLE_MAX_STALENESS_SECONDS",
            "POOL_LOG_DIR",
            "POOL_RESERVE_FACTOR",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_load_real_configs() {
        clean_pool_env();
        let dir = project_config_dir();
        if !dir.exists() {
            eprintln!("skipping, config dir not found at {}", dir.display());
            return;
        }
        let config = load_config(&dir).expect("config should load and validate");
        assert_eq!(config.pool.loan_to_value, 80);
        assert_eq!(config.pool.precision_base, 100);
    }

    #[test]
    #[serial]
    fn test_load_test_configs() {
        clean_pool_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());
        let config = load_config(tmp.path()).expect("test config should load");
        assert_eq!(config.app.logging.file_name, "test.log");
        assert_eq!(config.oracle.max_staleness_seconds, 600);
        assert_eq!(config.interest.base_rate, dec!(0.01));
        assert_eq!(config.pool.risk_parameters().liquidation_bonus, 110);
    }

    #[test]
    #[serial]
    fn test_missing_config_file_errors() {
        clean_pool_env();
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(
            err.to_string().contains("failed to read config file"),
            "expected file-not-found error, got: {err}"
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_applied() {
        clean_pool_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("ORACLE_MAX_STALENESS_SECONDS", "120");
        std::env::set_var("POOL_LOG_DIR", "/var/log/pool");
        std::env::set_var("POOL_RESERVE_FACTOR", "20");

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.oracle.max_staleness_seconds, 120);
        assert_eq!(config.app.logging.log_dir, "/var/log/pool");
        assert_eq!(config.pool.reserve_factor, 20);
        clean_pool_env();
    }

    #[test]
    #[serial]
    fn test_env_override_empty_string_ignored() {
        clean_pool_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("POOL_LOG_DIR", "");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.app.logging.log_dir, "logs");
        clean_pool_env();
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_parse_ignored() {
        clean_pool_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("ORACLE_MAX_STALENESS_SECONDS", "soon");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.oracle.max_staleness_seconds, 600);
        clean_pool_env();
    }

    #[test]
    #[serial]
    fn test_env_override_still_validated() {
        clean_pool_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("POOL_RESERVE_FACTOR", "150");
        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("reserve_factor"), "{err}");
        clean_pool_env();
    }

    #[test]
    #[serial]
    fn test_malformed_json_errors() {
        clean_pool_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());
        std::fs::write(tmp.path().join("interest.json"), r#"{ "base_rate": 0.01 }"#).unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing interest.json"), "{err:#}");
    }
}
