//! Layered configuration using Figment.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Environment variables (`MIXPOOL_*` prefix)

use crate::foundation::{MixError, Result};
use crate::infrastructure::config::types::AppConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::{debug, info};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "mixpool.toml";

/// Environment variable prefix for config overrides.
///
/// Example: `MIXPOOL_POOL__MAX_POOL_TRANSACTIONS` -> `pool.max_pool_transactions`
pub const ENV_PREFIX: &str = "MIXPOOL_";

/// Load `mixpool.toml` from `data_dir`.
pub fn load_config(data_dir: &Path) -> Result<AppConfig> {
    load_config_from_file(&data_dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from `path`. A missing file means defaults plus environment.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    info!("loading configuration path={}", path.display());
    let config: AppConfig = figment_base(path)
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|err| MixError::ConfigError(format!("config extraction failed: {err}")))?;
    debug!(
        "configuration loaded role={} max_pool_transactions={} tick_interval_ms={}",
        config.pool.role, config.pool.max_pool_transactions, config.runtime.tick_interval_ms
    );
    Ok(config)
}

fn figment_base(path: &Path) -> Figment {
    let figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment.merge(Toml::file(path))
    } else {
        debug!("configuration file missing; using defaults and env only path={}", path.display());
        figment
    }
}
