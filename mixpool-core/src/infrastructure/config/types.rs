use crate::domain::PoolConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_LOG_FILTERS: &str = "info";
pub const DEFAULT_PEER_ID: &str = "mixpool-node";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files. Console only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Same syntax as `init_logger`: `info,mixpool_core::domain=debug,root=warn`.
    #[serde(default = "default_log_filters")]
    pub filters: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_dir: None, filters: default_log_filters() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Period of the timeout / progress tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Name this node uses on the transport.
    #[serde(default = "default_peer_id")]
    pub peer_id: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { tick_interval_ms: DEFAULT_TICK_INTERVAL_MS, peer_id: default_peer_id() }
    }
}

/// Coordinator key material. Unused on clients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Hex secp256k1 secret key, as printed by `mixpool-keygen`.
    #[serde(default)]
    pub secret_key_hex: Option<String>,
    /// Collateral outpoint (`txid:index`) registering this coordinator in the directory.
    #[serde(default)]
    pub collateral_outpoint: Option<String>,
}

fn default_log_filters() -> String {
    DEFAULT_LOG_FILTERS.to_string()
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_peer_id() -> String {
    DEFAULT_PEER_ID.to_string()
}
