use crate::domain::pool::state::PoolRole;
use crate::foundation::{
    Amount, CLIENT_LAG_SECS, DEFAULT_MAX_POOL_TRANSACTIONS, MIN_POOL_PEER_PROTO_VERSION, POOL_COLLATERAL, POOL_MAX_AMOUNT,
    QUEUE_TIMEOUT_SECS, SIGNING_TIMEOUT_SECS, TERMINAL_RESET_DELAY_SECS,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHARGE_FEES_PERCENT: u32 = 33;
pub const DEFAULT_RANDOM_FEE_PERCENT: u32 = 10;
pub const DEFAULT_NEW_BLOCK_DEBOUNCE_SECS: u64 = 10;
pub const DEFAULT_MAX_RELAY_ATTEMPTS: u32 = 3;
pub const DEFAULT_BROADCAST_RECORD_TTL_SECS: u64 = 3_600;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub role: PoolRole,
    pub max_pool_transactions: usize,
    pub queue_timeout_secs: u64,
    pub signing_timeout_secs: u64,
    /// How long a finished round stays in `error`/`success` before resetting.
    pub reset_delay_secs: u64,
    /// Extra time a client grants its coordinator before timing out locally.
    pub client_lag_secs: u64,
    /// A round spanning more than this many blocks without progress is reset.
    pub min_block_spacing: u64,
    pub new_block_debounce_secs: u64,
    pub collateral_amount: Amount,
    pub pool_max_amount: Amount,
    /// Chance (percent) that a timeout actually charges an offender.
    pub charge_fees_percent: u32,
    /// Chance (percent) that each collateral is burned after a successful round.
    pub random_fee_percent: u32,
    /// Refuse generic `update_state` calls into `error`/`success` on a coordinator.
    pub coordinator_terminal_guard: bool,
    pub min_peer_protocol_version: u32,
    pub max_relay_attempts: u32,
    pub broadcast_record_ttl_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            role: PoolRole::Client,
            max_pool_transactions: DEFAULT_MAX_POOL_TRANSACTIONS,
            queue_timeout_secs: QUEUE_TIMEOUT_SECS,
            signing_timeout_secs: SIGNING_TIMEOUT_SECS,
            reset_delay_secs: TERMINAL_RESET_DELAY_SECS,
            client_lag_secs: CLIENT_LAG_SECS,
            min_block_spacing: 1,
            new_block_debounce_secs: DEFAULT_NEW_BLOCK_DEBOUNCE_SECS,
            collateral_amount: POOL_COLLATERAL,
            pool_max_amount: POOL_MAX_AMOUNT,
            charge_fees_percent: DEFAULT_CHARGE_FEES_PERCENT,
            random_fee_percent: DEFAULT_RANDOM_FEE_PERCENT,
            coordinator_terminal_guard: true,
            min_peer_protocol_version: MIN_POOL_PEER_PROTO_VERSION,
            max_relay_attempts: DEFAULT_MAX_RELAY_ATTEMPTS,
            broadcast_record_ttl_secs: DEFAULT_BROADCAST_RECORD_TTL_SECS,
        }
    }
}

impl PoolConfig {
    pub fn coordinator() -> Self {
        Self { role: PoolRole::Coordinator, ..Self::default() }
    }

    pub fn client() -> Self {
        Self::default()
    }

    /// Timeout slack for this role.
    pub fn lag_secs(&self) -> u64 {
        match self.role {
            PoolRole::Client => self.client_lag_secs,
            PoolRole::Coordinator => 0,
        }
    }
}
