use crate::domain::{OutPoint, PoolRole};
use crate::foundation::util::encoding::parse_hex_32bytes;
use crate::infrastructure::config::types::AppConfig;

const MAX_PERCENT: u32 = 100;

impl AppConfig {
    /// Every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let pool = &self.pool;

        if pool.max_pool_transactions < 2 {
            errors.push("pool.max_pool_transactions must be at least 2".to_string());
        }
        if pool.queue_timeout_secs == 0 {
            errors.push("pool.queue_timeout_secs must be > 0".to_string());
        }
        if pool.signing_timeout_secs == 0 {
            errors.push("pool.signing_timeout_secs must be > 0".to_string());
        }
        if pool.charge_fees_percent > MAX_PERCENT {
            errors.push(format!("pool.charge_fees_percent cannot exceed {}", MAX_PERCENT));
        }
        if pool.random_fee_percent > MAX_PERCENT {
            errors.push(format!("pool.random_fee_percent cannot exceed {}", MAX_PERCENT));
        }
        if pool.collateral_amount == 0 {
            errors.push("pool.collateral_amount must be > 0".to_string());
        }
        if pool.pool_max_amount <= pool.collateral_amount {
            errors.push("pool.pool_max_amount must exceed pool.collateral_amount".to_string());
        }
        if pool.max_relay_attempts == 0 {
            errors.push("pool.max_relay_attempts must be > 0".to_string());
        }
        if self.runtime.tick_interval_ms == 0 {
            errors.push("runtime.tick_interval_ms must be > 0".to_string());
        }
        if self.runtime.peer_id.trim().is_empty() {
            errors.push("runtime.peer_id must not be empty".to_string());
        }

        if pool.role == PoolRole::Coordinator {
            match self.identity.secret_key_hex.as_deref() {
                None => errors.push("identity.secret_key_hex is required when pool.role=coordinator".to_string()),
                Some(hex) if parse_hex_32bytes(hex).is_err() => {
                    errors.push("identity.secret_key_hex must be 32 bytes of hex".to_string())
                }
                Some(_) => {}
            }
            match self.identity.collateral_outpoint.as_deref() {
                None => errors.push("identity.collateral_outpoint is required when pool.role=coordinator".to_string()),
                Some(value) if value.parse::<OutPoint>().is_err() => {
                    errors.push(format!("invalid identity.collateral_outpoint: {}", value))
                }
                Some(_) => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
