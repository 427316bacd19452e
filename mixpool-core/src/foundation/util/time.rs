use crate::foundation::constants::{NANOS_PER_SECOND, TEST_NOW_NANOS_ENV_VAR};
use crate::foundation::MixError;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp_nanos_env(env_var: Option<&str>) -> Result<u64, MixError> {
    if let Some(var) = env_var {
        if let Ok(value) = std::env::var(var) {
            return value.parse::<u64>().map_err(|err| MixError::Message(err.to_string()));
        }
    }
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|err| MixError::Message(err.to_string()))?;
    Ok(now.as_secs().saturating_mul(NANOS_PER_SECOND).saturating_add(u64::from(now.subsec_nanos())))
}

/// Returns the current wall-clock timestamp in nanoseconds.
///
/// For test determinism, this respects `TEST_NOW_NANOS_ENV_VAR` when set.
pub fn now_nanos() -> u64 {
    current_timestamp_nanos_env(Some(TEST_NOW_NANOS_ENV_VAR)).or_else(|_| current_timestamp_nanos_env(None)).unwrap_or(0)
}

pub fn secs_to_nanos(secs: u64) -> u64 {
    secs.saturating_mul(NANOS_PER_SECOND)
}

/// True when strictly more than `window_secs` elapsed between `since` and `now`.
pub fn elapsed_exceeds(now_nanos: u64, since_nanos: u64, window_secs: u64) -> bool {
    now_nanos.saturating_sub(since_nanos) > secs_to_nanos(window_secs)
}

/// True when at least `window_secs` elapsed between `since` and `now`.
pub fn elapsed_at_least(now_nanos: u64, since_nanos: u64, window_secs: u64) -> bool {
    now_nanos.saturating_sub(since_nanos) >= secs_to_nanos(window_secs)
}
