/// Log file name for pool nodes.
pub const LOG_FILE_NAME: &str = "mixpool.log";
/// Warn and error records only.
pub const ERR_LOG_FILE_NAME: &str = "mixpool_err.log";

/// Format: `timestamp [LEVEL] message [module] [thread-id]`
pub const LOG_LINE_PATTERN_COLORED: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{h({l:5})}] {m} [{M}] [{I}]{n}";

pub const LOG_LINE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l:5}] {m} [{M}] [{I}]{n}";

/// Rotate after 20 MB.
pub const LOG_FILE_MAX_SIZE: u64 = 20_000_000;

pub const LOG_FILE_MAX_ROLLS: u32 = 5;

/// Crates logged at the requested app level; anything else stays off unless named explicitly.
pub const WHITELISTED_CRATES: &[&str] = &["mixpool_core", "mixpool_keygen"];
