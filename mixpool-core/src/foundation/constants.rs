//! Protocol-wide constants for the mixing pool.

/// Nanoseconds per second (10^9).
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Base monetary unit (10^8 smallest units).
pub const COIN: u64 = 100_000_000;

/// Queue window: entries and open sessions older than this are dropped (30 seconds).
pub const QUEUE_TIMEOUT_SECS: u64 = 30;

/// Signing window for participants once the final transaction is proposed (15 seconds).
pub const SIGNING_TIMEOUT_SECS: u64 = 15;

/// Delay before a finished round (success or error) is reset back to idle.
pub const TERMINAL_RESET_DELAY_SECS: u64 = 10;

/// Extra grace a client gives its coordinator before resetting on its own.
pub const CLIENT_LAG_SECS: u64 = 10;

/// Collateral a participant must burn as fee when joining (0.01 COIN).
pub const POOL_COLLATERAL: u64 = COIN / 100;

/// Maximum input value accepted in a single entry (999.99 COIN).
pub const POOL_MAX_AMOUNT: u64 = 999 * COIN + 99 * COIN / 100;

/// Default number of participants per round.
pub const DEFAULT_MAX_POOL_TRANSACTIONS: usize = 3;

/// Oldest peer protocol version allowed to take part in mixing.
pub const MIN_POOL_PEER_PROTO_VERSION: u32 = 70103;

/// Protocol version this node speaks.
pub const PROTOCOL_VERSION: u32 = 70103;

/// Length of a standard pay-to-pubkey-hash output script.
pub const STANDARD_SCRIPT_LEN: usize = 25;

/// Session ids are drawn uniformly from `1..=MAX_SESSION_ID`.
pub const MAX_SESSION_ID: u32 = 999_999;

/// Environment variable consulted by `now_nanos` so tests can pin the clock.
pub const TEST_NOW_NANOS_ENV_VAR: &str = "MIXPOOL_TEST_NOW_NANOS";
