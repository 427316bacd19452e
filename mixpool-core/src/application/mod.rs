//! Application layer: drives the pool session from transport messages and timers.

pub mod pool;
pub mod relay;
pub mod tick;

pub use pool::PoolService;
pub use relay::RelayNotifier;
pub use tick::{run_message_loop, run_pool_tick_loop};
