//! Foundation layer: shared primitives used by every other layer.

pub mod constants;
pub mod error;
pub mod types;
pub mod util;

pub use constants::*;
pub use error::*;
pub use types::*;
pub use util::time::now_nanos;
