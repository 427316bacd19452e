//! Pool rules with no I/O. Capabilities come in through the traits in `ports`.

pub mod broadcast;
pub mod collateral;
pub mod denomination;
pub mod entry;
pub mod pool;
pub mod ports;
pub mod queue;
pub mod tx;

pub use broadcast::{BroadcastCache, BroadcastRecord};
pub use denomination::{is_compatible, DenominationCatalog, DenominationMask, STANDARD_DENOMINATIONS};
pub use entry::{Entry, PoolInput, PoolOutput};
pub use pool::*;
pub use ports::{CoordinatorId, InputSigner, LedgerOracle, MasternodeDirectory, MasternodeInfo, MessageSigner, MessageVerifier};
pub use queue::{QueueAdvertisement, QueueBook, QueueDecision};
pub use tx::{OutPoint, Script, Transaction, TxIn, TxOut};
