//! Capabilities the pool engine consumes from its host.
//!
//! Implementations live in `infrastructure`; the domain only sees these traits.

use crate::domain::tx::{OutPoint, Transaction, TxOut};
use crate::foundation::{PeerId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a coordinator: the collateral output that registers it in the directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordinatorId(OutPoint);

impl CoordinatorId {
    pub fn new(outpoint: OutPoint) -> Self {
        Self(outpoint)
    }

    pub fn outpoint(&self) -> &OutPoint {
        &self.0
    }
}

impl fmt::Display for CoordinatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasternodeInfo {
    pub address: PeerId,
    pub public_key: Vec<u8>,
    pub protocol_version: u32,
}

pub trait LedgerOracle: Send + Sync {
    /// The unspent output referenced by `outpoint`, if the ledger knows it.
    fn spendable_output(&self, outpoint: &OutPoint) -> Option<TxOut>;

    fn is_spendable(&self, outpoint: &OutPoint) -> bool {
        self.spendable_output(outpoint).is_some()
    }

    /// Structural validity of `tx` against the current ledger, unlocking data aside.
    fn validate(&self, tx: &Transaction) -> bool;

    /// Whether the unlocking data of input `index` satisfies the output it spends.
    fn verify_input(&self, tx: &Transaction, index: usize) -> bool;

    fn current_block_height(&self) -> u64;

    fn accept_to_mempool(&self, tx: &Transaction) -> bool;
}

pub trait MasternodeDirectory: Send + Sync {
    fn resolve(&self, id: &CoordinatorId) -> Option<MasternodeInfo>;

    /// Number of enabled coordinators speaking at least `min_protocol_version`.
    fn count_enabled(&self, min_protocol_version: u32) -> usize;
}

/// Signs with the node's fixed coordinator key.
pub trait MessageSigner: Send + Sync {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
    fn public_key(&self) -> Vec<u8>;
}

pub trait MessageVerifier: Send + Sync {
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Wallet-side signer producing unlocking data for the client's own inputs.
pub trait InputSigner: Send + Sync {
    fn sign_input(&self, tx: &Transaction, index: usize) -> Result<Vec<u8>>;
}
