use crate::domain::{LedgerOracle, OutPoint, Script, Transaction, TxOut};
use crate::foundation::{MixError, Result, TxId};
use crate::infrastructure::crypto::{pubkey_hash, verify_digest, COMPACT_SIGNATURE_LEN, SCRIPT_SIG_LEN};
use log::{debug, trace, warn};
use secp256k1::{All, Secp256k1};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

struct LedgerInner {
    utxos: HashMap<OutPoint, TxOut>,
    mempool: Vec<Transaction>,
    mempool_txids: HashSet<TxId>,
    height: u64,
    funding_nonce: u64,
}

/// In-process UTXO set with a mempool, spending pay-to-pubkey-hash outputs only.
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
    secp: Secp256k1<All>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                utxos: HashMap::new(),
                mempool: Vec::new(),
                mempool_txids: HashSet::new(),
                height: 0,
                funding_nonce: 0,
            }),
            secp: Secp256k1::new(),
        }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, LedgerInner>> {
        self.inner.lock().map_err(|_| MixError::LockPoisoned("memory ledger".to_string()))
    }

    pub fn add_utxo(&self, outpoint: OutPoint, output: TxOut) -> Result<()> {
        self.lock_inner()?.utxos.insert(outpoint, output);
        Ok(())
    }

    /// Create a fresh coin of `value` locked to `script`.
    pub fn fund(&self, script: Script, value: u64) -> Result<OutPoint> {
        let mut inner = self.lock_inner()?;
        inner.funding_nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"mixpool/funding/v1");
        hasher.update(&inner.funding_nonce.to_le_bytes());
        let outpoint = OutPoint::new(TxId::new(*hasher.finalize().as_bytes()), 0);
        inner.utxos.insert(outpoint, TxOut::new(value, script));
        Ok(outpoint)
    }

    pub fn set_height(&self, height: u64) -> Result<()> {
        self.lock_inner()?.height = height;
        Ok(())
    }

    pub fn mempool(&self) -> Result<Vec<Transaction>> {
        Ok(self.lock_inner()?.mempool.clone())
    }

    pub fn in_mempool(&self, txid: &TxId) -> Result<bool> {
        Ok(self.lock_inner()?.mempool_txids.contains(txid))
    }

    fn validate_locked(inner: &LedgerInner, tx: &Transaction) -> bool {
        if tx.inputs.is_empty() || tx.outputs.is_empty() {
            return false;
        }
        let mut seen = HashSet::with_capacity(tx.inputs.len());
        let mut value_in: u64 = 0;
        for input in &tx.inputs {
            if !seen.insert(input.previous_output) {
                trace!("duplicate input outpoint={}", input.previous_output);
                return false;
            }
            let Some(prev) = inner.utxos.get(&input.previous_output) else {
                trace!("input not spendable outpoint={}", input.previous_output);
                return false;
            };
            value_in = value_in.saturating_add(prev.value);
        }
        value_in >= tx.total_output_value()
    }

    fn verify_input_locked(&self, inner: &LedgerInner, tx: &Transaction, index: usize) -> bool {
        let Some(input) = tx.inputs.get(index) else {
            return false;
        };
        let Some(prev) = inner.utxos.get(&input.previous_output) else {
            return false;
        };
        let Some(expected_hash) = prev.script_pubkey.pubkey_hash() else {
            debug!("unsupported script for spend outpoint={}", input.previous_output);
            return false;
        };
        if input.script_sig.len() != SCRIPT_SIG_LEN {
            return false;
        }
        let (signature, public_key) = input.script_sig.split_at(COMPACT_SIGNATURE_LEN);
        if pubkey_hash(public_key) != expected_hash {
            return false;
        }
        let Ok(digest) = tx.signature_hash(index) else {
            return false;
        };
        verify_digest(&self.secp, digest, signature, public_key)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerOracle for MemoryLedger {
    fn spendable_output(&self, outpoint: &OutPoint) -> Option<TxOut> {
        match self.lock_inner() {
            Ok(inner) => inner.utxos.get(outpoint).cloned(),
            Err(err) => {
                warn!("ledger lookup failed error={}", err);
                None
            }
        }
    }

    fn validate(&self, tx: &Transaction) -> bool {
        match self.lock_inner() {
            Ok(inner) => Self::validate_locked(&inner, tx),
            Err(err) => {
                warn!("ledger validate failed error={}", err);
                false
            }
        }
    }

    fn verify_input(&self, tx: &Transaction, index: usize) -> bool {
        match self.lock_inner() {
            Ok(inner) => self.verify_input_locked(&inner, tx, index),
            Err(err) => {
                warn!("ledger verify failed error={}", err);
                false
            }
        }
    }

    fn current_block_height(&self) -> u64 {
        self.lock_inner().map(|inner| inner.height).unwrap_or(0)
    }

    /// Spends the inputs and adds the outputs. All-or-nothing.
    fn accept_to_mempool(&self, tx: &Transaction) -> bool {
        let Ok(txid) = tx.txid() else {
            return false;
        };
        let mut inner = match self.lock_inner() {
            Ok(inner) => inner,
            Err(err) => {
                warn!("ledger mempool failed error={}", err);
                return false;
            }
        };
        if inner.mempool_txids.contains(&txid) {
            debug!("transaction already in mempool txid={}", txid);
            return false;
        }
        if !Self::validate_locked(&inner, tx) {
            return false;
        }
        if !(0..tx.inputs.len()).all(|idx| self.verify_input_locked(&inner, tx, idx)) {
            debug!("transaction has invalid unlocking data txid={}", txid);
            return false;
        }
        for input in &tx.inputs {
            inner.utxos.remove(&input.previous_output);
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            inner.utxos.insert(OutPoint::new(txid, index as u32), output.clone());
        }
        inner.mempool_txids.insert(txid);
        inner.mempool.push(tx.clone());
        debug!("transaction accepted to mempool txid={} inputs={} outputs={}", txid, tx.inputs.len(), tx.outputs.len());
        true
    }
}
