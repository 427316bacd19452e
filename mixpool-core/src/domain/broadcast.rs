use crate::domain::ports::{CoordinatorId, MasternodeDirectory, MessageSigner, MessageVerifier};
use crate::domain::tx::Transaction;
use crate::foundation::util::time::elapsed_exceeds;
use crate::foundation::{MixError, Result, TxId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BROADCAST_DOMAIN: &[u8] = b"mixpool/dstx/v1";

/// A finished mixing transaction vouched for by the coordinator that built it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRecord {
    pub transaction: Transaction,
    pub coordinator: CoordinatorId,
    pub signature: Vec<u8>,
    pub signed_at: u64,
}

impl BroadcastRecord {
    pub fn new(transaction: Transaction, coordinator: CoordinatorId, now: u64) -> Self {
        Self { transaction, coordinator, signature: Vec::new(), signed_at: now }
    }

    pub fn txid(&self) -> Result<TxId> {
        self.transaction.txid()
    }

    fn signing_payload(&self) -> Result<Vec<u8>> {
        let txid = self.txid()?;
        let mut payload = Vec::with_capacity(BROADCAST_DOMAIN.len() + 40);
        payload.extend_from_slice(BROADCAST_DOMAIN);
        payload.extend_from_slice(txid.as_hash());
        payload.extend_from_slice(&self.signed_at.to_le_bytes());
        Ok(payload)
    }

    pub fn sign(&mut self, signer: &dyn MessageSigner, verifier: &dyn MessageVerifier) -> Result<()> {
        let payload = self.signing_payload()?;
        let signature = signer.sign(&payload)?;
        if !verifier.verify(&payload, &signature, &signer.public_key()) {
            return Err(MixError::SignatureVerificationFailed(format!("broadcast record coordinator={}", self.coordinator)));
        }
        self.signature = signature;
        Ok(())
    }

    pub fn check_signature(&self, directory: &dyn MasternodeDirectory, verifier: &dyn MessageVerifier) -> bool {
        let Some(info) = directory.resolve(&self.coordinator) else {
            return false;
        };
        match self.signing_payload() {
            Ok(payload) => verifier.verify(&payload, &self.signature, &info.public_key),
            Err(_) => false,
        }
    }

    pub fn is_expired(&self, now: u64, ttl_secs: u64) -> bool {
        elapsed_exceeds(now, self.signed_at, ttl_secs)
    }
}

/// Seen mixing transactions keyed by txid, used to relay each one once.
#[derive(Debug, Default)]
pub struct BroadcastCache {
    records: HashMap<TxId, BroadcastRecord>,
}

impl BroadcastCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a record for the same transaction is already cached.
    pub fn insert(&mut self, record: BroadcastRecord) -> Result<bool> {
        let txid = record.txid()?;
        if self.records.contains_key(&txid) {
            return Ok(false);
        }
        self.records.insert(txid, record);
        Ok(true)
    }

    pub fn contains(&self, txid: &TxId) -> bool {
        self.records.contains_key(txid)
    }

    pub fn get(&self, txid: &TxId) -> Option<&BroadcastRecord> {
        self.records.get(txid)
    }

    pub fn prune(&mut self, now: u64, ttl_secs: u64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now, ttl_secs));
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
