//! Signed session advertisements and the book of advertisements a node has seen.

use crate::domain::denomination::DenominationMask;
use crate::domain::ports::{CoordinatorId, MasternodeDirectory, MessageSigner, MessageVerifier};
use crate::foundation::util::time::elapsed_exceeds;
use crate::foundation::{MixError, Result, QUEUE_TIMEOUT_SECS};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const ADVERTISEMENT_DOMAIN: &[u8] = b"mixpool/dsq/v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueAdvertisement {
    pub coordinator: CoordinatorId,
    pub created_at: u64,
    pub denomination: DenominationMask,
    pub ready: bool,
    pub signature: Vec<u8>,
}

impl QueueAdvertisement {
    pub fn new(coordinator: CoordinatorId, denomination: DenominationMask, ready: bool, now: u64) -> Self {
        Self { coordinator, created_at: now, denomination, ready, signature: Vec::new() }
    }

    pub fn signing_payload(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(&(self.denomination, &self.coordinator, self.created_at, self.ready))?;
        let mut payload = Vec::with_capacity(ADVERTISEMENT_DOMAIN.len() + body.len());
        payload.extend_from_slice(ADVERTISEMENT_DOMAIN);
        payload.extend_from_slice(&body);
        Ok(payload)
    }

    /// Sign with the active coordinator key and check the result against that key.
    pub fn sign(&mut self, signer: Option<&dyn MessageSigner>, verifier: &dyn MessageVerifier) -> Result<()> {
        let signer = signer.ok_or(MixError::NoActiveCoordinator)?;
        let payload = self.signing_payload()?;
        let signature = signer.sign(&payload)?;
        if !verifier.verify(&payload, &signature, &signer.public_key()) {
            return Err(MixError::SignatureVerificationFailed(format!("advertisement coordinator={}", self.coordinator)));
        }
        self.signature = signature;
        Ok(())
    }

    /// False when the coordinator is unknown or the signature does not match its registered key.
    pub fn check_signature(&self, directory: &dyn MasternodeDirectory, verifier: &dyn MessageVerifier) -> bool {
        let Some(info) = directory.resolve(&self.coordinator) else {
            debug!("advertisement coordinator not in directory coordinator={}", self.coordinator);
            return false;
        };
        let Ok(payload) = self.signing_payload() else {
            return false;
        };
        verifier.verify(&payload, &self.signature, &info.public_key)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        elapsed_exceeds(now, self.created_at, QUEUE_TIMEOUT_SECS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueDecision {
    /// A ready advertisement; the caller decides whether it concerns its own round.
    Ready,
    /// New open session stored; the caller should relay it.
    Stored,
    Duplicate,
    RateLimited,
    Expired,
    Rejected,
}

/// Advertisements seen from other coordinators, at most one per coordinator.
#[derive(Debug, Default)]
pub struct QueueBook {
    advertisements: Vec<QueueAdvertisement>,
    dsq_count: u64,
    last_dsq: HashMap<CoordinatorId, u64>,
}

impl QueueBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(
        &mut self,
        adv: QueueAdvertisement,
        directory: &dyn MasternodeDirectory,
        verifier: &dyn MessageVerifier,
        min_protocol_version: u32,
        now: u64,
    ) -> QueueDecision {
        if adv.is_expired(now) {
            return QueueDecision::Expired;
        }
        if !adv.check_signature(directory, verifier) {
            return QueueDecision::Rejected;
        }
        if adv.ready {
            return QueueDecision::Ready;
        }
        if self.advertisements.iter().any(|known| known.coordinator == adv.coordinator) {
            return QueueDecision::Duplicate;
        }
        if self.is_rate_limited(&adv.coordinator, directory.count_enabled(min_protocol_version)) {
            debug!("coordinator advertising too often coordinator={} dsq_count={}", adv.coordinator, self.dsq_count);
            return QueueDecision::RateLimited;
        }
        self.note(&adv.coordinator);
        trace!("advertisement stored coordinator={} denomination={}", adv.coordinator, adv.denomination);
        self.advertisements.push(adv);
        QueueDecision::Stored
    }

    /// A coordinator that advertised within the last `enabled / 5` advertisements must wait.
    pub fn is_rate_limited(&self, coordinator: &CoordinatorId, enabled: usize) -> bool {
        match self.last_dsq.get(coordinator) {
            Some(last) if *last != 0 => last.saturating_add((enabled / 5) as u64) > self.dsq_count,
            _ => false,
        }
    }

    /// Count an advertisement from `coordinator` without storing it.
    pub fn note(&mut self, coordinator: &CoordinatorId) {
        self.dsq_count += 1;
        self.last_dsq.insert(*coordinator, self.dsq_count);
    }

    /// First live advertisement for exactly `mask`; coordinators admit no other denomination set.
    pub fn pick(&self, mask: DenominationMask, now: u64) -> Option<&QueueAdvertisement> {
        self.advertisements.iter().find(|adv| !adv.is_expired(now) && adv.denomination == mask)
    }

    pub fn remove(&mut self, coordinator: &CoordinatorId) {
        self.advertisements.retain(|adv| &adv.coordinator != coordinator);
    }

    pub fn prune(&mut self, now: u64) -> usize {
        let before = self.advertisements.len();
        self.advertisements.retain(|adv| !adv.is_expired(now));
        before - self.advertisements.len()
    }

    pub fn advertisements(&self) -> &[QueueAdvertisement] {
        &self.advertisements
    }

    pub fn dsq_count(&self) -> u64 {
        self.dsq_count
    }

    pub fn last_dsq(&self, coordinator: &CoordinatorId) -> u64 {
        self.last_dsq.get(coordinator).copied().unwrap_or(0)
    }
}
