//! Coordinator directory and local coordinator identity.

use crate::domain::{CoordinatorId, CoordinatorIdentity, MasternodeDirectory, MasternodeInfo, OutPoint};
use crate::foundation::{MixError, PeerId, Result};
use crate::infrastructure::config::IdentityConfig;
use crate::infrastructure::crypto::Secp256k1MessageSigner;
use log::warn;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Fixed set of known coordinators.
#[derive(Default)]
pub struct StaticDirectory {
    entries: RwLock<BTreeMap<CoordinatorId, MasternodeInfo>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: CoordinatorId, info: MasternodeInfo) -> Result<()> {
        self.entries.write().map_err(|_| MixError::LockPoisoned("static directory".to_string()))?.insert(id, info);
        Ok(())
    }

    pub fn remove(&self, id: &CoordinatorId) -> Result<bool> {
        Ok(self.entries.write().map_err(|_| MixError::LockPoisoned("static directory".to_string()))?.remove(id).is_some())
    }
}

impl MasternodeDirectory for StaticDirectory {
    fn resolve(&self, id: &CoordinatorId) -> Option<MasternodeInfo> {
        match self.entries.read() {
            Ok(entries) => entries.get(id).cloned(),
            Err(_) => {
                warn!("static directory lock poisoned");
                None
            }
        }
    }

    fn count_enabled(&self, min_protocol_version: u32) -> usize {
        self.entries
            .read()
            .map(|entries| entries.values().filter(|info| info.protocol_version >= min_protocol_version).count())
            .unwrap_or(0)
    }
}

/// Build the coordinator identity from `[identity]` config.
pub fn coordinator_identity_from_config(config: &IdentityConfig) -> Result<CoordinatorIdentity> {
    let secret = config
        .secret_key_hex
        .as_deref()
        .ok_or_else(|| MixError::ConfigError("identity.secret_key_hex missing".to_string()))?;
    let outpoint: OutPoint = config
        .collateral_outpoint
        .as_deref()
        .ok_or_else(|| MixError::ConfigError("identity.collateral_outpoint missing".to_string()))?
        .parse()?;
    let signer = Secp256k1MessageSigner::from_secret_hex(secret)?;
    Ok(CoordinatorIdentity { id: CoordinatorId::new(outpoint), signer: Arc::new(signer) })
}

/// Directory record announcing `identity` at `address`.
pub fn masternode_info(identity: &CoordinatorIdentity, address: PeerId, protocol_version: u32) -> MasternodeInfo {
    MasternodeInfo { address, public_key: identity.signer.public_key(), protocol_version }
}
