use crate::domain::ProtocolMessage;
use crate::foundation::PeerId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub sender_peer_id: PeerId,
    /// Pool protocol version the sender speaks; gates admission on the coordinator.
    pub protocol_version: u32,
    pub seq_no: u64,
    pub timestamp_nanos: u64,
    pub payload: ProtocolMessage,
}
