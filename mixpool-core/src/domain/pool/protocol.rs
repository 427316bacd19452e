//! Payloads exchanged between clients and coordinators.

use crate::domain::broadcast::BroadcastRecord;
use crate::domain::denomination::DenominationMask;
use crate::domain::pool::messages::PoolMessage;
use crate::domain::pool::state::{PoolState, StatusAccepted};
use crate::domain::queue::QueueAdvertisement;
use crate::domain::tx::{Transaction, TxIn, TxOut};
use crate::foundation::{Amount, PeerId, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub denomination: DenominationMask,
    pub collateral: Transaction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySubmission {
    pub inputs: Vec<TxIn>,
    pub amount: Amount,
    pub collateral: Transaction,
    pub outputs: Vec<TxOut>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub session_id: SessionId,
    pub state: PoolState,
    pub entries: usize,
    pub accepted: StatusAccepted,
    pub message: PoolMessage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTransactionProposal {
    pub session_id: SessionId,
    pub transaction: Transaction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedNotice {
    pub session_id: SessionId,
    pub error: bool,
    pub message: PoolMessage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolMessage {
    /// dsa
    JoinRequest(JoinRequest),
    /// dsi
    EntrySubmission(EntrySubmission),
    /// dsq
    Queue(QueueAdvertisement),
    /// dssu
    StatusUpdate(StatusUpdate),
    /// dsf
    FinalTransaction(FinalTransactionProposal),
    /// dss
    Signatures(Vec<TxIn>),
    /// dsc
    Completed(CompletedNotice),
    /// dstx
    BroadcastTx(BroadcastRecord),
    Transaction(Transaction),
}

impl ProtocolMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolMessage::JoinRequest(_) => "dsa",
            ProtocolMessage::EntrySubmission(_) => "dsi",
            ProtocolMessage::Queue(_) => "dsq",
            ProtocolMessage::StatusUpdate(_) => "dssu",
            ProtocolMessage::FinalTransaction(_) => "dsf",
            ProtocolMessage::Signatures(_) => "dss",
            ProtocolMessage::Completed(_) => "dsc",
            ProtocolMessage::BroadcastTx(_) => "dstx",
            ProtocolMessage::Transaction(_) => "tx",
        }
    }
}

/// A message the session wants delivered once its lock is released.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    Broadcast(ProtocolMessage),
    Send { peer: PeerId, message: ProtocolMessage },
}

impl Outbound {
    pub fn message(&self) -> &ProtocolMessage {
        match self {
            Outbound::Broadcast(message) => message,
            Outbound::Send { message, .. } => message,
        }
    }
}
