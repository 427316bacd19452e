use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome identifiers surfaced to peers and UIs. Ids are stable on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum PoolMessage {
    #[serde(rename = "already-have-entry")]
    AlreadyHave = 0,
    #[serde(rename = "denomination-mismatch")]
    Denom = 1,
    EntriesFull = 2,
    #[serde(rename = "existing-transaction-incompatible")]
    ExistingTx = 3,
    #[serde(rename = "fee-insufficient")]
    Fees = 4,
    #[serde(rename = "collateral-invalid")]
    InvalidCollateral = 5,
    #[serde(rename = "input-invalid")]
    InvalidInput = 6,
    #[serde(rename = "script-invalid")]
    InvalidScript = 7,
    #[serde(rename = "transaction-invalid")]
    InvalidTx = 8,
    #[serde(rename = "pool-maximum-reached")]
    Maximum = 9,
    #[serde(rename = "no-known-coordinators")]
    MnList = 10,
    #[serde(rename = "wrong-mode")]
    Mode = 11,
    #[serde(rename = "nonstandard-output-script")]
    NonStandardPubkey = 12,
    #[serde(rename = "not-a-coordinator")]
    NotAMn = 13,
    QueueFull = 14,
    #[serde(rename = "too-recent")]
    Recent = 15,
    #[serde(rename = "no-active-session")]
    Session = 16,
    #[serde(rename = "missing-transaction")]
    MissingTx = 17,
    #[serde(rename = "protocol-version-mismatch")]
    Version = 18,
    #[default]
    NoError = 19,
    Success = 20,
    EntriesAdded = 21,
    SessionTimeout = 22,
    SigningTimeout = 23,
}

const ALL: [PoolMessage; 24] = [
    PoolMessage::AlreadyHave,
    PoolMessage::Denom,
    PoolMessage::EntriesFull,
    PoolMessage::ExistingTx,
    PoolMessage::Fees,
    PoolMessage::InvalidCollateral,
    PoolMessage::InvalidInput,
    PoolMessage::InvalidScript,
    PoolMessage::InvalidTx,
    PoolMessage::Maximum,
    PoolMessage::MnList,
    PoolMessage::Mode,
    PoolMessage::NonStandardPubkey,
    PoolMessage::NotAMn,
    PoolMessage::QueueFull,
    PoolMessage::Recent,
    PoolMessage::Session,
    PoolMessage::MissingTx,
    PoolMessage::Version,
    PoolMessage::NoError,
    PoolMessage::Success,
    PoolMessage::EntriesAdded,
    PoolMessage::SessionTimeout,
    PoolMessage::SigningTimeout,
];

impl PoolMessage {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        ALL.get(usize::from(id)).copied()
    }

    pub fn is_error(self) -> bool {
        !matches!(self, PoolMessage::NoError | PoolMessage::Success | PoolMessage::EntriesAdded)
    }

    pub fn name(self) -> &'static str {
        match self {
            PoolMessage::AlreadyHave => "already-have-entry",
            PoolMessage::Denom => "denomination-mismatch",
            PoolMessage::EntriesFull => "entries-full",
            PoolMessage::ExistingTx => "existing-transaction-incompatible",
            PoolMessage::Fees => "fee-insufficient",
            PoolMessage::InvalidCollateral => "collateral-invalid",
            PoolMessage::InvalidInput => "input-invalid",
            PoolMessage::InvalidScript => "script-invalid",
            PoolMessage::InvalidTx => "transaction-invalid",
            PoolMessage::Maximum => "pool-maximum-reached",
            PoolMessage::MnList => "no-known-coordinators",
            PoolMessage::Mode => "wrong-mode",
            PoolMessage::NonStandardPubkey => "nonstandard-output-script",
            PoolMessage::NotAMn => "not-a-coordinator",
            PoolMessage::QueueFull => "queue-full",
            PoolMessage::Recent => "too-recent",
            PoolMessage::Session => "no-active-session",
            PoolMessage::MissingTx => "missing-transaction",
            PoolMessage::Version => "protocol-version-mismatch",
            PoolMessage::NoError => "no-error",
            PoolMessage::Success => "success",
            PoolMessage::EntriesAdded => "entries-added",
            PoolMessage::SessionTimeout => "session-timeout",
            PoolMessage::SigningTimeout => "signing-timeout",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PoolMessage::AlreadyHave => "Already have that input.",
            PoolMessage::Denom => "No matching denominations found for mixing.",
            PoolMessage::EntriesFull => "Entries are full.",
            PoolMessage::ExistingTx => "Not compatible with existing transactions.",
            PoolMessage::Fees => "Transaction fees are too high.",
            PoolMessage::InvalidCollateral => "Collateral not valid.",
            PoolMessage::InvalidInput => "Input is not valid.",
            PoolMessage::InvalidScript => "Invalid script detected.",
            PoolMessage::InvalidTx => "Transaction not valid.",
            PoolMessage::Maximum => "Value more than pool maximum allows.",
            PoolMessage::MnList => "Not in the coordinator list.",
            PoolMessage::Mode => "Incompatible mode.",
            PoolMessage::NonStandardPubkey => "Non-standard public key detected.",
            PoolMessage::NotAMn => "This is not a coordinator.",
            PoolMessage::QueueFull => "Coordinator queue is full.",
            PoolMessage::Recent => "Last queue was created too recently.",
            PoolMessage::Session => "Session not complete.",
            PoolMessage::MissingTx => "Missing input transaction information.",
            PoolMessage::Version => "Incompatible version.",
            PoolMessage::NoError => "No errors detected.",
            PoolMessage::Success => "Transaction created successfully.",
            PoolMessage::EntriesAdded => "Your entries added successfully.",
            PoolMessage::SessionTimeout => "Session timed out.",
            PoolMessage::SigningTimeout => "Signing timed out.",
        }
    }
}

impl fmt::Display for PoolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
