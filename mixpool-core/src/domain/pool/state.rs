use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PoolState {
    #[default]
    Unknown = 0,
    Idle = 1,
    Queue = 2,
    AcceptingEntries = 3,
    FinalizeTransaction = 4,
    Signing = 5,
    Transmission = 6,
    Error = 7,
    Success = 8,
}

impl PoolState {
    /// Forward-only moves within a round; any active state may fail into `Error`.
    ///
    /// Returning to `Idle` is a reset and never goes through this table.
    pub fn can_transition_to(self, target: PoolState) -> bool {
        use PoolState::*;
        match (self, target) {
            (Unknown, Idle) | (Idle, Queue) | (Transmission, Success) => true,
            (from, Error) => from.is_active(),
            (from, to) if from.is_active() && to.is_active() => to.rank() > from.rank(),
            _ => false,
        }
    }

    /// A round is in progress.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PoolState::Queue
                | PoolState::AcceptingEntries
                | PoolState::FinalizeTransaction
                | PoolState::Signing
                | PoolState::Transmission
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PoolState::Error | PoolState::Success)
    }

    pub fn is_before_signing(self) -> bool {
        matches!(self, PoolState::Queue | PoolState::AcceptingEntries | PoolState::FinalizeTransaction)
    }

    fn rank(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Unknown => "unknown",
            PoolState::Idle => "idle",
            PoolState::Queue => "queue",
            PoolState::AcceptingEntries => "accepting_entries",
            PoolState::FinalizeTransaction => "finalize_transaction",
            PoolState::Signing => "signing",
            PoolState::Transmission => "transmission",
            PoolState::Error => "error",
            PoolState::Success => "success",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolRole {
    #[default]
    Client,
    Coordinator,
}

impl fmt::Display for PoolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolRole::Client => f.write_str("client"),
            PoolRole::Coordinator => f.write_str("coordinator"),
        }
    }
}

/// Verdict a coordinator attaches to a status update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusAccepted {
    Rejected,
    Accepted,
    /// Plain state broadcast, not a reply to a request.
    Reset,
}
