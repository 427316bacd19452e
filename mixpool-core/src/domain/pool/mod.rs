pub mod auto;
pub mod client;
pub mod config;
pub mod messages;
pub mod penalty;
pub mod protocol;
pub mod session;
pub mod signing;
pub mod state;

pub use auto::{AutoDenominator, AutoJoin};
pub use client::EntryPlan;
pub use config::PoolConfig;
pub use messages::PoolMessage;
pub use penalty::MisbehaviorPenalizer;
pub use protocol::{
    CompletedNotice, EntrySubmission, FinalTransactionProposal, JoinRequest, Outbound, ProtocolMessage, StatusUpdate,
};
pub use session::{CoordinatorIdentity, MixingSession, SessionContext, SubmittedTo};
pub use state::{PoolRole, PoolState, StatusAccepted};
