//! Participant side of a round: join, submit, follow the coordinator, countersign.

use crate::domain::entry::Entry;
use crate::domain::pool::protocol::{
    CompletedNotice, EntrySubmission, FinalTransactionProposal, JoinRequest, Outbound, ProtocolMessage, StatusUpdate,
};
use crate::domain::pool::session::{MixingSession, SubmittedTo};
use crate::domain::pool::signing::{match_own_entry, sign_inputs};
use crate::domain::pool::state::{PoolRole, PoolState, StatusAccepted};
use crate::domain::ports::{CoordinatorId, InputSigner};
use crate::domain::tx::{Transaction, TxIn, TxOut};
use crate::foundation::{Amount, MixError, PeerId, Result};
use log::{debug, info, warn};

/// What a client intends to mix in one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPlan {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub amount: Amount,
    pub collateral: Transaction,
}

impl MixingSession {
    fn require_client(&self, operation: &str) -> Result<()> {
        match self.config.role {
            PoolRole::Client => Ok(()),
            role => Err(MixError::wrong_role(operation, role)),
        }
    }

    fn from_coordinator(&self, peer: &PeerId) -> bool {
        self.submitted_to.as_ref().is_some_and(|submitted| &submitted.peer == peer)
    }

    /// Ask `coordinator` to admit us with the denominations of `plan`. Our inputs stay locked until the round ends.
    pub fn join(&mut self, coordinator: CoordinatorId, plan: EntryPlan, now: u64) -> Result<()> {
        self.require_client("join")?;
        if self.state != PoolState::Idle {
            return Err(MixError::InvalidStateTransition { from: self.state.to_string(), to: PoolState::Queue.to_string() });
        }
        let info = self.ctx.directory.resolve(&coordinator).ok_or_else(|| MixError::CoordinatorNotFound(coordinator.to_string()))?;
        if info.protocol_version < self.config.min_peer_protocol_version {
            return Err(MixError::Message(format!(
                "coordinator {} speaks protocol {} below {}",
                coordinator, info.protocol_version, self.config.min_peer_protocol_version
            )));
        }
        let denomination = self.catalog.encode(&plan.outputs);
        if denomination == 0 {
            let amount = plan.outputs.iter().map(|out| out.value).find(|value| self.catalog.amount_to_denomination(*value).is_err());
            return Err(MixError::UnknownDenomination { amount: amount.unwrap_or(0) });
        }

        let EntryPlan { inputs, outputs, amount, collateral } = plan;
        let mut entry = Entry::new();
        entry.add(inputs, amount, collateral.clone(), outputs, now);
        self.locked_inputs = entry.inputs().iter().map(|input| *input.outpoint()).collect();
        self.entries = vec![entry];
        self.session_collaterals = vec![collateral.clone()];
        self.session_denomination = denomination;
        self.submitted_to = Some(SubmittedTo { coordinator, peer: info.address.clone() });
        self.transition(PoolState::Queue, now)?;

        info!("joining coordinator={} peer={} denomination={}", coordinator, info.address, self.catalog.decode(denomination));
        self.outbox.push(Outbound::Send { peer: info.address, message: ProtocolMessage::JoinRequest(JoinRequest { denomination, collateral }) });
        Ok(())
    }

    /// Submit our entry to the coordinator we joined.
    ///
    /// Each submission counts against `max_relay_attempts`; past the limit the round is abandoned.
    pub fn send_denominate(&mut self, now: u64) -> Result<bool> {
        self.require_client("send_denominate")?;
        let peer = self
            .submitted_to
            .as_ref()
            .map(|submitted| submitted.peer.clone())
            .ok_or_else(|| MixError::CoordinatorNotFound("no coordinator joined".to_string()))?;
        let Some(entry) = self.entries.first() else {
            return Err(MixError::Message("no entry prepared".to_string()));
        };
        if entry.times_relayed() >= self.config.max_relay_attempts {
            warn!("entry relayed too often, abandoning round times_relayed={}", entry.times_relayed());
            self.reset(now);
            return Ok(false);
        }
        if !self.ctx.ledger.validate(entry.supporting_tx()) {
            warn!("own entry rejected by local ledger check");
            self.reset(now);
            return Ok(false);
        }
        let submission = EntrySubmission {
            inputs: entry.tx_inputs(),
            amount: entry.amount(),
            collateral: entry.collateral().clone(),
            outputs: entry.tx_outputs(),
        };
        if let Some(entry) = self.entries.first_mut() {
            entry.mark_relayed();
        }
        if self.state == PoolState::Queue {
            self.transition(PoolState::AcceptingEntries, now)?;
        }
        debug!("entry submitted peer={} inputs={}", peer, submission.inputs.len());
        self.outbox.push(Outbound::Send { peer, message: ProtocolMessage::EntrySubmission(submission) });
        Ok(true)
    }

    /// A ready advertisement from `coordinator`. Submits our entry if it is the one we joined.
    pub fn on_queue_ready(&mut self, coordinator: &CoordinatorId, now: u64) -> Result<bool> {
        if self.config.role != PoolRole::Client {
            return Ok(false);
        }
        let ours = self.submitted_to.as_ref().is_some_and(|submitted| &submitted.coordinator == coordinator);
        if !ours {
            debug!("ready advertisement from other coordinator ignored coordinator={}", coordinator);
            return Ok(false);
        }
        if !matches!(self.state, PoolState::Queue | PoolState::AcceptingEntries) {
            return Ok(false);
        }
        if self.entries.first().map(Entry::times_relayed).unwrap_or(0) > 0 {
            return Ok(false);
        }
        self.send_denominate(now)
    }

    /// Status pushed by our coordinator.
    pub fn status_update(&mut self, peer: &PeerId, update: &StatusUpdate, now: u64) {
        if self.config.role != PoolRole::Client || !self.from_coordinator(peer) {
            return;
        }
        if self.state.is_terminal() {
            return;
        }
        if !self.session_id.is_none() && !update.session_id.is_none() && update.session_id != self.session_id {
            debug!("status for other session ignored session_id={} ours={}", update.session_id, self.session_id);
            return;
        }
        if update.state == PoolState::Idle && self.state.is_active() {
            info!("coordinator reset the round session_id={}", self.session_id);
            self.reset(now);
            return;
        }

        self.entries_count = update.entries;
        match update.accepted {
            StatusAccepted::Rejected => {
                self.last_entry_accepted = false;
                self.last_message = update.message;
                warn!("coordinator rejected us reason={}", update.message);
                self.transition_or_log(PoolState::Error, now);
                self.locked_inputs.clear();
                return;
            }
            StatusAccepted::Accepted => {
                self.last_entry_accepted = true;
                self.count_entries_accepted += 1;
                self.last_message = update.message;
                if self.session_id.is_none() && !update.session_id.is_none() {
                    self.session_id = update.session_id;
                    debug!("session id assigned session_id={}", self.session_id);
                }
            }
            StatusAccepted::Reset => {}
        }
        if update.state.is_active() && self.state.can_transition_to(update.state) {
            self.transition_or_log(update.state, now);
        }
    }

    /// Verify the proposal carries our entry unmodified and countersign our inputs.
    ///
    /// Any mismatch abandons the round without telling the coordinator why.
    pub fn sign_final_transaction(
        &mut self,
        peer: &PeerId,
        proposal: &FinalTransactionProposal,
        signer: &dyn InputSigner,
        now: u64,
    ) -> Result<bool> {
        self.require_client("sign_final_transaction")?;
        if !self.from_coordinator(peer) || !self.state.is_active() {
            return Ok(false);
        }
        if !self.session_id.is_none() && proposal.session_id != self.session_id {
            return Ok(false);
        }
        let Some(own) = self.entries.first() else {
            return Ok(false);
        };
        let Some(positions) = match_own_entry(&proposal.transaction, own) else {
            warn!("final transaction does not carry our entry, refusing to sign");
            self.reset(now);
            return Ok(false);
        };
        let signed = match sign_inputs(&proposal.transaction, &positions, signer) {
            Ok(signed) => signed,
            Err(err) => {
                self.reset(now);
                return Err(err);
            }
        };
        if let Some(own) = self.entries.first_mut() {
            for input in &signed {
                own.add_signature(input);
            }
        }
        self.final_transaction = Some(proposal.transaction.clone());
        if self.state.can_transition_to(PoolState::Signing) {
            self.transition_or_log(PoolState::Signing, now);
        }
        debug!("final transaction signed inputs={}", signed.len());
        self.outbox.push(Outbound::Send { peer: peer.clone(), message: ProtocolMessage::Signatures(signed) });
        Ok(true)
    }

    /// Completion notice from our coordinator. Unlocks our inputs; the round resets after `reset_delay_secs`.
    pub fn completed_transaction(&mut self, peer: &PeerId, notice: &CompletedNotice, now: u64) {
        if self.config.role != PoolRole::Client || !self.from_coordinator(peer) || !self.state.is_active() {
            return;
        }
        if !self.session_id.is_none() && notice.session_id != self.session_id {
            return;
        }
        self.last_message = notice.message;
        if notice.error {
            info!("round failed reason={}", notice.message);
            self.transition_or_log(PoolState::Error, now);
        } else {
            info!("round completed session_id={}", self.session_id);
            if self.state != PoolState::Transmission {
                self.transition_or_log(PoolState::Transmission, now);
            }
            self.transition_or_log(PoolState::Success, now);
            self.last_success_height = self.block_height_cache;
        }
        self.locked_inputs.clear();
    }

    pub fn count_entries_accepted(&self) -> u32 {
        self.count_entries_accepted
    }

    pub fn last_entry_accepted(&self) -> bool {
        self.last_entry_accepted
    }
}
