//! The mixing round: admission, finalization, signature collection and timeouts.
//!
//! Every operation is synchronous and takes `now` explicitly. Messages for peers are
//! queued in an outbox which the caller drains with [`MixingSession::take_outbox`]
//! after releasing whatever lock guards the session.

use crate::domain::broadcast::BroadcastRecord;
use crate::domain::collateral::is_collateral_valid;
use crate::domain::denomination::{DenominationCatalog, DenominationMask};
use crate::domain::entry::Entry;
use crate::domain::pool::config::PoolConfig;
use crate::domain::pool::messages::PoolMessage;
use crate::domain::pool::penalty::MisbehaviorPenalizer;
use crate::domain::pool::protocol::{
    CompletedNotice, EntrySubmission, FinalTransactionProposal, JoinRequest, Outbound, ProtocolMessage, StatusUpdate,
};
use crate::domain::pool::state::{PoolRole, PoolState, StatusAccepted};
use crate::domain::ports::{CoordinatorId, LedgerOracle, MasternodeDirectory, MessageSigner, MessageVerifier};
use crate::domain::queue::QueueAdvertisement;
use crate::domain::tx::{OutPoint, Transaction, TxIn, TxOut};
use crate::foundation::util::time::{elapsed_at_least, elapsed_exceeds};
use crate::foundation::{Amount, MixError, PeerId, Result, SessionId, MAX_SESSION_ID, STANDARD_SCRIPT_LEN};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// The key this node signs advertisements and broadcast records with.
#[derive(Clone)]
pub struct CoordinatorIdentity {
    pub id: CoordinatorId,
    pub signer: Arc<dyn MessageSigner>,
}

#[derive(Clone)]
pub struct SessionContext {
    pub ledger: Arc<dyn LedgerOracle>,
    pub directory: Arc<dyn MasternodeDirectory>,
    pub verifier: Arc<dyn MessageVerifier>,
    pub identity: Option<CoordinatorIdentity>,
}

/// The coordinator a client joined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedTo {
    pub coordinator: CoordinatorId,
    pub peer: PeerId,
}

pub struct MixingSession {
    pub(super) config: PoolConfig,
    pub(super) catalog: DenominationCatalog,
    pub(super) penalizer: MisbehaviorPenalizer,
    pub(super) ctx: SessionContext,
    pub(super) rng: Box<dyn RngCore + Send>,
    pub(super) state: PoolState,
    pub(super) session_id: SessionId,
    pub(super) session_denomination: DenominationMask,
    pub(super) session_users: usize,
    pub(super) session_collaterals: Vec<Transaction>,
    pub(super) entries: Vec<Entry>,
    pub(super) final_transaction: Option<Transaction>,
    pub(super) locked_inputs: BTreeSet<OutPoint>,
    pub(super) last_state_change: u64,
    pub(super) state_change_height: u64,
    pub(super) block_height_cache: u64,
    pub(super) last_new_block: u64,
    pub(super) last_message: PoolMessage,
    pub(super) outbox: Vec<Outbound>,
    pub(super) submitted_to: Option<SubmittedTo>,
    pub(super) entries_count: usize,
    pub(super) last_entry_accepted: bool,
    pub(super) count_entries_accepted: u32,
    pub(super) last_success_height: u64,
}

impl MixingSession {
    pub fn new(config: PoolConfig, ctx: SessionContext) -> Self {
        Self::with_rng(config, ctx, Box::new(StdRng::from_entropy()))
    }

    pub fn with_rng(config: PoolConfig, ctx: SessionContext, rng: Box<dyn RngCore + Send>) -> Self {
        let block_height_cache = ctx.ledger.current_block_height();
        Self {
            penalizer: MisbehaviorPenalizer::from_config(&config),
            catalog: DenominationCatalog::standard(),
            config,
            ctx,
            rng,
            state: PoolState::Idle,
            session_id: SessionId::NONE,
            session_denomination: 0,
            session_users: 0,
            session_collaterals: Vec::new(),
            entries: Vec::new(),
            final_transaction: None,
            locked_inputs: BTreeSet::new(),
            last_state_change: 0,
            state_change_height: block_height_cache,
            block_height_cache,
            last_new_block: 0,
            last_message: PoolMessage::NoError,
            outbox: Vec::new(),
            submitted_to: None,
            entries_count: 0,
            last_entry_accepted: false,
            count_entries_accepted: 0,
            last_success_height: 0,
        }
    }

    pub fn role(&self) -> PoolRole {
        self.config.role
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn catalog(&self) -> &DenominationCatalog {
        &self.catalog
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn session_denomination(&self) -> DenominationMask {
        self.session_denomination
    }

    pub fn session_users(&self) -> usize {
        self.session_users
    }

    pub fn session_collaterals(&self) -> &[Transaction] {
        &self.session_collaterals
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn final_transaction(&self) -> Option<&Transaction> {
        self.final_transaction.as_ref()
    }

    pub fn locked_inputs(&self) -> &BTreeSet<OutPoint> {
        &self.locked_inputs
    }

    pub fn is_locked(&self, outpoint: &OutPoint) -> bool {
        self.locked_inputs.contains(outpoint)
    }

    pub fn last_message(&self) -> PoolMessage {
        self.last_message
    }

    pub fn last_state_change(&self) -> u64 {
        self.last_state_change
    }

    pub fn block_height(&self) -> u64 {
        self.block_height_cache
    }

    pub fn submitted_to(&self) -> Option<&SubmittedTo> {
        self.submitted_to.as_ref()
    }

    pub fn entries_count(&self) -> usize {
        match self.config.role {
            PoolRole::Coordinator => self.entries.len(),
            PoolRole::Client => self.entries_count,
        }
    }

    pub fn last_success_height(&self) -> u64 {
        self.last_success_height
    }

    pub fn coordinator_id(&self) -> Option<CoordinatorId> {
        self.ctx.identity.as_ref().map(|identity| identity.id)
    }

    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Generic state change. A guarded coordinator cannot enter `error`/`success` this way.
    pub fn update_state(&mut self, target: PoolState, now: u64) -> Result<()> {
        if self.config.role == PoolRole::Coordinator && self.config.coordinator_terminal_guard && target.is_terminal() {
            warn!("coordinator refused direct terminal transition from={} to={}", self.state, target);
            return Err(MixError::InvalidStateTransition { from: self.state.to_string(), to: target.to_string() });
        }
        self.transition(target, now)
    }

    pub(super) fn transition(&mut self, target: PoolState, now: u64) -> Result<()> {
        if self.state == target {
            return Ok(());
        }
        if !self.state.can_transition_to(target) {
            return Err(MixError::InvalidStateTransition { from: self.state.to_string(), to: target.to_string() });
        }
        info!("pool state changed from={} to={} session_id={} role={}", self.state, target, self.session_id, self.config.role);
        self.state = target;
        self.last_state_change = now;
        self.state_change_height = self.ctx.ledger.current_block_height().max(self.block_height_cache);
        if self.config.role == PoolRole::Coordinator {
            self.relay_status(StatusAccepted::Reset);
        }
        Ok(())
    }

    pub(super) fn transition_or_log(&mut self, target: PoolState, now: u64) {
        if let Err(err) = self.transition(target, now) {
            warn!("pool transition skipped error={}", err);
        }
    }

    /// Drop the round and return to `idle`. The outcome message is kept for status display.
    pub fn reset(&mut self, now: u64) {
        debug!("pool reset from={} session_id={}", self.state, self.session_id);
        self.state = PoolState::Idle;
        self.session_id = SessionId::NONE;
        self.session_denomination = 0;
        self.session_users = 0;
        self.session_collaterals.clear();
        self.entries.clear();
        self.final_transaction = None;
        self.locked_inputs.clear();
        self.last_state_change = now;
        self.submitted_to = None;
        self.entries_count = 0;
        self.last_entry_accepted = false;
    }

    pub(super) fn reset_round(&mut self, now: u64) {
        self.reset(now);
        if self.config.role == PoolRole::Coordinator {
            self.relay_status(StatusAccepted::Reset);
        }
    }

    fn status(&self, accepted: StatusAccepted, message: PoolMessage) -> ProtocolMessage {
        ProtocolMessage::StatusUpdate(StatusUpdate {
            session_id: self.session_id,
            state: self.state,
            entries: self.entries_count(),
            accepted,
            message,
        })
    }

    pub(super) fn relay_status(&mut self, accepted: StatusAccepted) {
        let message = self.status(accepted, PoolMessage::NoError);
        self.outbox.push(Outbound::Broadcast(message));
    }

    fn reply_status(&mut self, peer: &PeerId, result: std::result::Result<PoolMessage, PoolMessage>) {
        let message = match result {
            Ok(message) => self.status(StatusAccepted::Accepted, message),
            Err(message) => self.status(StatusAccepted::Rejected, message),
        };
        self.outbox.push(Outbound::Send { peer: peer.clone(), message });
    }

    fn require_coordinator(&self) -> std::result::Result<&CoordinatorIdentity, PoolMessage> {
        if self.config.role != PoolRole::Coordinator {
            return Err(PoolMessage::NotAMn);
        }
        self.ctx.identity.as_ref().ok_or(PoolMessage::NotAMn)
    }

    /// Join request from `peer`. The reply status is queued either way.
    ///
    /// `rate_limited` tells whether this coordinator advertised too recently to open a new session.
    pub fn handle_join_request(
        &mut self,
        peer: &PeerId,
        protocol_version: u32,
        request: &JoinRequest,
        rate_limited: bool,
        now: u64,
    ) -> std::result::Result<(), PoolMessage> {
        let result = self.admit_join(protocol_version, request, rate_limited, now);
        match result {
            Ok(()) => {
                debug!("join accepted peer={} session_id={} users={}", peer, self.session_id, self.session_users);
                self.reply_status(peer, Ok(PoolMessage::NoError));
                self.check_for_complete_queue(now);
            }
            Err(message) => {
                debug!("join rejected peer={} reason={}", peer, message);
                self.reply_status(peer, Err(message));
            }
        }
        result
    }

    fn admit_join(
        &mut self,
        protocol_version: u32,
        request: &JoinRequest,
        rate_limited: bool,
        now: u64,
    ) -> std::result::Result<(), PoolMessage> {
        let identity = self.require_coordinator()?;
        if protocol_version < self.config.min_peer_protocol_version {
            return Err(PoolMessage::Version);
        }
        if self.ctx.directory.resolve(&identity.id).is_none() {
            return Err(PoolMessage::MnList);
        }
        if self.session_users == 0 && rate_limited {
            return Err(PoolMessage::Recent);
        }
        self.is_compatible_with_session(request.denomination, &request.collateral, now)
    }

    /// Admit one more participant, opening a new session for the first one.
    pub fn is_compatible_with_session(
        &mut self,
        denomination: DenominationMask,
        collateral: &Transaction,
        now: u64,
    ) -> std::result::Result<(), PoolMessage> {
        if !is_collateral_valid(self.ctx.ledger.as_ref(), collateral, self.config.collateral_amount) {
            return Err(PoolMessage::InvalidCollateral);
        }
        if denomination == 0 || self.catalog.decode(denomination).is_empty() {
            return Err(PoolMessage::Denom);
        }
        if self.session_collaterals.iter().any(|known| spends_same_coin(known, collateral)) {
            warn!("collateral reused in join session_id={} inputs={}", self.session_id, collateral.inputs.len());
            self.burn_collateral(collateral.clone());
            return Err(PoolMessage::InvalidCollateral);
        }

        if self.session_users == 0 {
            if self.state != PoolState::Idle {
                return Err(PoolMessage::Mode);
            }
            let advertisement = self.signed_advertisement(denomination, false, now)?;
            self.session_id = SessionId::new(1 + self.rng.next_u32() % MAX_SESSION_ID);
            self.session_denomination = denomination;
            self.session_users = 1;
            self.session_collaterals.push(collateral.clone());
            self.transition(PoolState::Queue, now).map_err(|_| PoolMessage::Mode)?;
            self.outbox.push(Outbound::Broadcast(ProtocolMessage::Queue(advertisement)));
            info!(
                "session opened session_id={} denomination={}",
                self.session_id,
                self.catalog.decode(denomination)
            );
            return Ok(());
        }

        if !matches!(self.state, PoolState::Queue | PoolState::AcceptingEntries) {
            return Err(PoolMessage::Mode);
        }
        if self.session_users >= self.config.max_pool_transactions {
            return Err(PoolMessage::QueueFull);
        }
        if denomination != self.session_denomination {
            return Err(PoolMessage::Denom);
        }
        self.session_users += 1;
        self.last_state_change = now;
        self.session_collaterals.push(collateral.clone());
        Ok(())
    }

    fn signed_advertisement(
        &self,
        denomination: DenominationMask,
        ready: bool,
        now: u64,
    ) -> std::result::Result<QueueAdvertisement, PoolMessage> {
        let identity = self.require_coordinator()?;
        let mut advertisement = QueueAdvertisement::new(identity.id, denomination, ready, now);
        if let Err(err) = advertisement.sign(Some(identity.signer.as_ref()), self.ctx.verifier.as_ref()) {
            warn!("advertisement signing failed error={}", err);
            return Err(PoolMessage::NotAMn);
        }
        Ok(advertisement)
    }

    /// Outputs must carry exactly the session's denomination set.
    pub fn is_compatible_with_entries(&self, outputs: &[TxOut]) -> bool {
        let mask = self.catalog.encode(outputs);
        mask != 0 && mask == self.session_denomination
    }

    /// Entry submission from `peer`; queues the reply status and advances the round on success.
    pub fn handle_entry_submission(
        &mut self,
        peer: &PeerId,
        submission: EntrySubmission,
        now: u64,
    ) -> std::result::Result<(), PoolMessage> {
        let EntrySubmission { inputs, amount, collateral, outputs } = submission;
        let result = self.add_entry(inputs, amount, collateral, outputs, now);
        match result {
            Ok(()) => {
                self.reply_status(peer, Ok(PoolMessage::EntriesAdded));
                self.check(now);
            }
            Err(message) => {
                debug!("entry rejected peer={} reason={}", peer, message);
                self.reply_status(peer, Err(message));
            }
        }
        result
    }

    /// Run the admission pipeline and, on success, lock the inputs and append the entry.
    ///
    /// A rejection leaves the state, the entries and the locked inputs untouched.
    pub fn add_entry(
        &mut self,
        inputs: Vec<TxIn>,
        amount: Amount,
        collateral: Transaction,
        outputs: Vec<TxOut>,
        now: u64,
    ) -> std::result::Result<(), PoolMessage> {
        if self.config.role != PoolRole::Coordinator {
            return Err(PoolMessage::NotAMn);
        }
        if self.state != PoolState::AcceptingEntries {
            return Err(PoolMessage::Session);
        }
        if inputs.is_empty() || outputs.is_empty() {
            return Err(PoolMessage::InvalidInput);
        }
        if !is_collateral_valid(self.ctx.ledger.as_ref(), &collateral, self.config.collateral_amount) {
            return Err(PoolMessage::InvalidCollateral);
        }
        if !self.session_collaterals.contains(&collateral) {
            return Err(PoolMessage::InvalidCollateral);
        }
        if self.entries.iter().any(|entry| spends_same_coin(entry.collateral(), &collateral)) {
            warn!("second entry for one collateral session_id={}", self.session_id);
            self.burn_collateral(collateral);
            return Err(PoolMessage::AlreadyHave);
        }
        if self.entries.len() >= self.config.max_pool_transactions {
            return Err(PoolMessage::EntriesFull);
        }
        if !self.is_compatible_with_entries(&outputs) {
            return Err(if self.catalog.encode(&outputs) == 0 { PoolMessage::Denom } else { PoolMessage::ExistingTx });
        }
        for output in &outputs {
            if output.script_pubkey.len() != STANDARD_SCRIPT_LEN {
                return Err(PoolMessage::NonStandardPubkey);
            }
            if !output.script_pubkey.is_normal_payment_script() {
                return Err(PoolMessage::InvalidScript);
            }
        }

        let mut seen = HashSet::with_capacity(inputs.len());
        let mut value_in: Amount = 0;
        for input in &inputs {
            let outpoint = &input.previous_output;
            if outpoint.is_null() {
                return Err(PoolMessage::InvalidInput);
            }
            if !seen.insert(*outpoint) {
                return Err(PoolMessage::AlreadyHave);
            }
            if self.locked_inputs.contains(outpoint) {
                return Err(PoolMessage::InvalidInput);
            }
            let Some(prev) = self.ctx.ledger.spendable_output(outpoint) else {
                return Err(PoolMessage::MissingTx);
            };
            value_in = value_in.saturating_add(prev.value);
            if value_in > self.config.pool_max_amount {
                return Err(PoolMessage::Maximum);
            }
        }

        let value_out = outputs.iter().fold(0u64, |acc, out| acc.saturating_add(out.value));
        if value_out > value_in || value_in - value_out > self.catalog.smallest() {
            return Err(PoolMessage::Fees);
        }
        if !self.ctx.ledger.validate(&Transaction::new(inputs.clone(), outputs.clone())) {
            return Err(PoolMessage::InvalidTx);
        }

        self.locked_inputs.extend(inputs.iter().map(|input| input.previous_output));
        let mut entry = Entry::new();
        entry.add(inputs, amount, collateral, outputs, now);
        self.entries.push(entry);
        // Accepted entries keep the queue window open; stale entries expire on their own.
        self.last_state_change = now;
        self.last_message = PoolMessage::EntriesAdded;
        info!(
            "entry added session_id={} entries={}/{} locked_inputs={}",
            self.session_id,
            self.entries.len(),
            self.config.max_pool_transactions,
            self.locked_inputs.len()
        );
        Ok(())
    }

    /// Once every announced participant has joined, advertise the session as ready.
    pub fn check_for_complete_queue(&mut self, now: u64) -> bool {
        if self.config.role != PoolRole::Coordinator
            || self.state != PoolState::Queue
            || self.session_users < self.config.max_pool_transactions
        {
            return false;
        }
        if let Err(err) = self.transition(PoolState::AcceptingEntries, now) {
            warn!("complete queue transition failed error={}", err);
            return false;
        }
        match self.signed_advertisement(self.session_denomination, true, now) {
            Ok(advertisement) => self.outbox.push(Outbound::Broadcast(ProtocolMessage::Queue(advertisement))),
            Err(message) => warn!("ready advertisement not sent reason={}", message),
        }
        true
    }

    /// Periodic progress check driven by the tick loop and by message handlers.
    pub fn check(&mut self, now: u64) {
        if self.config.role == PoolRole::Coordinator {
            if self.state == PoolState::AcceptingEntries && self.entries.len() >= self.config.max_pool_transactions {
                self.finalize_round(now);
            }
            if self.state == PoolState::Signing && self.signatures_complete() {
                self.check_final_transaction(now);
            }
        }
        if self.state.is_terminal() && elapsed_at_least(now, self.last_state_change, self.config.reset_delay_secs) {
            debug!("finished round reset state={} message={}", self.state, self.last_message);
            self.reset_round(now);
        }
    }

    fn assemble(&self) -> Transaction {
        let mut tx = Transaction::default();
        for entry in &self.entries {
            tx.inputs.extend(entry.tx_inputs());
            tx.outputs.extend(entry.tx_outputs());
        }
        tx
    }

    fn finalize_round(&mut self, now: u64) {
        self.transition_or_log(PoolState::FinalizeTransaction, now);
        let mut tx = self.assemble();
        for input in &mut tx.inputs {
            input.script_sig.clear();
        }
        self.final_transaction = Some(tx.clone());
        self.transition_or_log(PoolState::Signing, now);
        info!("final transaction proposed session_id={} inputs={} outputs={}", self.session_id, tx.inputs.len(), tx.outputs.len());
        self.outbox.push(Outbound::Broadcast(ProtocolMessage::FinalTransaction(FinalTransactionProposal {
            session_id: self.session_id,
            transaction: tx,
        })));
    }

    /// Every input of every entry carries unlocking data.
    pub fn signatures_complete(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(Entry::signatures_complete)
    }

    /// Check `script_sig` against the final-transaction input spending the same coin as `input`.
    pub fn signature_valid(&self, script_sig: &[u8], input: &TxIn) -> bool {
        let Some(tx) = self.final_transaction.as_ref() else {
            return false;
        };
        let Some(idx) = tx.find_input(input) else {
            return false;
        };
        let mut candidate = tx.clone();
        candidate.inputs[idx].script_sig = script_sig.to_vec();
        self.ctx.ledger.verify_input(&candidate, idx)
    }

    /// Attach one participant signature to its entry and to the final transaction.
    pub fn add_script_sig(&mut self, input: &TxIn) -> bool {
        if self.state != PoolState::Signing {
            debug!("signature ignored state={}", self.state);
            return false;
        }
        if self.entries.iter().any(|entry| entry.has_script_sig(&input.script_sig)) {
            debug!("duplicate signature data outpoint={}", input.previous_output);
            return false;
        }
        if !self.signature_valid(&input.script_sig, input) {
            debug!("invalid signature outpoint={}", input.previous_output);
            return false;
        }
        let attached = self.entries.iter_mut().any(|entry| entry.add_signature(input));
        if attached {
            if let Some(tx) = self.final_transaction.as_mut() {
                if let Some(idx) = tx.find_input(input) {
                    tx.inputs[idx].script_sig = input.script_sig.clone();
                }
            }
        }
        attached
    }

    pub fn handle_signatures(&mut self, peer: &PeerId, inputs: &[TxIn], now: u64) -> bool {
        if self.config.role != PoolRole::Coordinator {
            return false;
        }
        let accepted = inputs.iter().filter(|input| self.add_script_sig(input)).count();
        debug!("signatures received peer={} accepted={}/{}", peer, accepted, inputs.len());
        if accepted != inputs.len() {
            return false;
        }
        self.check(now);
        true
    }

    /// Assemble the signed transaction in acceptance order and hand it off.
    ///
    /// Runs only when every input is signed. A transaction the ledger refuses discards the round.
    pub fn check_final_transaction(&mut self, now: u64) -> bool {
        if self.config.role != PoolRole::Coordinator || self.state != PoolState::Signing || !self.signatures_complete() {
            return false;
        }
        let tx = self.assemble();
        let ledger = Arc::clone(&self.ctx.ledger);
        let inputs_valid = (0..tx.inputs.len()).all(|idx| ledger.verify_input(&tx, idx));
        if !inputs_valid || !ledger.validate(&tx) {
            warn!("final transaction invalid session_id={} inputs_valid={}", self.session_id, inputs_valid);
            self.fail_round(PoolMessage::InvalidTx, now);
            return false;
        }

        self.transition_or_log(PoolState::Transmission, now);
        if !ledger.accept_to_mempool(&tx) {
            warn!("final transaction refused by mempool session_id={}", self.session_id);
            self.fail_round(PoolMessage::InvalidTx, now);
            return false;
        }
        let handoff = self.handoff_message(&tx, now);
        self.outbox.push(Outbound::Broadcast(handoff));
        self.final_transaction = Some(tx);

        self.last_message = PoolMessage::Success;
        self.transition_or_log(PoolState::Success, now);
        self.outbox.push(Outbound::Broadcast(ProtocolMessage::Completed(CompletedNotice {
            session_id: self.session_id,
            error: false,
            message: PoolMessage::Success,
        })));
        self.charge_random_fees();
        self.locked_inputs.clear();
        info!("mixing transaction completed session_id={} entries={}", self.session_id, self.entries.len());
        true
    }

    fn handoff_message(&self, tx: &Transaction, now: u64) -> ProtocolMessage {
        if let Some(identity) = self.ctx.identity.as_ref() {
            let mut record = BroadcastRecord::new(tx.clone(), identity.id, now);
            match record.sign(identity.signer.as_ref(), self.ctx.verifier.as_ref()) {
                Ok(()) => return ProtocolMessage::BroadcastTx(record),
                Err(err) => warn!("broadcast record signing failed error={}", err),
            }
        }
        ProtocolMessage::Transaction(tx.clone())
    }

    /// Abort the round into `error`, releasing every locked input.
    pub(super) fn fail_round(&mut self, message: PoolMessage, now: u64) {
        self.last_message = message;
        self.transition_or_log(PoolState::Error, now);
        self.locked_inputs.clear();
        if self.config.role == PoolRole::Coordinator {
            self.outbox.push(Outbound::Broadcast(ProtocolMessage::Completed(CompletedNotice {
                session_id: self.session_id,
                error: true,
                message,
            })));
        }
    }

    /// Expire stale entries and enforce the queue and signing windows.
    ///
    /// Returns true when the round was forced into `error`.
    pub fn check_timeout(&mut self, now: u64) -> bool {
        let lag = self.config.lag_secs();
        let queue_window = self.config.queue_timeout_secs.saturating_add(lag);

        if self.config.role == PoolRole::Coordinator && matches!(self.state, PoolState::Queue | PoolState::AcceptingEntries) {
            self.drop_expired_entries(now);
        }

        if self.state.is_before_signing() || self.state == PoolState::Transmission {
            if elapsed_exceeds(now, self.last_state_change, queue_window) {
                info!("session timed out state={} session_id={}", self.state, self.session_id);
                self.timeout_round(PoolMessage::SessionTimeout, now);
                return true;
            }
        } else if self.state == PoolState::Signing {
            let signing_window = self.config.signing_timeout_secs.saturating_add(lag);
            if elapsed_exceeds(now, self.last_state_change, signing_window) {
                info!("signing timed out session_id={} unsigned_entries={}", self.session_id, self.unsigned_entries());
                self.timeout_round(PoolMessage::SigningTimeout, now);
                return true;
            }
        }
        false
    }

    fn unsigned_entries(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.signatures_complete()).count()
    }

    fn drop_expired_entries(&mut self, now: u64) {
        let window = self.config.queue_timeout_secs;
        let (expired, kept): (Vec<Entry>, Vec<Entry>) =
            std::mem::take(&mut self.entries).into_iter().partition(|entry| entry.expired_after(now, window));
        self.entries = kept;
        if expired.is_empty() {
            return;
        }
        for entry in &expired {
            for input in entry.inputs() {
                self.locked_inputs.remove(input.outpoint());
            }
        }
        info!("expired entries removed count={} remaining={}", expired.len(), self.entries.len());
        self.relay_status(StatusAccepted::Reset);
    }

    fn timeout_round(&mut self, message: PoolMessage, now: u64) {
        if self.config.role == PoolRole::Coordinator {
            self.charge_fees();
        }
        self.fail_round(message, now);
    }

    fn charge_fees(&mut self) {
        let charged = self.penalizer.charge_fees(self.state, &self.session_collaterals, &self.entries, self.rng.as_mut());
        if let Some(collateral) = charged {
            self.burn_collateral(collateral);
        }
    }

    fn charge_random_fees(&mut self) {
        let burned = self.penalizer.charge_random_fees(&self.session_collaterals, self.rng.as_mut());
        for collateral in burned {
            self.burn_collateral(collateral);
        }
    }

    fn burn_collateral(&mut self, collateral: Transaction) {
        if !self.ctx.ledger.accept_to_mempool(&collateral) {
            warn!("collateral refused by mempool inputs={}", collateral.inputs.len());
            return;
        }
        info!("collateral charged inputs={} outputs={}", collateral.inputs.len(), collateral.outputs.len());
        self.outbox.push(Outbound::Broadcast(ProtocolMessage::Transaction(collateral)));
    }

    /// New chain tip. Debounced; resets a round that made no progress across
    /// more than `min_block_spacing` blocks, then enforces timeouts.
    pub fn new_block(&mut self, height: u64, now: u64) -> bool {
        self.block_height_cache = height;
        if self.last_new_block != 0 && !elapsed_at_least(now, self.last_new_block, self.config.new_block_debounce_secs) {
            return false;
        }
        self.last_new_block = now;
        if self.state.is_active() && height.saturating_sub(self.state_change_height) > self.config.min_block_spacing {
            warn!(
                "stalled round reset state={} session_id={} since_height={} height={}",
                self.state, self.session_id, self.state_change_height, height
            );
            self.reset_round(now);
            return true;
        }
        self.check_timeout(now);
        true
    }

    /// Human readable progress text.
    pub fn get_status(&self) -> String {
        match self.state {
            PoolState::Unknown => "Mixing state unknown.".to_string(),
            PoolState::Idle => "Mixing is idle.".to_string(),
            PoolState::Queue => "Waiting in queue for more participants.".to_string(),
            PoolState::AcceptingEntries => {
                if self.last_entry_accepted || self.config.role == PoolRole::Coordinator {
                    format!(
                        "Entries accepted, waiting for more ({}/{}).",
                        self.entries_count(),
                        self.config.max_pool_transactions
                    )
                } else {
                    "Submitting entries.".to_string()
                }
            }
            PoolState::FinalizeTransaction => "Finalizing transaction.".to_string(),
            PoolState::Signing => "Found enough participants, signing.".to_string(),
            PoolState::Transmission => "Transmitting final transaction.".to_string(),
            PoolState::Error => format!("Mixing request incomplete: {} Will retry.", self.last_message.description()),
            PoolState::Success => format!("Mixing request complete: {}", self.last_message.description()),
        }
    }
}

/// Whether two collaterals spend any coin in common.
fn spends_same_coin(a: &Transaction, b: &Transaction) -> bool {
    a.inputs.iter().any(|left| b.inputs.iter().any(|right| left.previous_output == right.previous_output))
}
