//! Wires a `MixingSession` to the transport, the queue book and the broadcast cache.

use crate::application::relay::RelayNotifier;
use crate::domain::{
    AutoDenominator, BroadcastCache, BroadcastRecord, CoordinatorId, EntryPlan, InputSigner, MixingSession, Outbound, PoolConfig,
    PoolRole, PoolState, ProtocolMessage, QueueAdvertisement, QueueBook, QueueDecision, SessionContext, Transaction,
};
use crate::foundation::{MixError, PeerId, Result};
use crate::infrastructure::transport::{MessageEnvelope, Transport};
use log::{debug, info, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct PoolService {
    session: Mutex<MixingSession>,
    queue_book: Mutex<QueueBook>,
    broadcast_cache: Mutex<BroadcastCache>,
    auto: Mutex<AutoDenominator>,
    relay: RelayNotifier,
    ctx: SessionContext,
    config: PoolConfig,
    input_signer: Option<Arc<dyn InputSigner>>,
}

impl PoolService {
    pub fn new(config: PoolConfig, ctx: SessionContext, transport: Arc<dyn Transport>) -> Self {
        Self::with_session(MixingSession::new(config, ctx.clone()), ctx, transport)
    }

    /// Wrap an already-built session, e.g. one with a seeded RNG.
    pub fn with_session(session: MixingSession, ctx: SessionContext, transport: Arc<dyn Transport>) -> Self {
        let config = session.config().clone();
        Self {
            session: Mutex::new(session),
            queue_book: Mutex::new(QueueBook::new()),
            broadcast_cache: Mutex::new(BroadcastCache::new()),
            auto: Mutex::new(AutoDenominator::new(config.queue_timeout_secs)),
            relay: RelayNotifier::new(transport),
            ctx,
            config,
            input_signer: None,
        }
    }

    pub fn with_input_signer(mut self, signer: Arc<dyn InputSigner>) -> Self {
        self.input_signer = Some(signer);
        self
    }

    pub fn local_peer_id(&self) -> &PeerId {
        self.relay.transport().local_peer_id()
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, MixingSession>> {
        self.session.lock().map_err(|_| MixError::LockPoisoned("mixing session".to_string()))
    }

    fn lock_queue_book(&self) -> Result<MutexGuard<'_, QueueBook>> {
        self.queue_book.lock().map_err(|_| MixError::LockPoisoned("queue book".to_string()))
    }

    fn lock_broadcast_cache(&self) -> Result<MutexGuard<'_, BroadcastCache>> {
        self.broadcast_cache.lock().map_err(|_| MixError::LockPoisoned("broadcast cache".to_string()))
    }

    fn lock_auto(&self) -> Result<MutexGuard<'_, AutoDenominator>> {
        self.auto.lock().map_err(|_| MixError::LockPoisoned("auto denominator".to_string()))
    }

    /// Client: mix `plan` in the background; the tick loop joins a matching advertised session.
    pub fn add_auto_plan(&self, plan: EntryPlan) -> Result<()> {
        self.lock_auto()?.add_plan(plan);
        Ok(())
    }

    pub fn with_auto_denominator<R>(&self, f: impl FnOnce(&AutoDenominator) -> R) -> Result<R> {
        let auto = self.lock_auto()?;
        Ok(f(&auto))
    }

    /// Read-only view of the session.
    pub fn with_session_ref<R>(&self, f: impl FnOnce(&MixingSession) -> R) -> Result<R> {
        let session = self.lock_session()?;
        Ok(f(&session))
    }

    pub fn with_queue_book<R>(&self, f: impl FnOnce(&QueueBook) -> R) -> Result<R> {
        let book = self.lock_queue_book()?;
        Ok(f(&book))
    }

    pub fn with_broadcast_cache<R>(&self, f: impl FnOnce(&BroadcastCache) -> R) -> Result<R> {
        let cache = self.lock_broadcast_cache()?;
        Ok(f(&cache))
    }

    pub fn status(&self) -> Result<String> {
        Ok(self.lock_session()?.get_status())
    }

    /// Run `op` under the session lock and return what it queued for delivery.
    fn run<R>(&self, op: impl FnOnce(&mut MixingSession) -> R) -> Result<(R, Vec<Outbound>)> {
        let mut session = self.lock_session()?;
        let result = op(&mut session);
        let outbound = session.take_outbox();
        Ok((result, outbound))
    }

    /// Record our own advertisements and broadcast records, then deliver.
    async fn flush(&self, outbound: Vec<Outbound>) -> Result<usize> {
        if outbound.is_empty() {
            return Ok(0);
        }
        for item in &outbound {
            match item {
                Outbound::Broadcast(ProtocolMessage::Queue(adv)) if !adv.ready => {
                    self.lock_queue_book()?.note(&adv.coordinator);
                }
                Outbound::Broadcast(ProtocolMessage::BroadcastTx(record)) => {
                    self.lock_broadcast_cache()?.insert(record.clone())?;
                }
                _ => {}
            }
        }
        Ok(self.relay.dispatch(outbound).await)
    }

    fn coordinator_rate_limited(&self) -> Result<bool> {
        let Some(identity) = self.ctx.identity.as_ref() else {
            return Ok(false);
        };
        let enabled = self.ctx.directory.count_enabled(self.config.min_peer_protocol_version);
        Ok(self.lock_queue_book()?.is_rate_limited(&identity.id, enabled))
    }

    /// Dispatch one inbound message.
    pub async fn handle_envelope(&self, envelope: MessageEnvelope, now: u64) -> Result<()> {
        let MessageEnvelope { sender_peer_id: peer, protocol_version, payload, .. } = envelope;
        trace!("inbound message kind={} peer={}", payload.kind(), peer);
        let outbound = match payload {
            ProtocolMessage::JoinRequest(request) => {
                let rate_limited = self.coordinator_rate_limited()?;
                self.run(|session| session.handle_join_request(&peer, protocol_version, &request, rate_limited, now))?.1
            }
            ProtocolMessage::EntrySubmission(submission) => {
                self.run(|session| session.handle_entry_submission(&peer, submission, now))?.1
            }
            ProtocolMessage::Queue(adv) => return self.handle_queue(adv, now).await,
            ProtocolMessage::StatusUpdate(update) => self.run(|session| session.status_update(&peer, &update, now))?.1,
            ProtocolMessage::FinalTransaction(proposal) => {
                let Some(signer) = self.input_signer.clone() else {
                    warn!("final transaction received without an input signer peer={}", peer);
                    return Ok(());
                };
                let (signed, outbound) =
                    self.run(|session| session.sign_final_transaction(&peer, &proposal, signer.as_ref(), now))?;
                if let Err(err) = signed {
                    warn!("signing final transaction failed peer={} error={}", peer, err);
                }
                outbound
            }
            ProtocolMessage::Signatures(inputs) => self.run(|session| session.handle_signatures(&peer, &inputs, now))?.1,
            ProtocolMessage::Completed(notice) => self.run(|session| session.completed_transaction(&peer, &notice, now))?.1,
            ProtocolMessage::BroadcastTx(record) => return self.handle_broadcast_record(record).await,
            ProtocolMessage::Transaction(tx) => return self.handle_transaction(tx).await,
        };
        self.flush(outbound).await?;
        Ok(())
    }

    async fn handle_queue(&self, adv: QueueAdvertisement, now: u64) -> Result<()> {
        if self.ctx.identity.as_ref().is_some_and(|identity| identity.id == adv.coordinator) {
            return Ok(());
        }
        let decision = self.lock_queue_book()?.accept(
            adv.clone(),
            self.ctx.directory.as_ref(),
            self.ctx.verifier.as_ref(),
            self.config.min_peer_protocol_version,
            now,
        );
        match decision {
            QueueDecision::Stored => {
                debug!("advertisement relayed coordinator={} denomination={}", adv.coordinator, adv.denomination);
                self.relay.relay(ProtocolMessage::Queue(adv)).await;
            }
            QueueDecision::Ready => {
                let (submitted, outbound) = self.run(|session| session.on_queue_ready(&adv.coordinator, now))?;
                match submitted {
                    Ok(true) => info!("entry submitted after ready advertisement coordinator={}", adv.coordinator),
                    Ok(false) => {}
                    Err(err) => warn!("entry submission failed coordinator={} error={}", adv.coordinator, err),
                }
                self.flush(outbound).await?;
            }
            other => debug!("advertisement dropped coordinator={} decision={:?}", adv.coordinator, other),
        }
        Ok(())
    }

    async fn handle_broadcast_record(&self, record: BroadcastRecord) -> Result<()> {
        if !record.check_signature(self.ctx.directory.as_ref(), self.ctx.verifier.as_ref()) {
            warn!("broadcast record with bad signature dropped coordinator={}", record.coordinator);
            return Ok(());
        }
        let inserted = self.lock_broadcast_cache()?.insert(record.clone())?;
        if !inserted {
            trace!("broadcast record already known coordinator={}", record.coordinator);
            return Ok(());
        }
        let accepted = self.ctx.ledger.accept_to_mempool(&record.transaction);
        debug!("broadcast record stored coordinator={} accepted_to_mempool={}", record.coordinator, accepted);
        self.relay.relay(ProtocolMessage::BroadcastTx(record)).await;
        Ok(())
    }

    async fn handle_transaction(&self, tx: Transaction) -> Result<()> {
        if self.ctx.ledger.accept_to_mempool(&tx) {
            debug!("relayed transaction accepted txid={}", tx.txid()?);
            self.relay.relay(ProtocolMessage::Transaction(tx)).await;
        }
        Ok(())
    }

    /// Client: join `coordinator` with `plan`.
    pub async fn join(&self, coordinator: CoordinatorId, plan: EntryPlan, now: u64) -> Result<()> {
        let (joined, outbound) = self.run(|session| session.join(coordinator, plan, now))?;
        joined?;
        self.flush(outbound).await?;
        Ok(())
    }

    /// Client: join the first advertised session compatible with the plan's outputs.
    pub async fn join_advertised(&self, plan: EntryPlan, now: u64) -> Result<CoordinatorId> {
        let mask = self.lock_session()?.catalog().encode(&plan.outputs);
        let coordinator = self
            .lock_queue_book()?
            .pick(mask, now)
            .map(|adv| adv.coordinator)
            .ok_or_else(|| MixError::CoordinatorNotFound(format!("no advertised session for denomination mask {mask}")))?;
        self.join(coordinator, plan, now).await?;
        self.lock_queue_book()?.remove(&coordinator);
        Ok(coordinator)
    }

    /// Periodic driver: block height, timeouts, queue completion, round progress and cache expiry.
    pub async fn tick(&self, now: u64) -> Result<()> {
        let height = self.ctx.ledger.current_block_height();
        let (_, outbound) = self.run(|session| {
            if height > session.block_height() {
                session.new_block(height, now);
            }
            session.check_timeout(now);
            session.check_for_complete_queue(now);
            session.check(now);
        })?;
        let expired_ads = self.lock_queue_book()?.prune(now);
        let expired_records = self.lock_broadcast_cache()?.prune(now, self.config.broadcast_record_ttl_secs);
        if expired_ads + expired_records > 0 {
            trace!("caches pruned advertisements={} broadcast_records={}", expired_ads, expired_records);
        }
        self.flush(outbound).await?;
        self.auto_denominate(now).await
    }

    /// Client: join an advertised session for the first pending plan whose denomination has not failed recently.
    async fn auto_denominate(&self, now: u64) -> Result<()> {
        if self.config.role != PoolRole::Client {
            return Ok(());
        }
        let (state, catalog) = self.with_session_ref(|session| (session.state(), session.catalog().clone()))?;
        let next = {
            let mut auto = self.lock_auto()?;
            auto.observe(state, &catalog, now);
            if state != PoolState::Idle || !auto.is_enabled() {
                return Ok(());
            }
            let book = self.lock_queue_book()?;
            auto.next_join(&catalog, &book, now)
        };
        let Some(join) = next else {
            return Ok(());
        };
        match self.join(join.coordinator, join.plan.clone(), now).await {
            Ok(()) => {
                info!("background join coordinator={} denomination={}", join.coordinator, catalog.decode(join.denomination));
                self.lock_queue_book()?.remove(&join.coordinator);
                self.lock_auto()?.mark_joined(join);
            }
            Err(err) => {
                warn!("background join failed coordinator={} error={}", join.coordinator, err);
                self.lock_auto()?.skip_denomination(join.denomination, now);
            }
        }
        Ok(())
    }

    pub async fn new_block(&self, height: u64, now: u64) -> Result<bool> {
        let (handled, outbound) = self.run(|session| session.new_block(height, now))?;
        self.flush(outbound).await?;
        Ok(handled)
    }
}
