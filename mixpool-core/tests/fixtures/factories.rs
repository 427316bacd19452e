#![allow(dead_code)]

use crate::fixtures::{
    TEST_CLIENT_PEER_IDS, TEST_COLLATERAL_INPUT, TEST_COORDINATOR_PEER_ID, TEST_DENOMINATION, TEST_ENTRY_FEE, TEST_RNG_VALUE,
};
use mixpool_core::domain::{
    CoordinatorId, CoordinatorIdentity, DenominationCatalog, EntryPlan, EntrySubmission, InputSigner, JoinRequest, MessageSigner,
    MixingSession, PoolConfig, PoolRole, ProtocolMessage, Script, SessionContext, Transaction, TxIn, TxOut,
};
use mixpool_core::foundation::{Amount, PeerId, COIN, POOL_COLLATERAL, PROTOCOL_VERSION};
use mixpool_core::infrastructure::crypto::{pubkey_hash, KeyInputSigner, Secp256k1MessageSigner, Secp256k1MessageVerifier};
use mixpool_core::infrastructure::identity::{masternode_info, StaticDirectory};
use mixpool_core::infrastructure::ledger::MemoryLedger;
use mixpool_core::infrastructure::transport::MessageEnvelope;
use rand::rngs::mock::StepRng;
use std::sync::Arc;

/// Pool settings with fee burning disabled so ledger contents stay predictable.
pub fn test_pool_config(role: PoolRole) -> PoolConfig {
    PoolConfig { role, charge_fees_percent: 0, random_fee_percent: 0, ..PoolConfig::default() }
}

pub fn seeded_rng() -> Box<StepRng> {
    Box::new(StepRng::new(TEST_RNG_VALUE, 0))
}

pub fn envelope(sender: &PeerId, payload: ProtocolMessage) -> MessageEnvelope {
    MessageEnvelope { sender_peer_id: sender.clone(), protocol_version: PROTOCOL_VERSION, seq_no: 0, timestamp_nanos: 0, payload }
}

/// One wallet taking part in a round.
pub struct Participant {
    pub peer: PeerId,
    pub signer: Arc<KeyInputSigner>,
    pub plan: EntryPlan,
}

impl Participant {
    pub fn denomination(&self) -> u32 {
        DenominationCatalog::standard().encode(&self.plan.outputs)
    }

    pub fn join_request(&self) -> JoinRequest {
        JoinRequest { denomination: self.denomination(), collateral: self.plan.collateral.clone() }
    }

    pub fn submission(&self) -> EntrySubmission {
        EntrySubmission {
            inputs: self.plan.inputs.clone(),
            amount: self.plan.amount,
            collateral: self.plan.collateral.clone(),
            outputs: self.plan.outputs.clone(),
        }
    }

    /// Unlocking data for this participant's inputs in `tx`.
    pub fn sign(&self, tx: &Transaction) -> Vec<TxIn> {
        self.plan
            .inputs
            .iter()
            .map(|own| {
                let idx = tx.find_input(own).expect("own input in final transaction");
                let mut signed = tx.inputs[idx].clone();
                signed.script_sig = self.signer.sign_input(tx, idx).expect("sign input");
                signed
            })
            .collect()
    }
}

/// Shared ledger, directory and one registered coordinator.
pub struct PoolWorld {
    pub ledger: Arc<MemoryLedger>,
    pub directory: Arc<StaticDirectory>,
    pub verifier: Arc<Secp256k1MessageVerifier>,
    pub identity: CoordinatorIdentity,
    pub coordinator_peer: PeerId,
}

impl PoolWorld {
    pub fn new() -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let directory = Arc::new(StaticDirectory::new());
        let signer = Secp256k1MessageSigner::generate();
        let collateral = ledger.fund(Script::p2pkh(&pubkey_hash(&signer.public_key())), 1_000 * COIN).expect("fund coordinator");
        let identity = CoordinatorIdentity { id: CoordinatorId::new(collateral), signer: Arc::new(signer) };
        let coordinator_peer = PeerId::from(TEST_COORDINATOR_PEER_ID);
        directory.insert(identity.id, masternode_info(&identity, coordinator_peer.clone(), PROTOCOL_VERSION)).expect("register");
        Self { ledger, directory, verifier: Arc::new(Secp256k1MessageVerifier::new()), identity, coordinator_peer }
    }

    /// Another coordinator in the directory, with its own key and collateral.
    pub fn register_coordinator(&self, peer: &str) -> CoordinatorIdentity {
        let signer = Secp256k1MessageSigner::generate();
        let collateral = self.ledger.fund(Script::p2pkh(&pubkey_hash(&signer.public_key())), 1_000 * COIN).expect("fund coordinator");
        let identity = CoordinatorIdentity { id: CoordinatorId::new(collateral), signer: Arc::new(signer) };
        self.directory.insert(identity.id, masternode_info(&identity, PeerId::from(peer), PROTOCOL_VERSION)).expect("register");
        identity
    }

    pub fn coordinator_ctx(&self) -> SessionContext {
        SessionContext {
            ledger: self.ledger.clone(),
            directory: self.directory.clone(),
            verifier: self.verifier.clone(),
            identity: Some(self.identity.clone()),
        }
    }

    pub fn client_ctx(&self) -> SessionContext {
        SessionContext { identity: None, ..self.coordinator_ctx() }
    }

    pub fn coordinator_session(&self) -> MixingSession {
        self.coordinator_session_with(test_pool_config(PoolRole::Coordinator))
    }

    pub fn coordinator_session_with(&self, config: PoolConfig) -> MixingSession {
        MixingSession::with_rng(config, self.coordinator_ctx(), seeded_rng())
    }

    pub fn client_session(&self) -> MixingSession {
        MixingSession::with_rng(test_pool_config(PoolRole::Client), self.client_ctx(), seeded_rng())
    }

    /// A funded participant mixing one `1` tier output.
    pub fn participant(&self, name: &str) -> Participant {
        self.participant_with_collateral_fee(name, POOL_COLLATERAL)
    }

    pub fn participant_with_collateral_fee(&self, name: &str, collateral_fee: Amount) -> Participant {
        let signer = Arc::new(KeyInputSigner::generate());
        let own_script = Script::p2pkh(&signer.pubkey_hash());

        let coin = self.ledger.fund(own_script.clone(), TEST_DENOMINATION + TEST_ENTRY_FEE).expect("fund input");
        let destination = Script::p2pkh(&pubkey_hash(format!("{name}/destination").as_bytes()));

        let collateral_coin = self.ledger.fund(own_script.clone(), TEST_COLLATERAL_INPUT).expect("fund collateral");
        let mut collateral = Transaction::new(
            vec![TxIn::new(collateral_coin)],
            vec![TxOut::new(TEST_COLLATERAL_INPUT - collateral_fee, own_script)],
        );
        collateral.inputs[0].script_sig = signer.sign_input(&collateral, 0).expect("sign collateral");

        let plan = EntryPlan {
            inputs: vec![TxIn::new(coin)],
            outputs: vec![TxOut::new(TEST_DENOMINATION, destination)],
            amount: TEST_DENOMINATION,
            collateral,
        };
        Participant { peer: PeerId::from(name), signer, plan }
    }

    pub fn participants(&self) -> Vec<Participant> {
        TEST_CLIENT_PEER_IDS.iter().map(|name| self.participant(name)).collect()
    }
}

impl Default for PoolWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Admit every participant into `session`.
pub fn fill_queue(session: &mut MixingSession, participants: &[Participant], now: u64) {
    for participant in participants {
        session
            .handle_join_request(&participant.peer, PROTOCOL_VERSION, &participant.join_request(), false, now)
            .expect("join accepted");
    }
}

pub fn submit_entries(session: &mut MixingSession, participants: &[&Participant], now: u64) {
    for participant in participants {
        session.handle_entry_submission(&participant.peer, participant.submission(), now).expect("entry accepted");
    }
}

pub fn sign_all(session: &mut MixingSession, participants: &[Participant], now: u64) {
    let tx = session.final_transaction().cloned().expect("final transaction proposed");
    for participant in participants {
        assert!(session.handle_signatures(&participant.peer, &participant.sign(&tx), now), "signatures accepted");
    }
}
