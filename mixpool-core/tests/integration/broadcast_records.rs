use crate::fixtures::{envelope, PoolWorld, TEST_NOW};
use mixpool_core::application::PoolService;
use mixpool_core::domain::{BroadcastRecord, InputSigner, ProtocolMessage, Script, Transaction, TxIn, TxOut};
use mixpool_core::foundation::{PeerId, COIN};
use mixpool_core::infrastructure::crypto::{KeyInputSigner, Secp256k1MessageSigner};
use mixpool_core::infrastructure::transport::{MockHub, MockTransport, Transport, TransportSubscription};
use std::sync::Arc;
use std::time::Duration;

fn client_service(world: &PoolWorld, hub: &Arc<MockHub>) -> PoolService {
    let transport = Arc::new(MockTransport::new(hub.clone(), PeerId::from("client-a")));
    PoolService::with_session(world.client_session(), world.client_ctx(), transport)
}

/// A spend the ledger will accept.
fn signed_spend(world: &PoolWorld) -> Transaction {
    let owner = KeyInputSigner::generate();
    let coin = world.ledger.fund(Script::p2pkh(&owner.pubkey_hash()), COIN).expect("fund");
    let mut tx = Transaction::new(vec![TxIn::new(coin)], vec![TxOut::new(COIN - 1_000, Script::p2pkh(&[5; 20]))]);
    tx.inputs[0].script_sig = owner.sign_input(&tx, 0).expect("sign");
    tx
}

async fn next_payload(subscription: &mut TransportSubscription) -> ProtocolMessage {
    let item = tokio::time::timeout(Duration::from_secs(5), subscription.next()).await.expect("message in time");
    item.expect("stream open").expect("envelope").payload
}

#[tokio::test]
async fn test_broadcast_record_when_valid_then_cached_accepted_and_relayed_once() {
    let world = PoolWorld::new();
    let hub = Arc::new(MockHub::new());
    let service = client_service(&world, &hub);
    let mut watch = MockTransport::new(hub.clone(), PeerId::from("observer")).subscribe().await.expect("subscribe");

    let tx = signed_spend(&world);
    let txid = tx.txid().expect("txid");
    let mut record = BroadcastRecord::new(tx, world.identity.id, TEST_NOW);
    record.sign(world.identity.signer.as_ref(), world.verifier.as_ref()).expect("sign record");

    let incoming = envelope(&world.coordinator_peer, ProtocolMessage::BroadcastTx(record.clone()));
    service.handle_envelope(incoming.clone(), TEST_NOW).await.expect("record");
    service.handle_envelope(incoming, TEST_NOW).await.expect("duplicate record");

    assert!(service.with_broadcast_cache(|cache| cache.contains(&txid)).expect("cache"));
    assert!(world.ledger.in_mempool(&txid).expect("mempool"));

    let marker = MockTransport::new(hub.clone(), PeerId::from("marker"));
    marker.broadcast(ProtocolMessage::Signatures(Vec::new())).await.expect("marker");
    assert_eq!(next_payload(&mut watch).await, ProtocolMessage::BroadcastTx(record));
    assert_eq!(next_payload(&mut watch).await, ProtocolMessage::Signatures(Vec::new()));
}

#[tokio::test]
async fn test_broadcast_record_when_signed_by_unregistered_key_then_dropped() {
    let world = PoolWorld::new();
    let hub = Arc::new(MockHub::new());
    let service = client_service(&world, &hub);

    let tx = signed_spend(&world);
    let txid = tx.txid().expect("txid");
    let mut forged = BroadcastRecord::new(tx, world.identity.id, TEST_NOW);
    forged.sign(&Secp256k1MessageSigner::generate(), world.verifier.as_ref()).expect("sign with stray key");

    service.handle_envelope(envelope(&PeerId::from("mallory"), ProtocolMessage::BroadcastTx(forged)), TEST_NOW).await.expect("forged");
    assert!(service.with_broadcast_cache(|cache| cache.is_empty()).expect("cache"));
    assert!(!world.ledger.in_mempool(&txid).expect("mempool"));
}

#[tokio::test]
async fn test_transaction_when_mempool_refuses_then_not_relayed() {
    let world = PoolWorld::new();
    let hub = Arc::new(MockHub::new());
    let service = client_service(&world, &hub);
    let mut watch = MockTransport::new(hub.clone(), PeerId::from("observer")).subscribe().await.expect("subscribe");

    let mut unsigned = signed_spend(&world);
    unsigned.inputs[0].script_sig.clear();
    service.handle_envelope(envelope(&PeerId::from("peer"), ProtocolMessage::Transaction(unsigned)), TEST_NOW).await.expect("tx");

    let valid = signed_spend(&world);
    service.handle_envelope(envelope(&PeerId::from("peer"), ProtocolMessage::Transaction(valid.clone())), TEST_NOW).await.expect("tx");
    assert_eq!(next_payload(&mut watch).await, ProtocolMessage::Transaction(valid));
}
