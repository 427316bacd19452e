use crate::fixtures::{wait_until, PoolWorld, TestNode, TEST_SESSION_ID};
use mixpool_core::domain::{InputSigner, PoolState};
use mixpool_core::foundation::{now_nanos, SessionId};
use mixpool_core::infrastructure::transport::MockHub;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_round_when_three_clients_join_over_hub_then_mixed_transaction_in_mempool() {
    let world = PoolWorld::new();
    let hub = Arc::new(MockHub::new());
    let coordinator =
        TestNode::spawn(&hub, world.coordinator_peer.clone(), world.coordinator_session(), world.coordinator_ctx(), None).await;

    let participants = world.participants();
    let mut clients = Vec::new();
    for participant in &participants {
        let signer: Arc<dyn InputSigner> = participant.signer.clone();
        clients.push(TestNode::spawn(&hub, participant.peer.clone(), world.client_session(), world.client_ctx(), Some(signer)).await);
    }

    clients[0].service.join(world.identity.id, participants[0].plan.clone(), now_nanos()).await.expect("first join");

    // The others find the session through the coordinator's advertisement.
    for (client, participant) in clients.iter().zip(&participants).skip(1) {
        let advertised = wait_until(Duration::from_secs(5), || {
            client.service.with_queue_book(|book| !book.advertisements().is_empty()).expect("queue book")
        })
        .await;
        assert!(advertised, "advertisement reached {}", participant.peer);
        let joined = client.service.join_advertised(participant.plan.clone(), now_nanos()).await.expect("join advertised");
        assert_eq!(joined, world.identity.id);
    }

    let finished = wait_until(Duration::from_secs(10), || {
        coordinator.state() == PoolState::Success && clients.iter().all(|client| client.state() == PoolState::Success)
    })
    .await;
    assert!(finished, "round did not finish: coordinator={} clients={:?}", coordinator.state(), clients.iter().map(TestNode::state).collect::<Vec<_>>());

    let tx = coordinator
        .service
        .with_session_ref(|session| session.final_transaction().cloned())
        .expect("session")
        .expect("final transaction");
    assert_eq!(tx.inputs.len(), 3);
    assert!(world.ledger.in_mempool(&tx.txid().expect("txid")).expect("mempool"));

    for client in &clients {
        let (session_id, locked) =
            client.service.with_session_ref(|session| (session.session_id(), session.locked_inputs().len())).expect("session");
        assert_eq!(session_id, SessionId::new(TEST_SESSION_ID));
        assert_eq!(locked, 0);
    }
    let cached = wait_until(Duration::from_secs(5), || {
        clients.iter().all(|client| client.service.with_broadcast_cache(|cache| cache.len() == 1).expect("cache"))
    })
    .await;
    assert!(cached);
}
