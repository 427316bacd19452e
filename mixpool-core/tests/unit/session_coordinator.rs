use crate::fixtures::{
    fill_queue, sign_all, submit_entries, test_pool_config, PoolWorld, TEST_DENOMINATION, TEST_NOW, TEST_SESSION_ID,
};
use mixpool_core::domain::{
    InputSigner, JoinRequest, LedgerOracle, OutPoint, Outbound, PoolConfig, PoolMessage, PoolRole, PoolState, ProtocolMessage, Script,
    StatusAccepted, TxIn, TxOut,
};
use mixpool_core::foundation::{SessionId, TxId, COIN, NANOS_PER_SECOND, PROTOCOL_VERSION};
use mixpool_core::infrastructure::crypto::KeyInputSigner;

fn kinds(outbox: &[Outbound]) -> Vec<&'static str> {
    outbox.iter().map(|item| item.message().kind()).collect()
}

#[test]
fn test_join_when_queue_fills_then_ready_advertisement_and_accepting_entries() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();

    fill_queue(&mut session, &participants[..1], TEST_NOW);
    assert_eq!(session.state(), PoolState::Queue);
    assert_eq!(session.session_id(), SessionId::new(TEST_SESSION_ID));
    let outbox = session.take_outbox();
    let opened = outbox.iter().find_map(|item| match item {
        Outbound::Broadcast(ProtocolMessage::Queue(adv)) => Some(adv.clone()),
        _ => None,
    });
    let opened = opened.expect("session advertised");
    assert!(!opened.ready);
    assert_eq!(opened.coordinator, world.identity.id);
    assert!(outbox.iter().any(|item| matches!(
        item,
        Outbound::Send { message: ProtocolMessage::StatusUpdate(update), .. } if update.accepted == StatusAccepted::Accepted
    )));

    fill_queue(&mut session, &participants[1..], TEST_NOW);
    assert_eq!(session.state(), PoolState::AcceptingEntries);
    assert_eq!(session.session_users(), 3);
    assert_eq!(session.session_collaterals().len(), 3);
    let ready = session.take_outbox().into_iter().any(|item| matches!(item, Outbound::Broadcast(ProtocolMessage::Queue(adv)) if adv.ready));
    assert!(ready);
}

#[test]
fn test_entries_when_all_submitted_then_final_transaction_in_acceptance_order() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    session.take_outbox();

    let order = [&participants[2], &participants[0], &participants[1]];
    submit_entries(&mut session, &order, TEST_NOW);
    assert_eq!(session.state(), PoolState::Signing);
    assert_eq!(session.locked_inputs().len(), 3);

    let tx = session.final_transaction().expect("final transaction");
    let spent: Vec<_> = tx.inputs.iter().map(|input| input.previous_output).collect();
    let expected: Vec<_> = order.iter().map(|p| p.plan.inputs[0].previous_output).collect();
    assert_eq!(spent, expected);
    assert!(tx.inputs.iter().all(|input| input.script_sig.is_empty()));
    assert!(tx.outputs.iter().all(|out| out.value == TEST_DENOMINATION));
    assert!(kinds(&session.take_outbox()).contains(&"dsf"));
}

#[test]
fn test_signatures_when_complete_then_transmitted_and_success() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    submit_entries(&mut session, &participants.iter().collect::<Vec<_>>(), TEST_NOW);
    session.take_outbox();

    sign_all(&mut session, &participants, TEST_NOW);
    assert_eq!(session.state(), PoolState::Success);
    assert_eq!(session.last_message(), PoolMessage::Success);
    assert!(session.locked_inputs().is_empty());

    let txid = session.final_transaction().expect("final transaction").txid().expect("txid");
    assert!(world.ledger.in_mempool(&txid).expect("mempool"));
    let sent = kinds(&session.take_outbox());
    assert!(sent.contains(&"dstx"));
    assert!(sent.contains(&"dsc"));
    for participant in &participants {
        assert!(!world.ledger.is_spendable(&participant.plan.inputs[0].previous_output));
    }
}

#[test]
fn test_signatures_when_forged_or_replayed_then_rejected() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    submit_entries(&mut session, &participants.iter().collect::<Vec<_>>(), TEST_NOW);

    let tx = session.final_transaction().cloned().expect("final transaction");
    let owner = &participants[0];
    let idx = tx.find_input(&owner.plan.inputs[0]).expect("input present");
    let mut forged = tx.inputs[idx].clone();
    forged.script_sig = KeyInputSigner::generate().sign_input(&tx, idx).expect("sign");
    assert!(!session.handle_signatures(&owner.peer, &[forged], TEST_NOW));

    let genuine = owner.sign(&tx);
    assert!(session.handle_signatures(&owner.peer, &genuine, TEST_NOW));
    assert!(!session.handle_signatures(&owner.peer, &genuine, TEST_NOW));
    assert_eq!(session.state(), PoolState::Signing);
}

#[test]
fn test_join_when_collateral_too_low_then_invalid_collateral() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let cheap = world.participant_with_collateral_fee("cheap", COIN / 1_000);

    let result = session.handle_join_request(&cheap.peer, PROTOCOL_VERSION, &cheap.join_request(), false, TEST_NOW);
    assert_eq!(result, Err(PoolMessage::InvalidCollateral));
    assert_eq!(session.state(), PoolState::Idle);
    assert!(matches!(
        session.take_outbox().as_slice(),
        [Outbound::Send { message: ProtocolMessage::StatusUpdate(update), .. }]
            if update.accepted == StatusAccepted::Rejected && update.message == PoolMessage::InvalidCollateral
    ));
}

#[test]
fn test_join_when_collateral_reused_then_rejected_and_charged() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants[..1], TEST_NOW);
    session.take_outbox();

    let repeat = participants[0].join_request();
    assert_eq!(
        session.handle_join_request(&participants[0].peer, PROTOCOL_VERSION, &repeat, false, TEST_NOW),
        Err(PoolMessage::InvalidCollateral)
    );
    assert_eq!(session.session_users(), 1);
    assert_eq!(session.state(), PoolState::Queue);
    let collateral_txid = repeat.collateral.txid().expect("txid");
    assert!(world.ledger.in_mempool(&collateral_txid).expect("mempool"));
    assert!(kinds(&session.take_outbox()).contains(&"tx"));

    fill_queue(&mut session, &participants[1..], TEST_NOW);
    assert_eq!(session.session_users(), 3);
    assert_eq!(session.state(), PoolState::AcceptingEntries);
}

#[test]
fn test_entry_when_collateral_not_joined_or_already_used_then_rejected() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    submit_entries(&mut session, &[&participants[0]], TEST_NOW);

    let outsider = world.participant("outsider");
    let mut foreign = participants[1].submission();
    foreign.collateral = outsider.plan.collateral.clone();
    assert_eq!(
        session.handle_entry_submission(&participants[1].peer, foreign, TEST_NOW),
        Err(PoolMessage::InvalidCollateral)
    );

    let mut second = participants[1].submission();
    second.collateral = participants[0].plan.collateral.clone();
    assert_eq!(session.handle_entry_submission(&participants[1].peer, second, TEST_NOW), Err(PoolMessage::AlreadyHave));
    let reused_txid = participants[0].plan.collateral.txid().expect("txid");
    assert!(world.ledger.in_mempool(&reused_txid).expect("mempool"));

    assert_eq!(session.entries().len(), 1);
    assert_eq!(session.locked_inputs().len(), 1);
    assert_eq!(session.state(), PoolState::AcceptingEntries);

    submit_entries(&mut session, &[&participants[1]], TEST_NOW);
    assert_eq!(session.entries().len(), 2);
}

#[test]
fn test_entry_when_collateral_too_low_then_invalid_collateral_and_nothing_locked() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    session.take_outbox();

    let cheap = world.participant_with_collateral_fee("cheap", COIN / 1_000);
    let mut submission = participants[0].submission();
    submission.collateral = cheap.plan.collateral.clone();
    assert_eq!(
        session.handle_entry_submission(&participants[0].peer, submission, TEST_NOW),
        Err(PoolMessage::InvalidCollateral)
    );
    assert_eq!(session.state(), PoolState::AcceptingEntries);
    assert!(session.entries().is_empty());
    assert!(session.locked_inputs().is_empty());
    assert!(matches!(
        session.take_outbox().as_slice(),
        [Outbound::Send { message: ProtocolMessage::StatusUpdate(update), .. }]
            if update.accepted == StatusAccepted::Rejected && update.message == PoolMessage::InvalidCollateral
    ));
}

#[test]
fn test_join_gating_reports_each_reason() {
    let world = PoolWorld::new();
    let participants = world.participants();
    let request = participants[0].join_request();
    let peer = &participants[0].peer;

    let mut session = world.coordinator_session();
    assert_eq!(session.handle_join_request(peer, PROTOCOL_VERSION - 1, &request, false, TEST_NOW), Err(PoolMessage::Version));
    assert_eq!(session.handle_join_request(peer, PROTOCOL_VERSION, &request, true, TEST_NOW), Err(PoolMessage::Recent));
    let no_denomination = JoinRequest { denomination: 0, ..request.clone() };
    assert_eq!(session.handle_join_request(peer, PROTOCOL_VERSION, &no_denomination, false, TEST_NOW), Err(PoolMessage::Denom));

    let mut client = world.client_session();
    assert_eq!(client.handle_join_request(peer, PROTOCOL_VERSION, &request, false, TEST_NOW), Err(PoolMessage::NotAMn));

    fill_queue(&mut session, &participants[..1], TEST_NOW);
    let other_tier = JoinRequest { denomination: 0b1000, ..participants[1].join_request() };
    assert_eq!(
        session.handle_join_request(&participants[1].peer, PROTOCOL_VERSION, &other_tier, false, TEST_NOW),
        Err(PoolMessage::Denom)
    );
    fill_queue(&mut session, &participants[1..], TEST_NOW);
    let late = world.participant("late");
    assert_eq!(
        session.handle_join_request(&late.peer, PROTOCOL_VERSION, &late.join_request(), false, TEST_NOW),
        Err(PoolMessage::QueueFull)
    );

    world.directory.remove(&world.identity.id).expect("remove");
    let mut unlisted = world.coordinator_session();
    assert_eq!(unlisted.handle_join_request(peer, PROTOCOL_VERSION, &request, false, TEST_NOW), Err(PoolMessage::MnList));
}

#[test]
fn test_entry_when_not_accepting_then_session_error() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants[..1], TEST_NOW);

    let result = session.handle_entry_submission(&participants[0].peer, participants[0].submission(), TEST_NOW);
    assert_eq!(result, Err(PoolMessage::Session));
    assert!(session.entries().is_empty());
}

#[test]
fn test_entry_when_input_already_locked_then_invalid_input_and_state_untouched() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    submit_entries(&mut session, &[&participants[0]], TEST_NOW);

    let mut stolen = participants[1].submission();
    stolen.inputs = participants[0].plan.inputs.clone();
    assert_eq!(session.handle_entry_submission(&participants[1].peer, stolen, TEST_NOW), Err(PoolMessage::InvalidInput));

    let mut doubled = participants[1].submission();
    doubled.inputs.push(doubled.inputs[0].clone());
    assert_eq!(session.handle_entry_submission(&participants[1].peer, doubled, TEST_NOW), Err(PoolMessage::AlreadyHave));

    assert_eq!(session.entries().len(), 1);
    assert_eq!(session.locked_inputs().len(), 1);
    assert_eq!(session.state(), PoolState::AcceptingEntries);
}

#[test]
fn test_entry_when_outputs_or_fees_wrong_then_specific_rejection() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    let peer = &participants[0].peer;

    let mut odd_script = participants[0].submission();
    odd_script.outputs[0].script_pubkey = Script::new(vec![0x51; 25]);
    assert_eq!(session.handle_entry_submission(peer, odd_script, TEST_NOW), Err(PoolMessage::InvalidScript));

    let mut short_script = participants[0].submission();
    short_script.outputs[0].script_pubkey = Script::new(vec![0x51; 3]);
    assert_eq!(session.handle_entry_submission(peer, short_script, TEST_NOW), Err(PoolMessage::NonStandardPubkey));

    let mut other_tier = participants[0].submission();
    other_tier.outputs[0].value = TEST_DENOMINATION / 10;
    assert_eq!(session.handle_entry_submission(peer, other_tier, TEST_NOW), Err(PoolMessage::ExistingTx));

    let owner_script = Script::p2pkh(&participants[0].signer.pubkey_hash());
    let large = world.ledger.fund(owner_script, TEST_DENOMINATION + COIN).expect("fund");
    let mut overpaying = participants[0].submission();
    overpaying.inputs = vec![TxIn::new(large)];
    assert_eq!(session.handle_entry_submission(peer, overpaying, TEST_NOW), Err(PoolMessage::Fees));

    let mut missing = participants[0].submission();
    missing.inputs = vec![TxIn::new(OutPoint::new(TxId::new([9; 32]), 0))];
    assert_eq!(session.handle_entry_submission(peer, missing, TEST_NOW), Err(PoolMessage::MissingTx));

    let mut empty = participants[0].submission();
    empty.outputs = Vec::<TxOut>::new();
    assert_eq!(session.handle_entry_submission(peer, empty, TEST_NOW), Err(PoolMessage::InvalidInput));

    assert!(session.entries().is_empty());
    assert!(session.locked_inputs().is_empty());
}

#[test]
fn test_update_state_when_terminal_guarded_then_refused() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants[..1], TEST_NOW);

    assert!(session.update_state(PoolState::Error, TEST_NOW).is_err());
    assert_eq!(session.state(), PoolState::Queue);

    let mut unguarded = world.coordinator_session_with(PoolConfig {
        coordinator_terminal_guard: false,
        ..test_pool_config(PoolRole::Coordinator)
    });
    fill_queue(&mut unguarded, &participants[1..2], TEST_NOW);
    unguarded.update_state(PoolState::Error, TEST_NOW).expect("unguarded transition");
    assert_eq!(unguarded.state(), PoolState::Error);
}

#[test]
fn test_new_block_when_round_stalls_then_reset() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants[..1], TEST_NOW);

    assert!(session.new_block(1, TEST_NOW));
    assert_eq!(session.state(), PoolState::Queue);

    let debounced = TEST_NOW + NANOS_PER_SECOND;
    assert!(!session.new_block(5, debounced));
    assert_eq!(session.block_height(), 5);
    assert_eq!(session.state(), PoolState::Queue);

    let later = TEST_NOW + 11 * NANOS_PER_SECOND;
    assert!(session.new_block(5, later));
    assert_eq!(session.state(), PoolState::Idle);
    assert!(session.session_id().is_none());
    assert_eq!(session.session_users(), 0);
}

#[test]
fn test_get_status_follows_the_round() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    assert_eq!(session.get_status(), "Mixing is idle.");
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    assert_eq!(session.get_status(), "Entries accepted, waiting for more (0/3).");
}

#[test]
fn test_signature_valid_when_final_transaction_proposed_then_checked_against_it() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    let tx_in = participants[0].plan.inputs[0].clone();
    assert!(!session.signature_valid(&[1, 2, 3], &tx_in));

    fill_queue(&mut session, &participants, TEST_NOW);
    submit_entries(&mut session, &participants.iter().collect::<Vec<_>>(), TEST_NOW);
    let tx = session.final_transaction().cloned().expect("final transaction");
    let signed: TxIn = participants[0].sign(&tx).remove(0);
    assert!(session.signature_valid(&signed.script_sig, &signed));
    assert!(world.ledger.spendable_output(&signed.previous_output).is_some());
}
