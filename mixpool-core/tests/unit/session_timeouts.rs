use crate::fixtures::{fill_queue, submit_entries, PoolWorld, TEST_NOW};
use mixpool_core::domain::{Outbound, PoolMessage, PoolState, ProtocolMessage};
use mixpool_core::foundation::util::time::secs_to_nanos;

#[test]
fn test_check_timeout_when_queue_window_passes_then_error_and_inputs_released() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants[..2], TEST_NOW);

    assert!(!session.check_timeout(TEST_NOW + secs_to_nanos(30)));
    assert!(session.check_timeout(TEST_NOW + secs_to_nanos(31)));
    assert_eq!(session.state(), PoolState::Error);
    assert_eq!(session.last_message(), PoolMessage::SessionTimeout);
    assert!(session.locked_inputs().is_empty());
    assert!(session.take_outbox().iter().any(|item| matches!(
        item,
        Outbound::Broadcast(ProtocolMessage::Completed(notice)) if notice.error && notice.message == PoolMessage::SessionTimeout
    )));
}

#[test]
fn test_check_timeout_when_signing_window_passes_then_signing_timeout() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    submit_entries(&mut session, &participants.iter().collect::<Vec<_>>(), TEST_NOW);
    assert_eq!(session.state(), PoolState::Signing);
    assert_eq!(session.locked_inputs().len(), 3);

    assert!(!session.check_timeout(TEST_NOW + secs_to_nanos(15)));
    assert!(session.check_timeout(TEST_NOW + secs_to_nanos(16)));
    assert_eq!(session.state(), PoolState::Error);
    assert_eq!(session.last_message(), PoolMessage::SigningTimeout);
    assert!(session.locked_inputs().is_empty());
}

#[test]
fn test_check_timeout_when_entry_older_than_window_then_dropped_and_unlocked() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants, TEST_NOW);
    submit_entries(&mut session, &[&participants[0]], TEST_NOW + secs_to_nanos(1));
    submit_entries(&mut session, &[&participants[1]], TEST_NOW + secs_to_nanos(20));
    assert_eq!(session.locked_inputs().len(), 2);
    session.take_outbox();

    // The later entry keeps the session alive while the first one goes stale.
    assert!(!session.check_timeout(TEST_NOW + secs_to_nanos(32)));
    assert_eq!(session.state(), PoolState::AcceptingEntries);
    assert_eq!(session.entries().len(), 1);
    assert!(session.entries()[0].contains_outpoint(&participants[1].plan.inputs[0].previous_output));
    assert!(!session.is_locked(&participants[0].plan.inputs[0].previous_output));
    assert_eq!(session.locked_inputs().len(), 1);
    assert!(session.take_outbox().iter().any(|item| matches!(item, Outbound::Broadcast(ProtocolMessage::StatusUpdate(_)))));

    // The dropped participant may submit again.
    submit_entries(&mut session, &[&participants[0]], TEST_NOW + secs_to_nanos(33));
    assert_eq!(session.entries().len(), 2);

    assert!(session.check_timeout(TEST_NOW + secs_to_nanos(64)));
    assert_eq!(session.last_message(), PoolMessage::SessionTimeout);
    assert!(session.locked_inputs().is_empty());
}

#[test]
fn test_check_when_terminal_for_reset_delay_then_idle() {
    let world = PoolWorld::new();
    let mut session = world.coordinator_session();
    let participants = world.participants();
    fill_queue(&mut session, &participants[..1], TEST_NOW);
    let failed_at = TEST_NOW + secs_to_nanos(31);
    assert!(session.check_timeout(failed_at));

    session.check(failed_at + secs_to_nanos(9));
    assert_eq!(session.state(), PoolState::Error);

    session.check(failed_at + secs_to_nanos(10));
    assert_eq!(session.state(), PoolState::Idle);
    assert!(session.session_id().is_none());
    assert!(session.session_collaterals().is_empty());
    assert_eq!(session.last_message(), PoolMessage::SessionTimeout);
}

#[test]
fn test_check_timeout_when_client_then_lag_extends_window() {
    let world = PoolWorld::new();
    let mut client = world.client_session();
    let participant = world.participant("client-a");
    client.join(world.identity.id, participant.plan.clone(), TEST_NOW).expect("join");

    assert!(!client.check_timeout(TEST_NOW + secs_to_nanos(40)));
    assert!(client.check_timeout(TEST_NOW + secs_to_nanos(41)));
    assert_eq!(client.state(), PoolState::Error);
    assert!(client.locked_inputs().is_empty());
    assert!(client.take_outbox().iter().all(|item| !matches!(item.message(), ProtocolMessage::Completed(_))));
}
