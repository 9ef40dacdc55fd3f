//! End-to-end link session tests over mock transports: connection lifecycle,
//! snapshot publishing, operator commands mid-session, and teardown
//! semantics for clean closes, failures, and shutdown requests.

use flamewatch::monitor::{
    ConnectionState, FireMonitor, LinkSession, MonitorCommand, MonitorSnapshot, SessionHandle,
};
use flamewatch::sensors::SensorStatus;
use flamewatch::siren::NullSiren;
use flamewatch::transport::MockLink;
use flamewatch::MonitorError;
use std::time::Duration;

fn session_over(link: MockLink) -> (LinkSession, SessionHandle) {
    let monitor = FireMonitor::new(Box::new(NullSiren));
    LinkSession::new(Box::new(link), monitor)
}

/// Wait until a published snapshot satisfies the predicate, or panic after a
/// generous timeout.
async fn wait_for<F>(handle: &SessionHandle, what: &str, predicate: F) -> MonitorSnapshot
where
    F: Fn(&MonitorSnapshot) -> bool,
{
    let mut updates = handle.updates();
    let deadline = Duration::from_secs(5);
    let result = tokio::time::timeout(deadline, async {
        loop {
            {
                let snapshot = updates.borrow_and_update();
                if predicate(&snapshot) {
                    return snapshot.clone();
                }
            }
            if updates.changed().await.is_err() {
                panic!("session ended before: {}", what);
            }
        }
    })
    .await;
    match result {
        Ok(snapshot) => snapshot,
        Err(_) => panic!("timed out waiting for: {}", what),
    }
}

#[tokio::test]
async fn scripted_session_runs_to_clean_disconnect() {
    let link = MockLink::scripted(["10,10,10", "80,5,10"]);
    let (session, handle) = session_over(link);

    session.run().await.expect("clean session");

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::Disconnected);
    // The fire episode was recorded, and only acknowledgement clears the alarm
    assert_eq!(snapshot.alarm.incident_count, 1);
    assert!(snapshot.alarm.active);
    // Clean teardown restored the sensors
    for reading in &snapshot.sensors {
        assert_eq!(reading.status, SensorStatus::NotReady);
        assert_eq!(reading.value, 0);
    }
    assert!(!snapshot.history.is_empty());
}

#[tokio::test]
async fn connect_failure_surfaces_error_state() {
    let (session, handle) = session_over(MockLink::failing());

    let err = session.run().await.expect_err("connect must fail");
    assert!(matches!(err, MonitorError::TransportOpen { .. }));

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::Error);
    // No sensor state was touched by the failed open
    for reading in &snapshot.sensors {
        assert_eq!(reading.status, SensorStatus::NotReady);
    }
    assert_eq!(snapshot.alarm.incident_count, 0);
}

#[tokio::test]
async fn mid_session_failure_holds_last_known_values() {
    let link = MockLink::scripted_then_error(["42,43,44"]);
    let (session, handle) = session_over(link);

    let err = session.run().await.expect_err("link must break");
    assert!(matches!(err, MonitorError::TransportRead(_)));

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::Error);
    // Last-value-hold: the break does not reset the sensors
    assert_eq!(snapshot.sensors[0].value, 42);
    assert_eq!(snapshot.sensors[1].value, 43);
    assert_eq!(snapshot.sensors[2].value, 44);
}

#[tokio::test]
async fn live_session_processes_lines_and_commands() {
    let (link, lines) = MockLink::channelled();
    let (session, handle) = session_over(link);
    let runner = tokio::spawn(session.run());

    wait_for(&handle, "link up", |s| {
        s.connection == ConnectionState::Connected
    })
    .await;

    lines.send("5,6,7".to_string()).expect("send line");
    let snapshot = wait_for(&handle, "first frame", |s| s.sensors[2].value == 7).await;
    assert_eq!(snapshot.sensors[0].status, SensorStatus::Safe);

    // Operator triggers a test fire
    handle.command(MonitorCommand::TriggerTest);
    let snapshot = wait_for(&handle, "test alarm", |s| s.alarm.active).await;
    assert!(snapshot.alarm.test_mode);
    assert_eq!(snapshot.sensors[0].value, 100);

    handle.command(MonitorCommand::Acknowledge);
    let snapshot = wait_for(&handle, "acknowledged", |s| !s.alarm.active).await;
    assert!(!snapshot.alarm.test_mode);
    // Connected at acknowledge time: sensors fall back to initializing
    assert_eq!(snapshot.sensors[1].status, SensorStatus::Initializing);

    // Normal traffic resumes after acknowledgement
    lines.send("50,50,90".to_string()).expect("send line");
    let snapshot = wait_for(&handle, "second fire", |s| s.alarm.incident_count == 2).await;
    assert!(snapshot.alarm.active);
    handle.command(MonitorCommand::Acknowledge);
    wait_for(&handle, "second acknowledge", |s| !s.alarm.active).await;

    handle.shutdown();
    runner
        .await
        .expect("session task")
        .expect("clean shutdown");
    assert_eq!(handle.snapshot().connection, ConnectionState::Disconnected);
}

#[tokio::test]
async fn shutdown_interrupts_pending_read() {
    // A channelled link with no traffic leaves the session parked in a read
    let (link, _lines) = MockLink::channelled();
    let (session, handle) = session_over(link);
    let runner = tokio::spawn(session.run());

    wait_for(&handle, "link up", |s| {
        s.connection == ConnectionState::Connected
    })
    .await;

    handle.shutdown();
    let outcome = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("shutdown must interrupt the pending read")
        .expect("session task");
    outcome.expect("clean shutdown");
    assert_eq!(handle.snapshot().connection, ConnectionState::Disconnected);
}

#[tokio::test]
async fn incident_counter_survives_clear_only_by_command() {
    let (link, lines) = MockLink::channelled();
    let (session, handle) = session_over(link);
    let runner = tokio::spawn(session.run());

    lines.send("90,5,5".to_string()).expect("send line");
    wait_for(&handle, "incident", |s| s.alarm.incident_count == 1).await;

    handle.command(MonitorCommand::ClearIncidents);
    let snapshot = wait_for(&handle, "counter cleared", |s| s.alarm.incident_count == 0).await;
    // Clearing the counter does not silence the alarm
    assert!(snapshot.alarm.active);

    handle.shutdown();
    runner.await.expect("session task").expect("clean shutdown");
}
