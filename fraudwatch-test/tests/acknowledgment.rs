use anyhow::Result;
use fraudwatch_core::config::ConsoleConfig;
use fraudwatch_core::model::AlertStatus;
use fraudwatch_core::{
    AckState, ActionDispatcher, ActionOutcome, Console, ConsoleError, ConsoleEvent, FieldKey,
    NoticeLevel, Resource,
};
use fraudwatch_test::fixtures::{alerts, new_alert};
use fraudwatch_test::scripted::{Call, ScriptedBackend};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{sleep, Duration};

async fn console_with_alerts(
    backend: &Arc<ScriptedBackend>,
    config: &ConsoleConfig,
) -> (Console, ActionDispatcher) {
    let console = Console::new(backend.clone(), config);
    console.refresh(Resource::Alerts).await;
    let dispatcher = ActionDispatcher::new(console.clone());
    (console, dispatcher)
}

fn notices(events: &mut broadcast::Receiver<ConsoleEvent>) -> Vec<(NoticeLevel, String)> {
    let mut notices = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ConsoleEvent::Notice(notice) = event {
            notices.push((notice.level, notice.message));
        }
    }
    notices
}

fn state(console: &Console, alert_id: &str) -> Option<AckState> {
    console.read(|store| store.alert_state(alert_id))
}

#[tokio::test]
async fn pending_overlay_survives_a_lagging_poll_then_settles() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.set_alerts(vec![new_alert("x")]);
    backend.lag_acknowledgments(true);
    let (console, dispatcher) =
        console_with_alerts(&backend, &ConsoleConfig::default()).await;

    let outcome = dispatcher.acknowledge_alert("x").await?;
    assert_eq!(outcome, ActionOutcome::Applied);

    // The follow-up poll still says NEW; the overlay holds.
    assert_eq!(state(&console, "x"), Some(AckState::PendingAck));
    console.refresh(Resource::Alerts).await;
    assert_eq!(state(&console, "x"), Some(AckState::PendingAck));
    console.read(|store| {
        let view = store.alert("x").map(|view| view.status());
        assert_eq!(view, Some(AlertStatus::Acknowledged));
        assert_eq!(store.pending_count(), 1);
    });

    backend.lag_acknowledgments(false);
    backend.set_alerts(vec![{
        let mut alert = new_alert("x");
        alert.status = AlertStatus::Acknowledged;
        alert
    }]);
    console.refresh(Resource::Alerts).await;

    assert_eq!(state(&console, "x"), Some(AckState::Acknowledged));
    console.read(|store| assert_eq!(store.pending_count(), 0));
    Ok(())
}

#[tokio::test]
async fn failed_acknowledgment_rolls_back_with_an_error_notice() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.set_alerts(vec![new_alert("x")]);
    backend.fail(Call::Acknowledge, ConsoleError::status(500, "boom"));
    let (console, dispatcher) =
        console_with_alerts(&backend, &ConsoleConfig::default()).await;
    let mut events = console.subscribe();

    let result = dispatcher.acknowledge_alert("x").await;

    assert!(matches!(result, Err(ConsoleError::Status { status: 500, .. })));
    assert_eq!(state(&console, "x"), Some(AckState::New));
    console.read(|store| assert_eq!(store.pending_count(), 0));

    let mut status_changes = Vec::new();
    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            ConsoleEvent::FieldChanged(change)
                if change.field == FieldKey::new(Resource::Alerts, "x", "status") =>
            {
                status_changes.push(change.current)
            }
            ConsoleEvent::Notice(notice) if notice.level == NoticeLevel::Error => {
                errors.push(notice.message)
            }
            _ => {}
        }
    }
    assert_eq!(status_changes, vec!["ACKNOWLEDGED", "NEW"]);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Failed to acknowledge alert"));
    // No follow-up poll after a failure.
    assert_eq!(backend.calls(Call::FetchAlerts), 1);
    Ok(())
}

#[tokio::test]
async fn second_request_while_pending_issues_no_call() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.set_alerts(vec![new_alert("x")]);
    backend.hold_acknowledgments();
    let (console, dispatcher) =
        console_with_alerts(&backend, &ConsoleConfig::default()).await;

    let first = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.acknowledge_alert("x").await }
    });
    while backend.calls(Call::Acknowledge) == 0 {
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(state(&console, "x"), Some(AckState::PendingAck));

    let second = dispatcher.acknowledge_alert("x").await?;
    assert_eq!(second, ActionOutcome::Skipped);

    backend.release_acknowledgments();
    assert_eq!(first.await??, ActionOutcome::Applied);
    assert_eq!(backend.calls(Call::Acknowledge), 1);
    assert_eq!(state(&console, "x"), Some(AckState::Acknowledged));

    let third = dispatcher.acknowledge_alert("x").await?;
    assert_eq!(third, ActionOutcome::Skipped);
    assert_eq!(backend.calls(Call::Acknowledge), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_alert_makes_no_call() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.set_alerts(alerts(2));
    let (console, dispatcher) =
        console_with_alerts(&backend, &ConsoleConfig::default()).await;
    let mut events = console.subscribe();

    let result = dispatcher.acknowledge_alert("missing").await;

    assert!(matches!(result, Err(ConsoleError::UnknownAlert(id)) if id == "missing"));
    assert_eq!(backend.calls(Call::Acknowledge), 0);
    let notices = notices(&mut events);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, NoticeLevel::Error);
    Ok(())
}

#[tokio::test]
async fn vanished_alert_leaves_the_pending_set() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.set_alerts(vec![new_alert("x"), new_alert("y")]);
    backend.lag_acknowledgments(true);
    let (console, dispatcher) =
        console_with_alerts(&backend, &ConsoleConfig::default()).await;

    dispatcher.acknowledge_alert("x").await?;
    assert_eq!(state(&console, "x"), Some(AckState::PendingAck));

    backend.set_alerts(vec![new_alert("y")]);
    console.refresh(Resource::Alerts).await;

    console.read(|store| {
        assert_eq!(store.pending_count(), 0);
        assert!(store.alert("x").is_none());
    });
    Ok(())
}

#[tokio::test]
async fn unconfirmed_acknowledgment_expires_after_the_configured_bound() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.set_alerts(vec![new_alert("x")]);
    backend.lag_acknowledgments(true);
    let config = ConsoleConfig {
        pending_ack_timeout_ms: Some(50),
        ..Default::default()
    };
    let (console, dispatcher) = console_with_alerts(&backend, &config).await;

    dispatcher.acknowledge_alert("x").await?;
    assert_eq!(state(&console, "x"), Some(AckState::PendingAck));

    let mut events = console.subscribe();
    sleep(Duration::from_millis(80)).await;
    console.refresh(Resource::Alerts).await;

    assert_eq!(state(&console, "x"), Some(AckState::New));
    let notices = notices(&mut events);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, NoticeLevel::Warning);
    assert!(notices[0].1.contains("alert x"));
    Ok(())
}

#[tokio::test]
async fn without_a_bound_the_overlay_waits_indefinitely() -> Result<()> {
    let backend = ScriptedBackend::new();
    backend.set_alerts(vec![new_alert("x")]);
    backend.lag_acknowledgments(true);
    let (console, dispatcher) =
        console_with_alerts(&backend, &ConsoleConfig::default()).await;

    dispatcher.acknowledge_alert("x").await?;
    for _ in 0..3 {
        sleep(Duration::from_millis(20)).await;
        console.refresh(Resource::Alerts).await;
    }

    assert_eq!(state(&console, "x"), Some(AckState::PendingAck));
    Ok(())
}
