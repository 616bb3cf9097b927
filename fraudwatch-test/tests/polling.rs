use anyhow::Result;
use fraudwatch_core::config::ConsoleConfig;
use fraudwatch_core::model::AgentStatus;
use fraudwatch_core::{
    Console, ConsoleError, ConsoleEvent, FieldKey, OverlapPolicy, Poller, RefreshOutcome,
    Resource, Snapshot,
};
use fraudwatch_test::fixtures::{agent, alerts, analysis, status};
use fraudwatch_test::scripted::{Call, ScriptedBackend};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

fn seeded() -> Arc<ScriptedBackend> {
    let backend = ScriptedBackend::new();
    backend.set_status(status(2, 1));
    backend.set_agents(vec![
        agent("a1", AgentStatus::Running, 10),
        agent("a2", AgentStatus::Stopped, 0),
    ]);
    backend.set_analyses(vec![analysis("evt-1", 0.91), analysis("evt-2", 0.12)]);
    backend.set_alerts(alerts(3));
    backend
}

fn console_for(backend: &Arc<ScriptedBackend>) -> Console {
    Console::new(backend.clone(), &ConsoleConfig::default())
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return Ok(());
        }
        sleep(Duration::from_millis(10)).await;
    }
    Err(anyhow::anyhow!("condition not reached in time"))
}

#[tokio::test]
async fn cycle_fetches_every_resource_concurrently() -> Result<()> {
    let backend = seeded();
    for call in [
        Call::FetchStatus,
        Call::FetchAgents,
        Call::FetchAnalyses,
        Call::FetchAlerts,
    ] {
        backend.delay(call, Duration::from_millis(150));
    }
    let console = console_for(&backend);

    let started = Instant::now();
    let report = console.run_cycle().await;

    assert!(report.is_clean());
    // Sequential fetches would take 600ms.
    assert!(started.elapsed() < Duration::from_millis(450));
    console.read(|store| {
        assert!(store.status().is_some());
        assert_eq!(store.agents().len(), 2);
        assert_eq!(store.analyses().len(), 2);
        assert_eq!(store.alerts().len(), 3);
    });
    Ok(())
}

#[tokio::test]
async fn one_failed_resource_does_not_block_the_others() -> Result<()> {
    let backend = seeded();
    let console = console_for(&backend);
    console.run_cycle().await;

    backend.set_agents(vec![agent("a1", AgentStatus::Running, 50)]);
    backend.set_alerts(alerts(5));
    backend.fail(Call::FetchAgents, ConsoleError::status(503, "unavailable"));

    let report = console.run_cycle().await;

    assert_eq!(report.failed(), vec![Resource::Agents]);
    assert!(matches!(
        report.outcome(Resource::Agents),
        Some(RefreshOutcome::Failed(ConsoleError::Status { status: 503, .. }))
    ));
    console.read(|store| {
        // Agents keep their last known good state; alerts moved on.
        assert_eq!(store.agents().len(), 2);
        assert_eq!(store.agent("a1").map(|a| a.events_processed), Some(10));
        assert_eq!(store.alerts().len(), 5);
    });

    backend.heal(Call::FetchAgents);
    let report = console.run_cycle().await;
    assert!(report.is_clean());
    console.read(|store| assert_eq!(store.agents().len(), 1));
    Ok(())
}

#[tokio::test]
async fn decode_failure_keeps_prior_state() -> Result<()> {
    let backend = seeded();
    let console = console_for(&backend);
    console.run_cycle().await;

    backend.fail(
        Call::FetchAnalyses,
        ConsoleError::Decode("expected a sequence".to_string()),
    );
    let outcome = console.refresh(Resource::Analyses).await;

    assert!(matches!(outcome, RefreshOutcome::Failed(ConsoleError::Decode(_))));
    console.read(|store| {
        assert_eq!(store.analyses().len(), 2);
        assert_eq!(store.analyses()[0].event_id, "evt-1");
    });
    Ok(())
}

#[tokio::test]
async fn applying_the_same_snapshot_twice_is_a_no_op() -> Result<()> {
    let backend = seeded();
    let console = console_for(&backend);
    console.run_cycle().await;

    let second = console.run_cycle().await;
    for resource in Resource::ALL {
        assert_eq!(
            second.outcome(resource),
            Some(&RefreshOutcome::Updated { changes: 0 })
        );
    }

    let snapshot = Snapshot::Agents(vec![agent("a1", AgentStatus::Running, 10)]);
    console.apply(snapshot.clone());
    let before = console.read(|store| store.agents().to_vec());
    let again = console.apply(snapshot);
    assert!(again.changes.is_empty());
    assert_eq!(console.read(|store| store.agents().to_vec()), before);
    Ok(())
}

#[tokio::test]
async fn field_changes_are_published_to_subscribers() -> Result<()> {
    let backend = seeded();
    let console = console_for(&backend);
    console.run_cycle().await;

    let mut events = console.subscribe();
    backend.set_agents(vec![
        agent("a1", AgentStatus::Running, 11),
        agent("a2", AgentStatus::Stopped, 0),
    ]);
    console.refresh(Resource::Agents).await;

    let mut changed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ConsoleEvent::FieldChanged(change) = event {
            changed.push(change.field);
        }
    }
    assert_eq!(
        changed,
        vec![FieldKey::new(Resource::Agents, "a1", "events_processed")]
    );
    Ok(())
}

#[tokio::test]
async fn poller_runs_first_cycle_immediately_and_stops_cleanly() -> Result<()> {
    let backend = seeded();
    let console = console_for(&backend);
    let mut poller = Poller::new(console.clone(), OverlapPolicy::Allow);

    poller.start(Duration::from_secs(60));
    assert!(poller.is_running());
    wait_until(|| console.read(|store| store.status().is_some())).await?;
    assert_eq!(poller.cycles_started(), 1);

    poller.stop();
    assert!(!poller.is_running());
    sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.calls(Call::FetchStatus), 1);
    Ok(())
}

#[tokio::test]
async fn stopping_lets_in_flight_cycles_finish() -> Result<()> {
    let backend = seeded();
    backend.delay(Call::FetchAlerts, Duration::from_millis(200));
    let console = console_for(&backend);
    let mut poller = Poller::new(console.clone(), OverlapPolicy::Allow);

    poller.start(Duration::from_secs(60));
    wait_until(|| backend.calls(Call::FetchAlerts) == 1).await?;
    poller.stop();

    wait_until(|| console.read(|store| store.alerts().len() == 3)).await?;
    assert_eq!(poller.cycles_started(), 1);
    Ok(())
}

#[tokio::test]
async fn cycles_may_overlap_by_default() -> Result<()> {
    let backend = seeded();
    backend.delay(Call::FetchStatus, Duration::from_millis(200));
    let console = console_for(&backend);
    let mut poller = Poller::new(console.clone(), OverlapPolicy::Allow);

    poller.start(Duration::from_millis(40));
    wait_until(|| poller.cycles_in_flight() > 1).await?;
    poller.stop();
    Ok(())
}

#[tokio::test]
async fn overlap_guard_skips_ticks_while_a_cycle_runs() -> Result<()> {
    let backend = seeded();
    backend.delay(Call::FetchStatus, Duration::from_millis(150));
    let console = console_for(&backend);
    let mut poller = Poller::new(console.clone(), OverlapPolicy::SkipWhileInFlight);

    poller.start(Duration::from_millis(20));
    let deadline = Instant::now() + Duration::from_millis(400);
    while Instant::now() < deadline {
        assert!(poller.cycles_in_flight() <= 1);
        sleep(Duration::from_millis(5)).await;
    }
    poller.stop();

    // Roughly one cycle per 150ms instead of one per 20ms.
    assert!(poller.cycles_started() <= 4);
    Ok(())
}

#[tokio::test]
async fn manual_refresh_runs_an_extra_cycle() -> Result<()> {
    let backend = seeded();
    let console = console_for(&backend);
    let mut poller = Poller::new(console.clone(), OverlapPolicy::Allow);

    poller.start(Duration::from_secs(60));
    wait_until(|| poller.cycles_in_flight() == 0 && poller.cycles_started() == 1).await?;

    let report = poller.refresh_now().await?;
    assert!(report.is_clean());
    assert_eq!(poller.cycles_started(), 2);
    assert_eq!(backend.calls(Call::FetchAgents), 2);
    assert!(poller.is_running());
    poller.stop();
    Ok(())
}
