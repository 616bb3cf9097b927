use anyhow::Result;
use fraudwatch_core::config::ConsoleConfig;
use fraudwatch_core::model::{AgentStatus, NewAgent};
use fraudwatch_core::{
    Action, ActionDispatcher, ActionOutcome, Console, ConsoleError, ConsoleEvent, FieldKey,
    NoticeLevel, Resource,
};
use fraudwatch_test::fixtures::{agent, alerts};
use fraudwatch_test::scripted::{Call, ScriptedBackend};
use std::sync::Arc;
use tokio::sync::broadcast;

async fn setup() -> (Arc<ScriptedBackend>, Console, ActionDispatcher) {
    let backend = ScriptedBackend::new();
    backend.set_agents(vec![
        agent("a1", AgentStatus::Stopped, 4),
        agent("a2", AgentStatus::Running, 9),
    ]);
    backend.set_alerts(alerts(2));
    let console = Console::new(backend.clone(), &ConsoleConfig::default());
    console.run_cycle().await;
    let dispatcher = ActionDispatcher::new(console.clone());
    (backend, console, dispatcher)
}

fn drain(events: &mut broadcast::Receiver<ConsoleEvent>) -> Vec<ConsoleEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

fn notices(events: &[ConsoleEvent]) -> Vec<(NoticeLevel, &str)> {
    events
        .iter()
        .filter_map(|event| match event {
            ConsoleEvent::Notice(notice) => Some((notice.level, notice.message.as_str())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn start_agent_notifies_and_repolls_only_agents() -> Result<()> {
    let (backend, console, dispatcher) = setup().await;
    let mut events = console.subscribe();

    let outcome = dispatcher
        .dispatch(Action::StartAgent("a1".to_string()))
        .await?;

    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(backend.calls(Call::StartAgent), 1);
    assert_eq!(backend.calls(Call::FetchAgents), 2);
    assert_eq!(backend.calls(Call::FetchAlerts), 1);
    assert_eq!(backend.calls(Call::FetchStatus), 1);

    let events = drain(&mut events);
    assert_eq!(
        notices(&events),
        vec![(NoticeLevel::Success, "Agent started successfully!")]
    );
    assert!(events.iter().any(|event| matches!(
        event,
        ConsoleEvent::FieldChanged(change)
            if change.field == FieldKey::new(Resource::Agents, "a1", "status")
                && change.current == "running"
    )));
    console.read(|store| {
        assert_eq!(
            store.agent("a1").map(|agent| agent.status),
            Some(AgentStatus::Running)
        );
    });
    Ok(())
}

#[tokio::test]
async fn stop_agent_uses_a_warning_notice() -> Result<()> {
    let (backend, console, dispatcher) = setup().await;
    let mut events = console.subscribe();

    dispatcher.stop_agent("a2").await?;

    assert_eq!(backend.calls(Call::StopAgent), 1);
    assert_eq!(
        notices(&drain(&mut events)),
        vec![(NoticeLevel::Warning, "Agent stopped successfully!")]
    );
    Ok(())
}

#[tokio::test]
async fn failed_action_reports_and_skips_the_repoll() -> Result<()> {
    let (backend, console, dispatcher) = setup().await;
    backend.fail(Call::StartAgent, ConsoleError::status(503, "agent pool exhausted"));
    let mut events = console.subscribe();

    let result = dispatcher.start_agent("a1").await;

    assert!(matches!(result, Err(ConsoleError::Status { status: 503, .. })));
    assert_eq!(backend.calls(Call::StartAgent), 1);
    assert_eq!(backend.calls(Call::FetchAgents), 1);

    let events = drain(&mut events);
    let notices = notices(&events);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, NoticeLevel::Error);
    assert!(notices[0].1.starts_with("Failed to start agent"));
    console.read(|store| {
        assert_eq!(
            store.agent("a1").map(|agent| agent.status),
            Some(AgentStatus::Stopped)
        );
    });
    Ok(())
}

#[tokio::test]
async fn delete_needs_confirmation() -> Result<()> {
    let (backend, console, dispatcher) = setup().await;

    let request = dispatcher.request_delete("a2");
    assert_eq!(request.agent_id(), "a2");
    assert_eq!(request.prompt(), "Delete agent a2?");
    assert_eq!(backend.calls(Call::DeleteAgent), 0);

    let outcome = dispatcher.confirm_delete(request).await?;

    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(backend.calls(Call::DeleteAgent), 1);
    console.read(|store| {
        assert!(store.agent("a2").is_none());
        assert_eq!(store.agents().len(), 1);
    });
    Ok(())
}

#[tokio::test]
async fn abandoned_delete_request_issues_nothing() -> Result<()> {
    let (backend, _console, dispatcher) = setup().await;

    let request = dispatcher.request_delete("a1");
    drop(request);

    assert_eq!(backend.calls(Call::DeleteAgent), 0);
    Ok(())
}

#[tokio::test]
async fn create_agent_appears_after_the_repoll() -> Result<()> {
    let (backend, console, dispatcher) = setup().await;
    let mut events = console.subscribe();

    let agent = NewAgent::from_form("  Night shift ", "ACC-7, ,ACC-9");
    assert_eq!(agent.account_ids, vec!["ACC-7", "ACC-9"]);
    dispatcher.dispatch(Action::CreateAgent(agent)).await?;

    assert_eq!(backend.calls(Call::CreateAgent), 1);
    console.read(|store| {
        let created = store
            .agents()
            .iter()
            .find(|agent| agent.name == "Night shift")
            .cloned();
        assert!(created.is_some());
        assert_eq!(
            created.map(|agent| agent.status),
            Some(AgentStatus::Stopped)
        );
    });
    assert_eq!(
        notices(&drain(&mut events)),
        vec![(NoticeLevel::Success, "Agent created successfully!")]
    );
    Ok(())
}

#[tokio::test]
async fn deleting_a_missing_agent_surfaces_the_status() -> Result<()> {
    let (backend, _console, dispatcher) = setup().await;

    let request = dispatcher.request_delete("ghost");
    let result = dispatcher.confirm_delete(request).await;

    assert!(matches!(result, Err(ConsoleError::Status { status: 404, .. })));
    assert_eq!(backend.calls(Call::DeleteAgent), 1);
    Ok(())
}
