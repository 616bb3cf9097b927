use crate::config::ConsoleConfig;
use crate::lifecycle::{AlertLifecycle, SettleReport};
use crate::model::{AgentSummary, Alert, AnalysisRecord, SystemStatus};
use crate::store::{FieldChange, FieldKey, Resource, ViewModelStore};
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

/// One fetched response for a single resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Status(SystemStatus),
    Agents(Vec<AgentSummary>),
    Analyses(Vec<AnalysisRecord>),
    Alerts(Vec<Alert>),
}

impl Snapshot {
    pub fn resource(&self) -> Resource {
        match self {
            Snapshot::Status(_) => Resource::Status,
            Snapshot::Agents(_) => Resource::Agents,
            Snapshot::Analyses(_) => Resource::Analyses,
            Snapshot::Alerts(_) => Resource::Alerts,
        }
    }
}

/// Result of applying one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Rendered fields whose value changed; used only for highlight effects.
    pub changes: Vec<FieldChange>,
    /// Pending acknowledgments resolved by an alerts snapshot.
    pub settled: SettleReport,
}

/// Key under which aggregate rows are rendered.
pub const SYSTEM_KEY: &str = "system";
pub const ANALYSES_SUMMARY_KEY: &str = "summary";

/// Applies snapshots to the store.
///
/// Every snapshot replaces its whole collection, so applying snapshots out of order or twice
/// converges on the last one applied.
#[derive(Debug, Clone)]
pub struct Reconciler {
    lifecycle: AlertLifecycle,
    high_risk_threshold: f64,
}

impl Reconciler {
    pub fn new(lifecycle: AlertLifecycle, high_risk_threshold: f64) -> Self {
        Self {
            lifecycle,
            high_risk_threshold,
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::new(
            AlertLifecycle::new(config.pending_ack_timeout()),
            config.high_risk_threshold,
        )
    }

    pub fn lifecycle(&self) -> &AlertLifecycle {
        &self.lifecycle
    }

    pub fn high_risk_threshold(&self) -> f64 {
        self.high_risk_threshold
    }

    pub fn apply(&self, store: &mut ViewModelStore, snapshot: Snapshot) -> Reconciliation {
        let resource = snapshot.resource();
        let mut result = Reconciliation::default();

        match snapshot {
            Snapshot::Status(status) => {
                let rows = vec![(SYSTEM_KEY.to_string(), status_fields(&status))];
                store.replace_status(status);
                result.changes = render_rows(store, Resource::Status, rows);
            }
            Snapshot::Agents(agents) => {
                let rows = agents
                    .iter()
                    .map(|agent| (agent.agent_id.clone(), agent_fields(agent)))
                    .collect();
                store.replace_agents(agents);
                result.changes = render_rows(store, Resource::Agents, rows);
            }
            Snapshot::Analyses(analyses) => {
                store.replace_analyses(analyses);
                let high_risk = store.high_risk_analyses(self.high_risk_threshold);
                let rows = vec![(
                    ANALYSES_SUMMARY_KEY.to_string(),
                    vec![("high_risk_count", high_risk.to_string())],
                )];
                result.changes = render_rows(store, Resource::Analyses, rows);
            }
            Snapshot::Alerts(alerts) => {
                store.replace_alerts(alerts);
                result.settled = self.lifecycle.settle(store, Instant::now());

                let ids: Vec<String> = store.alerts().iter().map(|a| a.alert_id.clone()).collect();
                let rows = ids
                    .iter()
                    .map(|id| (id.clone(), alert_fields(store, id)))
                    .collect();
                result.changes = render_rows(store, Resource::Alerts, rows);
            }
        }

        debug!(
            resource = %resource,
            changes = result.changes.len(),
            "snapshot reconciled"
        );
        result
    }
}

/// Re-render the fields of a single alert after its overlay changed.
pub(crate) fn render_alert_row(store: &mut ViewModelStore, alert_id: &str) -> Vec<FieldChange> {
    alert_fields(store, alert_id)
        .into_iter()
        .filter_map(|(field, value)| {
            store.render_field(FieldKey::new(Resource::Alerts, alert_id, field), value)
        })
        .collect()
}

fn render_rows(
    store: &mut ViewModelStore,
    resource: Resource,
    rows: Vec<(String, Vec<(&'static str, String)>)>,
) -> Vec<FieldChange> {
    let keys: HashSet<String> = rows.iter().map(|(key, _)| key.clone()).collect();
    store.retain_rendered(resource, |key| keys.contains(key));

    let mut changes = Vec::new();
    for (key, fields) in rows {
        for (field, value) in fields {
            if let Some(change) = store.render_field(FieldKey::new(resource, key.clone(), field), value)
            {
                changes.push(change);
            }
        }
    }
    changes
}

fn status_fields(status: &SystemStatus) -> Vec<(&'static str, String)> {
    vec![
        ("agents", status.agents.to_string()),
        ("running_agents", status.running_agents.to_string()),
        ("total_events", status.total_events.to_string()),
        ("high_risk_alerts", status.high_risk_alerts.to_string()),
        ("active_alerts", status.active_alerts.to_string()),
    ]
}

fn agent_fields(agent: &AgentSummary) -> Vec<(&'static str, String)> {
    vec![
        ("name", agent.name.clone()),
        ("status", agent.status.to_string()),
        ("events_processed", agent.events_processed.to_string()),
        ("alerts_generated", agent.alerts_generated.to_string()),
    ]
}

fn alert_fields(store: &ViewModelStore, alert_id: &str) -> Vec<(&'static str, String)> {
    match store.alert(alert_id) {
        Some(view) => vec![
            ("status", view.status().to_string()),
            ("severity", view.alert.severity.to_string()),
        ],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentStatus, AlertStatus, Severity};
    use crate::store::AckState;
    use chrono::{TimeZone, Utc};

    fn agent(id: &str, status: AgentStatus, events: u64) -> AgentSummary {
        AgentSummary {
            agent_id: id.to_string(),
            name: format!("Agent {id}"),
            status,
            events_processed: events,
            alerts_generated: 0,
            account_ids: vec![],
            created_at: None,
            last_activity: None,
        }
    }

    fn analysis(event_id: &str, risk_score: f64) -> AnalysisRecord {
        AnalysisRecord {
            analysis_id: None,
            agent_id: None,
            event_id: event_id.to_string(),
            risk_score,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            fraud_indicators: vec![],
            reasoning: "velocity spike".to_string(),
            recommended_actions: vec!["review".to_string()],
        }
    }

    fn alert(id: &str, status: AlertStatus) -> Alert {
        Alert {
            alert_id: id.to_string(),
            event_id: format!("EVT-{id}"),
            account_id: "ACC003".to_string(),
            risk_score: 0.88,
            severity: Severity::High,
            status,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            event_details: serde_json::Value::Null,
            analysis_details: Default::default(),
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(AlertLifecycle::default(), 0.7)
    }

    #[test]
    fn test_agent_counter_change_is_reported_alone() {
        let reconciler = reconciler();
        let mut store = ViewModelStore::default();

        let first = reconciler.apply(
            &mut store,
            Snapshot::Agents(vec![agent("a1", AgentStatus::Running, 10)]),
        );
        assert!(first.changes.is_empty());

        let second = reconciler.apply(
            &mut store,
            Snapshot::Agents(vec![agent("a1", AgentStatus::Running, 11)]),
        );
        assert_eq!(second.changes.len(), 1);
        let change = &second.changes[0];
        assert_eq!(change.field.key, "a1");
        assert_eq!(change.field.field, "events_processed");
        assert_eq!(change.previous, "10");
        assert_eq!(change.current, "11");
    }

    #[test]
    fn test_same_snapshot_twice_is_idempotent() {
        let reconciler = reconciler();
        let mut store = ViewModelStore::default();
        let snapshot = Snapshot::Agents(vec![
            agent("a1", AgentStatus::Running, 3),
            agent("a2", AgentStatus::Stopped, 0),
        ]);

        reconciler.apply(&mut store, snapshot.clone());
        let agents_after_first = store.agents().to_vec();

        let again = reconciler.apply(&mut store, snapshot);
        assert!(again.changes.is_empty());
        assert_eq!(store.agents(), agents_after_first.as_slice());
    }

    #[test]
    fn test_agents_snapshot_replaces_stale_entries() {
        let reconciler = reconciler();
        let mut store = ViewModelStore::default();

        reconciler.apply(
            &mut store,
            Snapshot::Agents(vec![
                agent("a1", AgentStatus::Running, 1),
                agent("a2", AgentStatus::Running, 1),
            ]),
        );
        reconciler.apply(
            &mut store,
            Snapshot::Agents(vec![agent("a2", AgentStatus::Stopped, 1)]),
        );

        assert_eq!(store.agents().len(), 1);
        assert!(store.agent("a1").is_none());
        assert!(store
            .rendered(&FieldKey::new(Resource::Agents, "a1", "status"))
            .is_none());

        // A re-created a1 is a new row, not a change.
        let back = reconciler.apply(
            &mut store,
            Snapshot::Agents(vec![agent("a1", AgentStatus::Stopped, 0)]),
        );
        assert!(back.changes.is_empty());
    }

    #[test]
    fn test_status_counters_are_tracked() {
        let reconciler = reconciler();
        let mut store = ViewModelStore::default();
        let mut status = SystemStatus {
            agents: 2,
            running_agents: 1,
            ..Default::default()
        };

        reconciler.apply(&mut store, Snapshot::Status(status.clone()));
        status.running_agents = 2;
        let result = reconciler.apply(&mut store, Snapshot::Status(status));

        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].field.field, "running_agents");
        assert_eq!(store.status().unwrap().running_agents, 2);
    }

    #[test]
    fn test_analyses_keep_server_order_and_track_high_risk_count() {
        let reconciler = reconciler();
        let mut store = ViewModelStore::default();

        reconciler.apply(
            &mut store,
            Snapshot::Analyses(vec![analysis("EVT3", 0.2), analysis("EVT1", 0.9)]),
        );
        assert_eq!(store.analyses()[0].event_id, "EVT3");

        let result = reconciler.apply(
            &mut store,
            Snapshot::Analyses(vec![
                analysis("EVT4", 0.95),
                analysis("EVT3", 0.2),
                analysis("EVT1", 0.9),
            ]),
        );
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].field.field, "high_risk_count");
        assert_eq!(result.changes[0].previous, "1");
        assert_eq!(result.changes[0].current, "2");
    }

    #[test]
    fn test_alerts_snapshot_respects_pending_overlay() {
        let reconciler = reconciler();
        let mut store = ViewModelStore::default();
        reconciler.apply(&mut store, Snapshot::Alerts(vec![alert("A", AlertStatus::New)]));

        reconciler.lifecycle().begin(&mut store, "A").unwrap();

        let lagging = reconciler.apply(&mut store, Snapshot::Alerts(vec![alert("A", AlertStatus::New)]));
        assert!(lagging.changes.is_empty());
        assert_eq!(store.alert_state("A"), Some(AckState::PendingAck));

        let confirmed = reconciler.apply(
            &mut store,
            Snapshot::Alerts(vec![alert("A", AlertStatus::Acknowledged)]),
        );
        assert_eq!(confirmed.settled.confirmed, vec!["A".to_string()]);
        assert!(confirmed.changes.is_empty());
        assert!(!store.is_pending("A"));
    }

    #[test]
    fn test_fifteen_alerts_display_ten_resolve_all() {
        let reconciler = reconciler();
        let mut store = ViewModelStore::new(10);
        let alerts: Vec<Alert> = (0..15)
            .map(|i| alert(&format!("ALT-{i:02}"), AlertStatus::New))
            .collect();

        reconciler.apply(&mut store, Snapshot::Alerts(alerts));

        assert_eq!(store.displayed_alerts().len(), 10);
        for i in 10..15 {
            assert!(store.alert(&format!("ALT-{i:02}")).is_some());
        }
    }
}
