use crate::model::{AgentSummary, Alert, AlertStatus, AnalysisRecord, SystemStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// The independently polled resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Status,
    Agents,
    Analyses,
    Alerts,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Status,
        Resource::Agents,
        Resource::Analyses,
        Resource::Alerts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Status => "status",
            Resource::Agents => "agents",
            Resource::Analyses => "analyses",
            Resource::Alerts => "alerts",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Identifies one rendered cell: a field of a keyed row within a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub resource: Resource,
    pub key: String,
    pub field: &'static str,
}

impl FieldKey {
    pub fn new(resource: Resource, key: impl Into<String>, field: &'static str) -> Self {
        Self {
            resource,
            key: key.into(),
            field,
        }
    }
}

/// A rendered value that differs from what was on screen before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: FieldKey,
    pub previous: String,
    pub current: String,
}

/// Acknowledgment state of one alert as the console presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckState {
    New,
    PendingAck,
    Acknowledged,
}

/// An alert together with the optimistic overlay applied to it.
#[derive(Debug, Clone, Copy)]
pub struct AlertView<'a> {
    pub alert: &'a Alert,
    pub state: AckState,
}

impl AlertView<'_> {
    /// Status to render; a pending acknowledgment already reads as acknowledged.
    pub fn status(&self) -> AlertStatus {
        match self.state {
            AckState::New => AlertStatus::New,
            AckState::PendingAck | AckState::Acknowledged => AlertStatus::Acknowledged,
        }
    }

    pub fn can_acknowledge(&self) -> bool {
        self.state == AckState::New
    }
}

/// Last known good state of every panel.
///
/// Mutation is reserved to the reconciler and the alert lifecycle; everything else reads.
#[derive(Debug)]
pub struct ViewModelStore {
    status: Option<SystemStatus>,
    agents: Vec<AgentSummary>,
    analyses: Vec<AnalysisRecord>,
    alerts: Vec<Alert>,
    alert_index: HashMap<String, usize>,
    pending_acks: HashMap<String, Instant>,
    rendered: HashMap<FieldKey, String>,
    updated_at: HashMap<Resource, DateTime<Utc>>,
    alert_display_limit: usize,
}

impl ViewModelStore {
    pub fn new(alert_display_limit: usize) -> Self {
        Self {
            status: None,
            agents: Vec::new(),
            analyses: Vec::new(),
            alerts: Vec::new(),
            alert_index: HashMap::new(),
            pending_acks: HashMap::new(),
            rendered: HashMap::new(),
            updated_at: HashMap::new(),
            alert_display_limit,
        }
    }

    pub fn status(&self) -> Option<&SystemStatus> {
        self.status.as_ref()
    }

    pub fn agents(&self) -> &[AgentSummary] {
        &self.agents
    }

    pub fn agent(&self, agent_id: &str) -> Option<&AgentSummary> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    pub fn analyses(&self) -> &[AnalysisRecord] {
        &self.analyses
    }

    pub fn high_risk_analyses(&self, threshold: f64) -> usize {
        self.analyses
            .iter()
            .filter(|a| a.risk_score > threshold)
            .count()
    }

    /// Every alert from the last snapshot, in server order.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Lookup by ID over the full alert set, independent of the display cap.
    pub fn alert(&self, alert_id: &str) -> Option<AlertView<'_>> {
        self.alert_index.get(alert_id).map(|&idx| {
            let alert = &self.alerts[idx];
            AlertView {
                alert,
                state: self.state_of(alert),
            }
        })
    }

    pub fn alert_state(&self, alert_id: &str) -> Option<AckState> {
        self.alert(alert_id).map(|view| view.state)
    }

    /// The alerts shown in the alerts panel: the `alert_display_limit` most recent by
    /// timestamp, in server order. Ties keep the earlier server position.
    pub fn displayed_alerts(&self) -> Vec<AlertView<'_>> {
        let mut newest: Vec<usize> = (0..self.alerts.len()).collect();
        newest.sort_by(|&a, &b| self.alerts[b].timestamp.cmp(&self.alerts[a].timestamp));
        newest.truncate(self.alert_display_limit);
        newest.sort_unstable();

        newest
            .into_iter()
            .map(|idx| {
                let alert = &self.alerts[idx];
                AlertView {
                    alert,
                    state: self.state_of(alert),
                }
            })
            .collect()
    }

    pub fn alert_display_limit(&self) -> usize {
        self.alert_display_limit
    }

    pub fn is_pending(&self, alert_id: &str) -> bool {
        self.pending_acks.contains_key(alert_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_acks.len()
    }

    pub fn pending_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.pending_acks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Value currently on screen for a field, if it has been rendered.
    pub fn rendered(&self, field: &FieldKey) -> Option<&str> {
        self.rendered.get(field).map(String::as_str)
    }

    pub fn last_updated(&self, resource: Resource) -> Option<DateTime<Utc>> {
        self.updated_at.get(&resource).copied()
    }

    fn state_of(&self, alert: &Alert) -> AckState {
        if self.pending_acks.contains_key(&alert.alert_id) {
            AckState::PendingAck
        } else {
            match alert.status {
                AlertStatus::New => AckState::New,
                AlertStatus::Acknowledged => AckState::Acknowledged,
            }
        }
    }

    // ------------------------------------------------------------------------
    // Mutation, used by the reconciler and the alert lifecycle
    // ------------------------------------------------------------------------

    pub(crate) fn replace_status(&mut self, status: SystemStatus) {
        self.status = Some(status);
        self.touch(Resource::Status);
    }

    pub(crate) fn replace_agents(&mut self, agents: Vec<AgentSummary>) {
        self.agents = agents;
        self.touch(Resource::Agents);
    }

    pub(crate) fn replace_analyses(&mut self, analyses: Vec<AnalysisRecord>) {
        self.analyses = analyses;
        self.touch(Resource::Analyses);
    }

    pub(crate) fn replace_alerts(&mut self, alerts: Vec<Alert>) {
        self.alert_index = alerts
            .iter()
            .enumerate()
            .map(|(idx, alert)| (alert.alert_id.clone(), idx))
            .collect();
        self.alerts = alerts;
        self.touch(Resource::Alerts);
    }

    pub(crate) fn pending_since(&self, alert_id: &str) -> Option<Instant> {
        self.pending_acks.get(alert_id).copied()
    }

    pub(crate) fn insert_pending(&mut self, alert_id: &str, since: Instant) {
        self.pending_acks.insert(alert_id.to_string(), since);
    }

    pub(crate) fn remove_pending(&mut self, alert_id: &str) -> bool {
        self.pending_acks.remove(alert_id).is_some()
    }

    /// Record a rendered value, reporting a change when a different value was on screen.
    pub(crate) fn render_field(&mut self, field: FieldKey, value: String) -> Option<FieldChange> {
        match self.rendered.get(&field) {
            Some(previous) if *previous == value => None,
            Some(previous) => {
                let change = FieldChange {
                    field: field.clone(),
                    previous: previous.clone(),
                    current: value.clone(),
                };
                self.rendered.insert(field, value);
                Some(change)
            }
            None => {
                self.rendered.insert(field, value);
                None
            }
        }
    }

    /// Forget rendered fields of a resource whose row key is no longer present.
    pub(crate) fn retain_rendered(&mut self, resource: Resource, keep: impl Fn(&str) -> bool) {
        self.rendered
            .retain(|field, _| field.resource != resource || keep(&field.key));
    }

    fn touch(&mut self, resource: Resource) {
        self.updated_at.insert(resource, Utc::now());
    }
}

impl Default for ViewModelStore {
    fn default() -> Self {
        Self::new(10)
    }
}
