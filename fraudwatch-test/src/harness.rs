use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use fraudwatch::HttpBackend;
use fraudwatch_core::model::{
    AgentStatus, AgentSummary, Alert, AlertStatus, AnalysisRecord, Severity, SystemStatus,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Route keys for call counters and failure injection.
pub mod routes {
    pub const STATUS: &str = "GET /api/status";
    pub const AGENTS: &str = "GET /api/agents";
    pub const ANALYSES: &str = "GET /api/analyses";
    pub const ALERTS: &str = "GET /api/alerts";
    pub const ALERT: &str = "GET /api/alerts/{id}";
    pub const CREATE_AGENT: &str = "POST /api/agents";
    pub const START_AGENT: &str = "POST /api/agents/{id}/start";
    pub const STOP_AGENT: &str = "POST /api/agents/{id}/stop";
    pub const DELETE_AGENT: &str = "DELETE /api/agents/{id}";
    pub const ACKNOWLEDGE: &str = "POST /api/alerts/{id}/acknowledge";
}

/// How an injected failure answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Status(u16),
    /// 200 with a body that is not JSON.
    Malformed,
}

/// Backend state behind the fake API.
#[derive(Default)]
pub struct FakeState {
    agents: DashMap<String, AgentSummary>,
    analyses: RwLock<Vec<AnalysisRecord>>,
    alerts: RwLock<Vec<Alert>>,
    calls: DashMap<&'static str, u64>,
    failures: DashMap<&'static str, Failure>,
    lag_acknowledgments: AtomicBool,
}

impl FakeState {
    /// Count the call and answer with the injected failure, if any.
    fn check(&self, route: &'static str) -> Option<Response> {
        *self.calls.entry(route).or_insert(0) += 1;

        let failure = self.failures.get(route).map(|failure| *failure)?;
        Some(match failure {
            Failure::Status(code) => (
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(json!({ "detail": "injected failure" })),
            )
                .into_response(),
            Failure::Malformed => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                "<html>upstream proxy error</html>",
            )
                .into_response(),
        })
    }

    fn sorted_agents(&self) -> Vec<AgentSummary> {
        let mut agents: Vec<AgentSummary> =
            self.agents.iter().map(|entry| entry.value().clone()).collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        agents
    }

    /// Counters derived the way the real backend derives them.
    fn system_status(&self) -> SystemStatus {
        let agents = self.sorted_agents();
        let alerts = self.alerts.read();
        SystemStatus {
            status: Some("running".to_string()),
            agents: agents.len() as u64,
            running_agents: agents
                .iter()
                .filter(|agent| agent.status == AgentStatus::Running)
                .count() as u64,
            total_events: agents.iter().map(|agent| agent.events_processed).sum(),
            high_risk_alerts: agents.iter().map(|agent| agent.alerts_generated).sum(),
            active_alerts: alerts
                .iter()
                .filter(|alert| alert.status == AlertStatus::New)
                .count() as u64,
            critical_alerts: Some(
                alerts
                    .iter()
                    .filter(|alert| alert.severity == Severity::Critical)
                    .count() as u64,
            ),
        }
    }
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": format!("{what} not found") })),
    )
        .into_response()
}

fn ok(message: &str) -> Response {
    Json(json!({ "success": true, "message": message })).into_response()
}

async fn get_status(State(state): State<Arc<FakeState>>) -> Response {
    if let Some(failure) = state.check(routes::STATUS) {
        return failure;
    }
    Json(state.system_status()).into_response()
}

async fn list_agents(State(state): State<Arc<FakeState>>) -> Response {
    if let Some(failure) = state.check(routes::AGENTS) {
        return failure;
    }
    Json(state.sorted_agents()).into_response()
}

async fn create_agent(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    if let Some(failure) = state.check(routes::CREATE_AGENT) {
        return failure;
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Name is required" })),
        )
            .into_response();
    }
    let account_ids = body["account_ids"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let agent_id = Uuid::new_v4().to_string();
    state.agents.insert(
        agent_id.clone(),
        AgentSummary {
            agent_id: agent_id.clone(),
            name,
            status: AgentStatus::Stopped,
            events_processed: 0,
            alerts_generated: 0,
            account_ids,
            created_at: Some(chrono::Utc::now()),
            last_activity: None,
        },
    );

    Json(json!({ "success": true, "agent_id": agent_id, "message": "Agent created" }))
        .into_response()
}

async fn start_agent(
    State(state): State<Arc<FakeState>>,
    Path(agent_id): Path<String>,
) -> Response {
    if let Some(failure) = state.check(routes::START_AGENT) {
        return failure;
    }
    match state.agents.get_mut(&agent_id) {
        Some(mut agent) => {
            agent.status = AgentStatus::Running;
            ok("Agent started")
        }
        None => not_found("Agent"),
    }
}

async fn stop_agent(
    State(state): State<Arc<FakeState>>,
    Path(agent_id): Path<String>,
) -> Response {
    if let Some(failure) = state.check(routes::STOP_AGENT) {
        return failure;
    }
    match state.agents.get_mut(&agent_id) {
        Some(mut agent) => {
            agent.status = AgentStatus::Stopped;
            ok("Agent stopped")
        }
        None => not_found("Agent"),
    }
}

async fn delete_agent(
    State(state): State<Arc<FakeState>>,
    Path(agent_id): Path<String>,
) -> Response {
    if let Some(failure) = state.check(routes::DELETE_AGENT) {
        return failure;
    }
    match state.agents.remove(&agent_id) {
        Some(_) => ok("Agent deleted"),
        None => not_found("Agent"),
    }
}

async fn list_analyses(State(state): State<Arc<FakeState>>) -> Response {
    if let Some(failure) = state.check(routes::ANALYSES) {
        return failure;
    }
    Json(state.analyses.read().clone()).into_response()
}

async fn list_alerts(State(state): State<Arc<FakeState>>) -> Response {
    if let Some(failure) = state.check(routes::ALERTS) {
        return failure;
    }
    Json(state.alerts.read().clone()).into_response()
}

async fn get_alert(State(state): State<Arc<FakeState>>, Path(alert_id): Path<String>) -> Response {
    if let Some(failure) = state.check(routes::ALERT) {
        return failure;
    }
    let alert = state
        .alerts
        .read()
        .iter()
        .find(|alert| alert.alert_id == alert_id)
        .cloned();
    match alert {
        Some(alert) => Json(alert).into_response(),
        None => not_found("Alert"),
    }
}

async fn acknowledge_alert(
    State(state): State<Arc<FakeState>>,
    Path(alert_id): Path<String>,
) -> Response {
    if let Some(failure) = state.check(routes::ACKNOWLEDGE) {
        return failure;
    }
    let mut alerts = state.alerts.write();
    let Some(alert) = alerts.iter_mut().find(|alert| alert.alert_id == alert_id) else {
        return not_found("Alert");
    };
    if !state.lag_acknowledgments.load(Ordering::SeqCst) {
        alert.status = AlertStatus::Acknowledged;
    }
    ok("Alert acknowledged")
}

pub fn build_router(state: Arc<FakeState>) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/agents", get(list_agents).post(create_agent))
        .route("/api/agents/:agent_id", axum::routing::delete(delete_agent))
        .route("/api/agents/:agent_id/start", post(start_agent))
        .route("/api/agents/:agent_id/stop", post(stop_agent))
        .route("/api/analyses", get(list_analyses))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/:alert_id", get(get_alert))
        .route("/api/alerts/:alert_id/acknowledge", post(acknowledge_alert))
        .with_state(state)
}

/// The fraud-detection API served over real HTTP on an ephemeral local port.
pub struct FakeFraudApi {
    state: Arc<FakeState>,
    base_url: String,
    server: JoinHandle<()>,
}

impl FakeFraudApi {
    pub async fn start() -> Result<Self> {
        let state = Arc::new(FakeState::default());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind fake API listener")?;
        let addr = listener.local_addr()?;
        let router = build_router(Arc::clone(&state));

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            state,
            base_url: format!("http://{addr}"),
            server,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn backend(&self) -> HttpBackend {
        HttpBackend::new(&self.base_url)
    }

    pub fn calls(&self, route: &'static str) -> u64 {
        self.state
            .calls
            .get(route)
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn fail(&self, route: &'static str, failure: Failure) {
        self.state.failures.insert(route, failure);
    }

    pub fn heal(&self, route: &'static str) {
        self.state.failures.remove(route);
    }

    pub fn lag_acknowledgments(&self, lag: bool) {
        self.state.lag_acknowledgments.store(lag, Ordering::SeqCst);
    }

    pub fn put_agent(&self, agent: AgentSummary) {
        self.state.agents.insert(agent.agent_id.clone(), agent);
    }

    pub fn agent(&self, agent_id: &str) -> Option<AgentSummary> {
        self.state
            .agents
            .get(agent_id)
            .map(|agent| agent.value().clone())
    }

    pub fn agent_count(&self) -> usize {
        self.state.agents.len()
    }

    pub fn set_events_processed(&self, agent_id: &str, events_processed: u64) {
        if let Some(mut agent) = self.state.agents.get_mut(agent_id) {
            agent.events_processed = events_processed;
        }
    }

    pub fn set_analyses(&self, analyses: Vec<AnalysisRecord>) {
        *self.state.analyses.write() = analyses;
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        *self.state.alerts.write() = alerts;
    }

    pub fn alert_status(&self, alert_id: &str) -> Option<AlertStatus> {
        self.state
            .alerts
            .read()
            .iter()
            .find(|alert| alert.alert_id == alert_id)
            .map(|alert| alert.status)
    }
}

impl Drop for FakeFraudApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}
