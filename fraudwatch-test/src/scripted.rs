use async_trait::async_trait;
use dashmap::DashMap;
use fraudwatch_core::model::{
    AgentStatus, AgentSummary, Alert, AlertStatus, AnalysisRecord, CreatedAgent, NewAgent,
    SystemStatus,
};
use fraudwatch_core::{Backend, ConsoleError, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// One method of the [`Backend`] trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    FetchStatus,
    FetchAgents,
    FetchAnalyses,
    FetchAlerts,
    FetchAlert,
    CreateAgent,
    StartAgent,
    StopAgent,
    DeleteAgent,
    Acknowledge,
}

/// In-memory [`Backend`] whose responses, failures and timing are set by the test.
///
/// Calls are counted on entry, before any delay or gate.
#[derive(Default)]
pub struct ScriptedBackend {
    status: RwLock<SystemStatus>,
    agents: RwLock<Vec<AgentSummary>>,
    analyses: RwLock<Vec<AnalysisRecord>>,
    alerts: RwLock<Vec<Alert>>,
    calls: DashMap<Call, u64>,
    failures: DashMap<Call, ConsoleError>,
    delays: DashMap<Call, Duration>,
    ack_gate: Mutex<Option<Arc<Semaphore>>>,
    lag_acknowledgments: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, status: SystemStatus) {
        *self.status.write() = status;
    }

    pub fn set_agents(&self, agents: Vec<AgentSummary>) {
        *self.agents.write() = agents;
    }

    pub fn set_analyses(&self, analyses: Vec<AnalysisRecord>) {
        *self.analyses.write() = analyses;
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        *self.alerts.write() = alerts;
    }

    pub fn alert_status(&self, alert_id: &str) -> Option<AlertStatus> {
        self.alerts
            .read()
            .iter()
            .find(|alert| alert.alert_id == alert_id)
            .map(|alert| alert.status)
    }

    pub fn fail(&self, call: Call, error: ConsoleError) {
        self.failures.insert(call, error);
    }

    pub fn heal(&self, call: Call) {
        self.failures.remove(&call);
    }

    pub fn delay(&self, call: Call, delay: Duration) {
        self.delays.insert(call, delay);
    }

    pub fn calls(&self, call: Call) -> u64 {
        self.calls.get(&call).map(|count| *count).unwrap_or(0)
    }

    /// Keep acknowledgment calls in flight until [`Self::release_acknowledgments`].
    pub fn hold_acknowledgments(&self) {
        *self.ack_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_acknowledgments(&self) {
        if let Some(gate) = self.ack_gate.lock().take() {
            gate.close();
        }
    }

    /// Accept acknowledgments without reflecting them in later alert snapshots, like a
    /// backend whose read side lags its write side.
    pub fn lag_acknowledgments(&self, lag: bool) {
        self.lag_acknowledgments.store(lag, Ordering::SeqCst);
    }

    async fn enter(&self, call: Call) -> Result<()> {
        *self.calls.entry(call).or_insert(0) += 1;

        let delay = self.delays.get(&call).map(|delay| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.get(&call) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn set_agent_status(&self, agent_id: &str, status: AgentStatus) -> Result<()> {
        let mut agents = self.agents.write();
        let agent = agents
            .iter_mut()
            .find(|agent| agent.agent_id == agent_id)
            .ok_or_else(|| ConsoleError::status(404, "Agent not found"))?;
        agent.status = status;
        Ok(())
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn fetch_status(&self) -> Result<SystemStatus> {
        self.enter(Call::FetchStatus).await?;
        Ok(self.status.read().clone())
    }

    async fn fetch_agents(&self) -> Result<Vec<AgentSummary>> {
        self.enter(Call::FetchAgents).await?;
        Ok(self.agents.read().clone())
    }

    async fn fetch_analyses(&self) -> Result<Vec<AnalysisRecord>> {
        self.enter(Call::FetchAnalyses).await?;
        Ok(self.analyses.read().clone())
    }

    async fn fetch_alerts(&self) -> Result<Vec<Alert>> {
        self.enter(Call::FetchAlerts).await?;
        Ok(self.alerts.read().clone())
    }

    async fn fetch_alert(&self, alert_id: &str) -> Result<Alert> {
        self.enter(Call::FetchAlert).await?;
        self.alerts
            .read()
            .iter()
            .find(|alert| alert.alert_id == alert_id)
            .cloned()
            .ok_or_else(|| ConsoleError::status(404, "Alert not found"))
    }

    async fn create_agent(&self, agent: &NewAgent) -> Result<CreatedAgent> {
        self.enter(Call::CreateAgent).await?;
        let agent_id = format!("agent-{}", self.agents.read().len() + 1);
        self.agents.write().push(AgentSummary {
            agent_id: agent_id.clone(),
            name: agent.name.clone(),
            status: AgentStatus::Stopped,
            events_processed: 0,
            alerts_generated: 0,
            account_ids: agent.account_ids.clone(),
            created_at: None,
            last_activity: None,
        });
        Ok(CreatedAgent {
            agent_id: Some(agent_id),
            message: Some("Agent created".to_string()),
        })
    }

    async fn start_agent(&self, agent_id: &str) -> Result<()> {
        self.enter(Call::StartAgent).await?;
        self.set_agent_status(agent_id, AgentStatus::Running)
    }

    async fn stop_agent(&self, agent_id: &str) -> Result<()> {
        self.enter(Call::StopAgent).await?;
        self.set_agent_status(agent_id, AgentStatus::Stopped)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.enter(Call::DeleteAgent).await?;
        let mut agents = self.agents.write();
        let before = agents.len();
        agents.retain(|agent| agent.agent_id != agent_id);
        if agents.len() == before {
            return Err(ConsoleError::status(404, "Agent not found"));
        }
        Ok(())
    }

    async fn acknowledge_alert(&self, alert_id: &str) -> Result<()> {
        *self.calls.entry(Call::Acknowledge).or_insert(0) += 1;

        let gate = self.ack_gate.lock().clone();
        if let Some(gate) = gate {
            // Closed on release; the error is the signal to proceed.
            let _ = gate.acquire().await;
        }

        if let Some(error) = self.failures.get(&Call::Acknowledge) {
            return Err(error.clone());
        }

        if !self.lag_acknowledgments.load(Ordering::SeqCst) {
            let mut alerts = self.alerts.write();
            let alert = alerts
                .iter_mut()
                .find(|alert| alert.alert_id == alert_id)
                .ok_or_else(|| ConsoleError::status(404, "Alert not found"))?;
            alert.status = AlertStatus::Acknowledged;
        }
        Ok(())
    }
}
