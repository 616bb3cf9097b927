use crate::error::Result;
use crate::model::{AgentSummary, Alert, AnalysisRecord, CreatedAgent, NewAgent, SystemStatus};
use async_trait::async_trait;

/// The fraud-detection API as seen by the console.
///
/// Implementations must map a transport failure, a non-2xx response and an undecodable body to
/// the matching [`crate::ConsoleError`] variant. Nothing above this trait distinguishes status
/// codes.
#[async_trait]
pub trait Backend: Send + Sync {
    // ========================================================================
    // Reads
    // ========================================================================

    /// `GET /api/status`
    async fn fetch_status(&self) -> Result<SystemStatus>;

    /// `GET /api/agents`
    async fn fetch_agents(&self) -> Result<Vec<AgentSummary>>;

    /// `GET /api/analyses`, most recent first
    async fn fetch_analyses(&self) -> Result<Vec<AnalysisRecord>>;

    /// `GET /api/alerts`
    async fn fetch_alerts(&self) -> Result<Vec<Alert>>;

    /// `GET /api/alerts/{id}`
    async fn fetch_alert(&self, alert_id: &str) -> Result<Alert>;

    // ========================================================================
    // Mutations
    // ========================================================================

    /// `POST /api/agents`
    async fn create_agent(&self, agent: &NewAgent) -> Result<CreatedAgent>;

    /// `POST /api/agents/{id}/start`
    async fn start_agent(&self, agent_id: &str) -> Result<()>;

    /// `POST /api/agents/{id}/stop`
    async fn stop_agent(&self, agent_id: &str) -> Result<()>;

    /// `DELETE /api/agents/{id}`
    async fn delete_agent(&self, agent_id: &str) -> Result<()>;

    /// `POST /api/alerts/{id}/acknowledge`
    async fn acknowledge_alert(&self, alert_id: &str) -> Result<()>;
}
