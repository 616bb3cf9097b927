use crate::console::{Console, NoticeLevel};
use crate::error::{ConsoleError, Result};
use crate::lifecycle::AckBegin;
use crate::model::NewAgent;
use crate::store::Resource;
use tracing::{debug, info, warn};

/// A user-initiated command. Deleting goes through [`ActionDispatcher::request_delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    StartAgent(String),
    StopAgent(String),
    CreateAgent(NewAgent),
    AcknowledgeAlert(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The mutating call succeeded and the affected resource was re-polled.
    Applied,
    /// Nothing to do; no call was issued.
    Skipped,
}

/// First half of a delete. Only [`ActionDispatcher::confirm_delete`] issues the call.
#[must_use = "a delete request does nothing until it is confirmed"]
#[derive(Debug, PartialEq, Eq)]
pub struct DeleteRequest {
    agent_id: String,
}

impl DeleteRequest {
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn prompt(&self) -> String {
        format!("Delete agent {}?", self.agent_id)
    }
}

/// Maps user actions to exactly one mutating call each.
///
/// A success triggers a re-poll of the one affected resource; a failure raises a notice and
/// leaves the store as it was. Nothing is retried.
#[derive(Clone)]
pub struct ActionDispatcher {
    console: Console,
}

impl ActionDispatcher {
    pub fn new(console: Console) -> Self {
        Self { console }
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub async fn dispatch(&self, action: Action) -> Result<ActionOutcome> {
        match action {
            Action::StartAgent(agent_id) => self.start_agent(&agent_id).await,
            Action::StopAgent(agent_id) => self.stop_agent(&agent_id).await,
            Action::CreateAgent(agent) => self.create_agent(&agent).await,
            Action::AcknowledgeAlert(alert_id) => self.acknowledge_alert(&alert_id).await,
        }
    }

    pub async fn start_agent(&self, agent_id: &str) -> Result<ActionOutcome> {
        let result = self.console.backend().start_agent(agent_id).await;
        self.finish(
            result,
            Resource::Agents,
            (NoticeLevel::Success, "Agent started successfully!"),
            "Failed to start agent",
        )
        .await
    }

    pub async fn stop_agent(&self, agent_id: &str) -> Result<ActionOutcome> {
        let result = self.console.backend().stop_agent(agent_id).await;
        self.finish(
            result,
            Resource::Agents,
            (NoticeLevel::Warning, "Agent stopped successfully!"),
            "Failed to stop agent",
        )
        .await
    }

    pub async fn create_agent(&self, agent: &NewAgent) -> Result<ActionOutcome> {
        let result = self.console.backend().create_agent(agent).await.map(|created| {
            info!(agent_id = ?created.agent_id, name = %agent.name, "agent created");
        });
        self.finish(
            result,
            Resource::Agents,
            (NoticeLevel::Success, "Agent created successfully!"),
            "Failed to create agent",
        )
        .await
    }

    pub fn request_delete(&self, agent_id: &str) -> DeleteRequest {
        DeleteRequest {
            agent_id: agent_id.to_string(),
        }
    }

    pub async fn confirm_delete(&self, request: DeleteRequest) -> Result<ActionOutcome> {
        let result = self.console.backend().delete_agent(&request.agent_id).await;
        self.finish(
            result,
            Resource::Agents,
            (NoticeLevel::Info, "Agent deleted successfully!"),
            "Failed to delete agent",
        )
        .await
    }

    /// Optimistically acknowledge, then confirm with the backend or roll back.
    ///
    /// Every acknowledge entry point goes through here, so a second request for an alert that
    /// is already pending or acknowledged issues no call.
    pub async fn acknowledge_alert(&self, alert_id: &str) -> Result<ActionOutcome> {
        let begin = self
            .console
            .write(|store, reconciler| reconciler.lifecycle().begin(store, alert_id));

        match begin {
            Ok(AckBegin::Started { changes }) => self.console.emit_changes(changes),
            Ok(other) => {
                debug!(alert_id, outcome = ?other, "acknowledge ignored");
                return Ok(ActionOutcome::Skipped);
            }
            Err(e) => {
                self.fail("Failed to acknowledge alert", &e);
                return Err(e);
            }
        }

        match self.console.backend().acknowledge_alert(alert_id).await {
            Ok(()) => {
                self.console
                    .notify(NoticeLevel::Success, "Alert acknowledged");
                self.console.refresh(Resource::Alerts).await;
                Ok(ActionOutcome::Applied)
            }
            Err(e) => {
                let changes = self
                    .console
                    .write(|store, reconciler| reconciler.lifecycle().rollback(store, alert_id));
                self.console.emit_changes(changes);
                self.fail("Failed to acknowledge alert", &e);
                Err(e)
            }
        }
    }

    async fn finish(
        &self,
        result: Result<()>,
        resource: Resource,
        success: (NoticeLevel, &str),
        failure: &str,
    ) -> Result<ActionOutcome> {
        match result {
            Ok(()) => {
                self.console.notify(success.0, success.1);
                self.console.refresh(resource).await;
                Ok(ActionOutcome::Applied)
            }
            Err(e) => {
                self.fail(failure, &e);
                Err(e)
            }
        }
    }

    fn fail(&self, message: &str, error: &ConsoleError) {
        warn!(kind = error.kind(), "{}: {}", message, error);
        self.console
            .notify(NoticeLevel::Error, format!("{message}: {error}"));
    }
}
