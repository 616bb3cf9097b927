use async_trait::async_trait;
use fraudwatch_core::model::{
    AgentSummary, Alert, AnalysisRecord, CreatedAgent, NewAgent, SystemStatus,
};
use fraudwatch_core::{Backend, ConsoleError, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

const ERROR_BODY_LIMIT: usize = 200;

/// [`Backend`] over the fraud-detection HTTP API.
///
/// No request timeout is set: a hung fetch only delays its own resource.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ConsoleError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        } else {
            body.chars().take(ERROR_BODY_LIMIT).collect()
        };
        Err(ConsoleError::status(status.as_u16(), message))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ConsoleError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ConsoleError::Decode(format!("{path}: {e}")))
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        self.send(self.client.post(self.url(path))).await?;
        Ok(())
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_status(&self) -> Result<SystemStatus> {
        self.get("/api/status").await
    }

    async fn fetch_agents(&self) -> Result<Vec<AgentSummary>> {
        self.get("/api/agents").await
    }

    async fn fetch_analyses(&self) -> Result<Vec<AnalysisRecord>> {
        self.get("/api/analyses").await
    }

    async fn fetch_alerts(&self) -> Result<Vec<Alert>> {
        self.get("/api/alerts").await
    }

    async fn fetch_alert(&self, alert_id: &str) -> Result<Alert> {
        self.get(&format!("/api/alerts/{}", segment(alert_id))).await
    }

    async fn create_agent(&self, agent: &NewAgent) -> Result<CreatedAgent> {
        let response = self
            .send(self.client.post(self.url("/api/agents")).json(agent))
            .await?;

        // Success is the status code; the body is informational.
        let bytes = response.bytes().await.unwrap_or_default();
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            debug!("create agent reply not understood: {}", e);
            CreatedAgent::default()
        }))
    }

    async fn start_agent(&self, agent_id: &str) -> Result<()> {
        self.post_empty(&format!("/api/agents/{}/start", segment(agent_id)))
            .await
    }

    async fn stop_agent(&self, agent_id: &str) -> Result<()> {
        self.post_empty(&format!("/api/agents/{}/stop", segment(agent_id)))
            .await
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.send(
            self.client
                .delete(self.url(&format!("/api/agents/{}", segment(agent_id)))),
        )
        .await?;
        Ok(())
    }

    async fn acknowledge_alert(&self, alert_id: &str) -> Result<()> {
        self.post_empty(&format!("/api/alerts/{}/acknowledge", segment(alert_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://127.0.0.1:8000/");
        assert_eq!(backend.url("/api/status"), "http://127.0.0.1:8000/api/status");
    }

    #[test]
    fn test_path_segments_are_encoded() {
        assert_eq!(segment("a b/c"), "a%20b%2Fc");
        assert_eq!(segment("ALT-42"), "ALT-42");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is not served in test environments.
        let backend = HttpBackend::new("http://127.0.0.1:9");
        let err = backend.fetch_status().await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }
}
