use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of a detection agent as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Running,
    Stopped,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Running => "running",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Error => "error",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub name: String,
    pub status: AgentStatus,
    #[serde(default)]
    pub events_processed: u64,
    #[serde(default)]
    pub alerts_generated: u64,
    #[serde(default)]
    pub account_ids: Vec<String>,
    #[serde(default, deserialize_with = "optional_instant")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_instant")]
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub event_id: String,
    pub risk_score: f64,
    #[serde(deserialize_with = "instant")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub fraud_indicators: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    New,
    Acknowledged,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New => "NEW",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisDetails {
    #[serde(default)]
    pub fraud_indicators: Vec<String>,
    #[serde(default)]
    pub risk_breakdown: BTreeMap<String, String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(default)]
    pub similar_events_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub event_id: String,
    pub account_id: String,
    pub risk_score: f64,
    pub severity: Severity,
    pub status: AlertStatus,
    #[serde(deserialize_with = "instant")]
    pub timestamp: DateTime<Utc>,
    /// Raw event payload; its shape is owned by the backend.
    #[serde(default)]
    pub event_details: serde_json::Value,
    #[serde(default)]
    pub analysis_details: AnalysisDetails,
}

/// Aggregate counters served by `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub agents: u64,
    #[serde(default)]
    pub running_agents: u64,
    #[serde(default)]
    pub total_events: u64,
    #[serde(default)]
    pub high_risk_alerts: u64,
    #[serde(default)]
    pub active_alerts: u64,
    #[serde(default)]
    pub critical_alerts: Option<u64>,
}

/// Body of `POST /api/agents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub account_ids: Vec<String>,
}

impl NewAgent {
    /// Build a request from form input, where accounts are a comma separated list.
    pub fn from_form(name: &str, accounts: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            account_ids: accounts
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Reply to a successful `POST /api/agents`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreatedAgent {
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // The backend serializes naive UTC datetimes without an offset.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn optional_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_instant(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_alert_decodes_backend_shape() {
        let alert: Alert = serde_json::from_value(json!({
            "alert_id": "ALT-1",
            "event_id": "EVT10001",
            "account_id": "ACC001",
            "risk_score": 0.91,
            "severity": "CRITICAL",
            "status": "NEW",
            "timestamp": "2024-01-01T12:00:00.250000",
            "event_details": {"amount": 950, "event_type": "transaction"},
            "analysis_details": {
                "fraud_indicators": ["ip_mismatch"],
                "risk_breakdown": {"velocity": "high"},
                "reasoning": "Unusual device",
                "recommended_actions": ["freeze_account"],
                "similar_events_count": 3
            }
        }))
        .unwrap();

        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.status, AlertStatus::New);
        assert_eq!(
            alert.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
                + chrono::Duration::milliseconds(250)
        );
        assert_eq!(alert.analysis_details.similar_events_count, 3);
        assert_eq!(alert.event_details["amount"], 950);
    }

    #[test]
    fn test_agent_accepts_error_status_and_offset_timestamps() {
        let agent: AgentSummary = serde_json::from_value(json!({
            "agent_id": "a1",
            "name": "Demo Agent",
            "status": "error",
            "events_processed": 4,
            "alerts_generated": 1,
            "created_at": "2024-01-01T12:00:00Z",
            "last_activity": null
        }))
        .unwrap();

        assert_eq!(agent.status, AgentStatus::Error);
        assert!(agent.created_at.is_some());
        assert!(agent.last_activity.is_none());
        assert!(agent.account_ids.is_empty());
    }

    #[test]
    fn test_invalid_timestamp_is_a_decode_error() {
        let result = serde_json::from_value::<AnalysisRecord>(json!({
            "event_id": "EVT1",
            "risk_score": 0.2,
            "timestamp": "yesterday",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_agent_from_form_drops_empty_accounts() {
        let agent = NewAgent::from_form("  Night Shift ", "ACC001, ACC002,, ,ACC003");
        assert_eq!(agent.name, "Night Shift");
        assert_eq!(agent.account_ids, vec!["ACC001", "ACC002", "ACC003"]);
    }
}
