use chrono::{DateTime, Duration, TimeZone, Utc};
use fraudwatch_core::model::{
    AgentStatus, AgentSummary, Alert, AlertStatus, AnalysisDetails, AnalysisRecord, Severity,
    SystemStatus,
};
use serde_json::json;
use std::collections::BTreeMap;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn agent(agent_id: &str, status: AgentStatus, events_processed: u64) -> AgentSummary {
    AgentSummary {
        agent_id: agent_id.to_string(),
        name: format!("Agent {agent_id}"),
        status,
        events_processed,
        alerts_generated: 0,
        account_ids: vec!["ACC-001".to_string()],
        created_at: Some(base_time()),
        last_activity: None,
    }
}

pub fn analysis(event_id: &str, risk_score: f64) -> AnalysisRecord {
    AnalysisRecord {
        analysis_id: Some(format!("an-{event_id}")),
        agent_id: Some("a1".to_string()),
        event_id: event_id.to_string(),
        risk_score,
        timestamp: base_time(),
        fraud_indicators: vec!["velocity".to_string()],
        reasoning: "Transaction amount far above the account's rolling average".to_string(),
        recommended_actions: vec!["Review transaction".to_string()],
    }
}

pub fn alert(alert_id: &str, severity: Severity, status: AlertStatus) -> Alert {
    let mut risk_breakdown = BTreeMap::new();
    risk_breakdown.insert("amount".to_string(), "0.9".to_string());
    risk_breakdown.insert("location".to_string(), "0.4".to_string());

    Alert {
        alert_id: alert_id.to_string(),
        event_id: format!("evt-{alert_id}"),
        account_id: "ACC-001".to_string(),
        risk_score: 0.82,
        severity,
        status,
        timestamp: base_time(),
        event_details: json!({
            "amount": 4999.0,
            "merchant": "Electronics Hub",
            "location": "Lagos, NG",
        }),
        analysis_details: AnalysisDetails {
            fraud_indicators: vec!["unusual location".to_string(), "high amount".to_string()],
            risk_breakdown,
            reasoning: "Purchase far from usual location shortly after a login from a new device"
                .to_string(),
            recommended_actions: vec!["Contact account holder".to_string()],
            similar_events_count: 3,
        },
    }
}

pub fn new_alert(alert_id: &str) -> Alert {
    alert(alert_id, Severity::High, AlertStatus::New)
}

/// `count` NEW alerts, newest first, with IDs `alert-01`, `alert-02`, ...
pub fn alerts(count: usize) -> Vec<Alert> {
    (1..=count)
        .map(|i| {
            let mut alert = new_alert(&format!("alert-{i:02}"));
            alert.timestamp = base_time() - Duration::minutes(i as i64);
            alert
        })
        .collect()
}

pub fn status(agents: u64, running_agents: u64) -> SystemStatus {
    SystemStatus {
        status: Some("running".to_string()),
        agents,
        running_agents,
        total_events: 0,
        high_risk_alerts: 0,
        active_alerts: 0,
        critical_alerts: Some(0),
    }
}
