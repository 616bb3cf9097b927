use fraudwatch_core::model::{Alert, AlertStatus};
use fraudwatch_core::{AckState, AlertView};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::alerts_view::{severity_color, status_badge};

/// Contents of the alert detail modal.
#[derive(Debug, Clone)]
pub struct DetailState {
    pub alert_id: String,
    pub alert: Option<Alert>,
    pub loading: bool,
    pub error: Option<String>,
    pub scroll: u16,
}

impl DetailState {
    pub fn new(alert_id: String, cached: Option<Alert>) -> Self {
        Self {
            alert_id,
            alert: cached,
            loading: true,
            error: None,
            scroll: 0,
        }
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
}

fn bullet_list(items: &[String]) -> Vec<Line<'static>> {
    if items.is_empty() {
        return vec![Line::from("  none")];
    }
    items.iter().map(|item| Line::from(format!("  • {item}"))).collect()
}

/// Whether the modal offers acknowledging. An alert that left the store is read-only.
pub fn can_acknowledge(state: Option<AckState>) -> bool {
    state == Some(AckState::New)
}

fn hint(state: Option<AckState>) -> &'static str {
    if can_acknowledge(state) {
        "[a] acknowledge   [j/k] scroll   [Esc] close"
    } else {
        "[j/k] scroll   [Esc] close"
    }
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<14}"), Style::default().fg(Color::Yellow)),
        Span::raw(value),
    ])
}

/// Render the detail modal. `state` is the acknowledgment state from the store so the
/// optimistic overlay shows here as in the list.
pub fn render_alert_detail(f: &mut Frame, area: Rect, detail: &DetailState, state: Option<AckState>) {
    f.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();

    match &detail.alert {
        Some(alert) => {
            let listed = state.is_some();
            let view = AlertView {
                alert,
                state: state.unwrap_or(match alert.status {
                    AlertStatus::New => AckState::New,
                    AlertStatus::Acknowledged => AckState::Acknowledged,
                }),
            };
            let (badge, badge_color) = status_badge(&view);

            lines.push(field("Alert", alert.alert_id.clone()));
            lines.push(field("Event", alert.event_id.clone()));
            lines.push(field("Account", alert.account_id.clone()));
            lines.push(Line::from(vec![
                Span::styled(format!("{:<14}", "Severity"), Style::default().fg(Color::Yellow)),
                Span::styled(
                    alert.severity.as_str(),
                    Style::default()
                        .fg(severity_color(alert.severity))
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            lines.push(field("Risk score", format!("{:.2}", alert.risk_score)));
            lines.push(Line::from(vec![
                Span::styled(format!("{:<14}", "Status"), Style::default().fg(Color::Yellow)),
                Span::styled(badge, Style::default().fg(badge_color)),
                Span::styled(
                    if listed { "" } else { "  (no longer in the alert list)" },
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            lines.push(field(
                "Timestamp",
                alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ));

            let analysis = &alert.analysis_details;
            lines.push(Line::from(""));
            lines.push(heading("Fraud indicators"));
            lines.extend(bullet_list(&analysis.fraud_indicators));

            lines.push(Line::from(""));
            lines.push(heading("Risk breakdown"));
            if analysis.risk_breakdown.is_empty() {
                lines.push(Line::from("  none"));
            }
            for (factor, value) in &analysis.risk_breakdown {
                lines.push(Line::from(format!("  {factor}: {value}")));
            }

            lines.push(Line::from(""));
            lines.push(heading("Reasoning"));
            lines.push(Line::from(format!("  {}", analysis.reasoning)));

            lines.push(Line::from(""));
            lines.push(heading("Recommended actions"));
            lines.extend(bullet_list(&analysis.recommended_actions));
            lines.push(field(
                "Similar events",
                analysis.similar_events_count.to_string(),
            ));

            lines.push(Line::from(""));
            lines.push(heading("Event details"));
            let event = serde_json::to_string_pretty(&alert.event_details)
                .unwrap_or_else(|_| alert.event_details.to_string());
            lines.extend(event.lines().map(|line| Line::from(format!("  {line}"))));

            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                hint(state),
                Style::default().fg(Color::DarkGray),
            )));
        }
        None if detail.loading => lines.push(Line::from("Loading alert details...")),
        None => lines.push(Line::from(Span::styled(
            format!(
                "Alert details unavailable: {}",
                detail.error.as_deref().unwrap_or("unknown alert")
            ),
            Style::default().fg(Color::Red),
        ))),
    }

    if let (Some(error), Some(_)) = (&detail.error, &detail.alert) {
        lines.insert(
            0,
            Line::from(Span::styled(
                format!("(showing last polled copy: {error})"),
                Style::default().fg(Color::DarkGray),
            )),
        );
    }

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("🔍 Alert {}", detail.alert_id))
                .style(Style::default().bg(Color::Black).fg(Color::Cyan)),
        )
        .style(Style::default().bg(Color::Black).fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((detail.scroll, 0));

    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_listed_new_alerts_offer_acknowledge() {
        assert!(can_acknowledge(Some(AckState::New)));
        assert!(!can_acknowledge(Some(AckState::PendingAck)));
        assert!(!can_acknowledge(Some(AckState::Acknowledged)));
        assert!(!can_acknowledge(None));
    }

    #[test]
    fn test_alert_gone_from_store_hides_the_ack_hint() {
        assert!(hint(Some(AckState::New)).contains("[a] acknowledge"));
        assert!(!hint(None).contains("[a]"));
        assert!(!hint(Some(AckState::Acknowledged)).contains("[a]"));
    }
}
