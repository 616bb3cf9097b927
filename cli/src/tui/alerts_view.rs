use fraudwatch_core::model::{AlertStatus, Severity};
use fraudwatch_core::{AckState, AlertView, Resource};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::time::Instant;

use super::highlight::Highlights;

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Critical => Color::Red,
        Severity::High => Color::LightRed,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Blue,
    }
}

pub fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🚨",
        Severity::High => "🔴",
        Severity::Medium => "⚠️ ",
        Severity::Low => "ℹ️ ",
    }
}

/// Badge text for the effective status; a pending acknowledgment is marked.
pub fn status_badge(view: &AlertView<'_>) -> (String, Color) {
    match (view.status(), view.state) {
        (AlertStatus::New, _) => ("NEW".to_string(), Color::Red),
        (AlertStatus::Acknowledged, AckState::PendingAck) => {
            ("ACKNOWLEDGED…".to_string(), Color::Yellow)
        }
        (AlertStatus::Acknowledged, _) => ("ACKNOWLEDGED".to_string(), Color::Green),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn render_alerts_list(
    f: &mut Frame,
    area: Rect,
    alerts: &[AlertView<'_>],
    total: usize,
    selected: Option<usize>,
    focused: bool,
    highlights: &Highlights,
    now: Instant,
) {
    let counts = if total > alerts.len() {
        format!("{} of {}", alerts.len(), total)
    } else {
        total.to_string()
    };
    let title = if focused {
        format!("🚨 Active Alerts ({counts}) [a ack · Enter details] ●")
    } else {
        format!("🚨 Active Alerts ({counts})")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        });

    if alerts.is_empty() {
        let widget = Paragraph::new("✅ No active alerts")
            .block(block)
            .style(Style::default().fg(Color::Green));
        f.render_widget(widget, area);
        return;
    }

    let items: Vec<ListItem> = alerts
        .iter()
        .map(|view| {
            let alert = view.alert;
            let id = alert.alert_id.as_str();
            let (badge, badge_color) = status_badge(view);

            let line = Line::from(vec![
                Span::raw(format!("{} ", severity_icon(alert.severity))),
                Span::styled(
                    format!("{:<8}", alert.severity.as_str()),
                    highlights.style(
                        Resource::Alerts,
                        id,
                        "severity",
                        now,
                        Style::default()
                            .fg(severity_color(alert.severity))
                            .add_modifier(Modifier::BOLD),
                    ),
                ),
                Span::raw(format!(" {} ", alert.account_id)),
                Span::styled(
                    format!("{:.2}", alert.risk_score),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("[{badge}]"),
                    highlights.style(
                        Resource::Alerts,
                        id,
                        "status",
                        now,
                        Style::default().fg(badge_color),
                    ),
                ),
                Span::styled(
                    format!(" {}", alert.timestamp.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);

            ListItem::new(line)
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = ListState::default();
    state.select(selected);
    f.render_stateful_widget(list, area, &mut state);
}
