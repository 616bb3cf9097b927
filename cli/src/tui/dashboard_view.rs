use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::time::Instant;

use fraudwatch_core::reconcile::{ANALYSES_SUMMARY_KEY, SYSTEM_KEY};
use fraudwatch_core::{FieldKey, Resource, ViewModelStore};

use super::highlight::Highlights;

#[allow(clippy::too_many_arguments)]
fn stat<'a>(
    label: &'a str,
    value: String,
    key: &str,
    resource: Resource,
    field: &'static str,
    base: Color,
    highlights: &Highlights,
    now: Instant,
) -> [Span<'a>; 3] {
    let value_style = highlights.style(
        resource,
        key,
        field,
        now,
        Style::default().fg(base).add_modifier(Modifier::BOLD),
    );
    [
        Span::styled(label, Style::default().fg(Color::Yellow)),
        Span::styled(value, value_style),
        Span::raw("   "),
    ]
}

/// Render the system overview counters.
pub fn render_stats_overview(
    f: &mut Frame,
    area: Rect,
    store: &ViewModelStore,
    highlights: &Highlights,
    now: Instant,
) {
    let line = match store.status() {
        Some(status) => {
            let high_risk = store
                .rendered(&FieldKey::new(
                    Resource::Analyses,
                    ANALYSES_SUMMARY_KEY,
                    "high_risk_count",
                ))
                .unwrap_or("-")
                .to_string();

            let mut spans = Vec::new();
            spans.extend(stat(
                "Agents: ",
                status.agents.to_string(),
                SYSTEM_KEY,
                Resource::Status,
                "agents",
                Color::Green,
                highlights,
                now,
            ));
            spans.extend(stat(
                "Running: ",
                status.running_agents.to_string(),
                SYSTEM_KEY,
                Resource::Status,
                "running_agents",
                Color::Green,
                highlights,
                now,
            ));
            spans.extend(stat(
                "Events: ",
                status.total_events.to_string(),
                SYSTEM_KEY,
                Resource::Status,
                "total_events",
                Color::Cyan,
                highlights,
                now,
            ));
            spans.extend(stat(
                "High-risk alerts: ",
                status.high_risk_alerts.to_string(),
                SYSTEM_KEY,
                Resource::Status,
                "high_risk_alerts",
                if status.high_risk_alerts > 0 {
                    Color::Red
                } else {
                    Color::Green
                },
                highlights,
                now,
            ));
            spans.extend(stat(
                "Active alerts: ",
                status.active_alerts.to_string(),
                SYSTEM_KEY,
                Resource::Status,
                "active_alerts",
                Color::Magenta,
                highlights,
                now,
            ));
            spans.extend(stat(
                "High-risk analyses: ",
                high_risk,
                ANALYSES_SUMMARY_KEY,
                Resource::Analyses,
                "high_risk_count",
                Color::Red,
                highlights,
                now,
            ));
            Line::from(spans)
        }
        None => Line::from(Span::styled(
            "Waiting for system status...",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title("📊 System Overview")
        .border_style(
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(Paragraph::new(line).block(block), area);
}
