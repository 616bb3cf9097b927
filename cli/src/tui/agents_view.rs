use fraudwatch_core::model::{AgentStatus, AgentSummary};
use fraudwatch_core::Resource;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::time::Instant;

use super::highlight::Highlights;

fn status_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Running => Color::Green,
        AgentStatus::Stopped => Color::Gray,
        AgentStatus::Error => Color::Red,
    }
}

fn status_label(status: AgentStatus) -> String {
    let raw = status.as_str();
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_agents_list(
    f: &mut Frame,
    area: Rect,
    agents: &[AgentSummary],
    selected: Option<usize>,
    focused: bool,
    highlights: &Highlights,
    now: Instant,
) {
    let title = if focused {
        format!("🤖 Agents ({}) [s start/stop · d delete · n new] ●", agents.len())
    } else {
        format!("🤖 Agents ({})", agents.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        });

    if agents.is_empty() {
        let widget = Paragraph::new("No agents. Press n to create one.")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(widget, area);
        return;
    }

    let items: Vec<ListItem> = agents
        .iter()
        .map(|agent| {
            let id = agent.agent_id.as_str();
            let pulse = |field: &'static str, base: Style| {
                highlights.style(Resource::Agents, id, field, now, base)
            };

            let header = Line::from(vec![
                Span::styled(
                    agent.name.as_str(),
                    pulse("name", Style::default().add_modifier(Modifier::BOLD)),
                ),
                Span::raw("  "),
                Span::styled(
                    format!("[{}]", status_label(agent.status)),
                    pulse("status", Style::default().fg(status_color(agent.status))),
                ),
            ]);
            let counters = Line::from(vec![
                Span::styled("  Events: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    agent.events_processed.to_string(),
                    pulse("events_processed", Style::default()),
                ),
                Span::styled(" | Alerts: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    agent.alerts_generated.to_string(),
                    pulse("alerts_generated", Style::default()),
                ),
            ]);

            ListItem::new(vec![header, counters])
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label_is_capitalized() {
        assert_eq!(status_label(AgentStatus::Running), "Running");
        assert_eq!(status_label(AgentStatus::Error), "Error");
    }
}
