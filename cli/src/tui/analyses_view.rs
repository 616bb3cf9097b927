use fraudwatch_core::model::AnalysisRecord;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

const REASONING_PREVIEW: usize = 60;

pub fn risk_color(risk_score: f64) -> Color {
    if risk_score > 0.7 {
        Color::Red
    } else if risk_score > 0.5 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= REASONING_PREVIEW {
        text.to_string()
    } else {
        let cut: String = text.chars().take(REASONING_PREVIEW).collect();
        format!("{cut}...")
    }
}

/// Recent analyses in server order.
pub fn render_analyses_list(
    f: &mut Frame,
    area: Rect,
    analyses: &[AnalysisRecord],
    offset: usize,
    focused: bool,
) {
    let title = if focused {
        format!("🔎 Recent Analyses ({}) [j/k] ●", analyses.len())
    } else {
        format!("🔎 Recent Analyses ({})", analyses.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        });

    if analyses.is_empty() {
        let widget = Paragraph::new("No analyses yet")
            .block(block)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(widget, area);
        return;
    }

    let items: Vec<ListItem> = analyses
        .iter()
        .map(|analysis| {
            let header = Line::from(vec![
                Span::styled(
                    analysis.event_id.as_str(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("{:.2}", analysis.risk_score),
                    Style::default()
                        .fg(risk_color(analysis.risk_score))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {}", analysis.timestamp.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            let reasoning = Line::from(Span::styled(
                format!("  {}", preview(&analysis.reasoning)),
                Style::default().fg(Color::Gray),
            ));
            let actions = Line::from(vec![
                Span::styled("  Actions: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(analysis.recommended_actions.join(", ")),
            ]);

            ListItem::new(vec![header, reasoning, actions])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    if focused {
        state.select(Some(offset.min(analyses.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_reasoning() {
        let long = "x".repeat(80);
        assert_eq!(preview(&long).len(), REASONING_PREVIEW + 3);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_risk_color_bands() {
        assert_eq!(risk_color(0.85), Color::Red);
        assert_eq!(risk_color(0.6), Color::Yellow);
        assert_eq!(risk_color(0.7), Color::Yellow);
        assert_eq!(risk_color(0.2), Color::Green);
    }
}
