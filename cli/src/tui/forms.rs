use crossterm::event::{KeyCode, KeyEvent};
use fraudwatch_core::model::NewAgent;
use fraudwatch_core::DeleteRequest;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Name,
    Accounts,
}

/// What a key press did to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormInput {
    Editing,
    Cancel,
    Submit(NewAgent),
    Invalid(&'static str),
}

/// Create-agent form: a name and a comma-separated account list.
#[derive(Debug, Clone, Default)]
pub struct AgentForm {
    pub name: String,
    pub accounts: String,
    pub field: FormField,
}

impl AgentForm {
    fn focused_buffer(&mut self) -> &mut String {
        match self.field {
            FormField::Name => &mut self.name,
            FormField::Accounts => &mut self.accounts,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormInput {
        match key.code {
            KeyCode::Esc => FormInput::Cancel,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.field = match self.field {
                    FormField::Name => FormField::Accounts,
                    FormField::Accounts => FormField::Name,
                };
                FormInput::Editing
            }
            KeyCode::Enter => {
                if self.name.trim().is_empty() {
                    FormInput::Invalid("Agent name is required")
                } else {
                    FormInput::Submit(NewAgent::from_form(&self.name, &self.accounts))
                }
            }
            KeyCode::Backspace => {
                self.focused_buffer().pop();
                FormInput::Editing
            }
            KeyCode::Char(ch) => {
                self.focused_buffer().push(ch);
                FormInput::Editing
            }
            _ => FormInput::Editing,
        }
    }
}

fn input_line<'a>(label: &'a str, value: &'a str, focused: bool) -> Line<'a> {
    let style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label:<12}"), Style::default().fg(Color::Yellow)),
        Span::styled(value, style),
        Span::styled(cursor, style),
    ])
}

pub fn render_agent_form(f: &mut Frame, area: Rect, form: &AgentForm) {
    f.render_widget(Clear, area);

    let lines = vec![
        input_line("Name", &form.name, form.field == FormField::Name),
        Line::from(""),
        input_line("Accounts", &form.accounts, form.field == FormField::Accounts),
        Line::from(Span::styled(
            "            comma-separated, e.g. ACC-1, ACC-2",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "[Tab] next field   [Enter] create   [Esc] cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("➕ New Agent")
                .style(Style::default().bg(Color::Black).fg(Color::Cyan)),
        )
        .style(Style::default().bg(Color::Black).fg(Color::White))
        .wrap(Wrap { trim: false });

    f.render_widget(widget, area);
}

pub fn render_delete_confirm(f: &mut Frame, area: Rect, request: &DeleteRequest, name: Option<&str>) {
    f.render_widget(Clear, area);

    let target = match name {
        Some(name) => format!("{} ({})", name, request.agent_id()),
        None => request.agent_id().to_string(),
    };
    let lines = vec![
        Line::from(Span::styled(
            format!("Delete agent {target}?"),
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "[y] delete   [n/Esc] keep",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("🗑️  Confirm")
                .style(Style::default().bg(Color::Black).fg(Color::Red)),
        )
        .style(Style::default().bg(Color::Black).fg(Color::White))
        .wrap(Wrap { trim: false });

    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut AgentForm, text: &str) {
        for ch in text.chars() {
            form.handle_key(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn test_form_submits_trimmed_accounts() {
        let mut form = AgentForm::default();
        type_text(&mut form, "Night Watch");
        form.handle_key(key(KeyCode::Tab));
        type_text(&mut form, " ACC-1, ,ACC-2 ");

        match form.handle_key(key(KeyCode::Enter)) {
            FormInput::Submit(agent) => {
                assert_eq!(agent.name, "Night Watch");
                assert_eq!(agent.account_ids, vec!["ACC-1", "ACC-2"]);
            }
            other => panic!("unexpected form input: {:?}", other),
        }
    }

    #[test]
    fn test_form_requires_name() {
        let mut form = AgentForm::default();
        assert_eq!(
            form.handle_key(key(KeyCode::Enter)),
            FormInput::Invalid("Agent name is required")
        );
    }

    #[test]
    fn test_backspace_edits_focused_field() {
        let mut form = AgentForm::default();
        type_text(&mut form, "ab");
        form.handle_key(key(KeyCode::Backspace));
        assert_eq!(form.name, "a");
        assert_eq!(form.handle_key(key(KeyCode::Esc)), FormInput::Cancel);
    }
}
