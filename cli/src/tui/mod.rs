pub mod agents_view;
pub mod alert_detail_view;
pub mod alerts_view;
pub mod analyses_view;
pub mod dashboard_view;
pub mod forms;
pub mod highlight;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fraudwatch_core::model::{AgentStatus, Alert};
use fraudwatch_core::{
    AckState, Action, ActionDispatcher, Config, Console, ConsoleError, ConsoleEvent,
    DeleteRequest, NoticeLevel, Poller, Resource, ViewModelStore,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::client::HttpBackend;
use alert_detail_view::DetailState;
use forms::{AgentForm, FormInput};
use highlight::{Highlights, Toasts};

const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    Agents,
    Analyses,
    Alerts,
}

impl Panel {
    fn next(self) -> Self {
        match self {
            Panel::Agents => Panel::Analyses,
            Panel::Analyses => Panel::Alerts,
            Panel::Alerts => Panel::Agents,
        }
    }

    fn prev(self) -> Self {
        match self {
            Panel::Agents => Panel::Alerts,
            Panel::Analyses => Panel::Agents,
            Panel::Alerts => Panel::Analyses,
        }
    }
}

/// At most one overlay at a time; polling never touches it.
enum Modal {
    None,
    Help,
    Detail(DetailState),
    CreateAgent(AgentForm),
    ConfirmDelete(DeleteRequest),
}

/// Results of background work started from the input loop.
enum UiMessage {
    DetailLoaded {
        alert_id: String,
        result: std::result::Result<(Alert, AckState), ConsoleError>,
    },
}

/// Row index for a selection kept by ID. A selection whose row vanished falls back to the
/// first row.
fn selected_index(ids: &[&str], selected: Option<&str>) -> Option<usize> {
    if ids.is_empty() {
        return None;
    }
    selected
        .and_then(|id| ids.iter().position(|candidate| *candidate == id))
        .or(Some(0))
}

/// Move a selection by `delta` rows, clamped to the list.
fn step(ids: &[&str], selected: Option<&str>, delta: isize) -> Option<String> {
    let current = selected_index(ids, selected)?;
    let last = ids.len() as isize - 1;
    let next = (current as isize + delta).clamp(0, last) as usize;
    Some(ids[next].to_string())
}

struct App {
    console: Console,
    dispatcher: ActionDispatcher,
    poller: Poller,
    runtime: Handle,
    events: broadcast::Receiver<ConsoleEvent>,
    messages_tx: mpsc::UnboundedSender<UiMessage>,
    messages: mpsc::UnboundedReceiver<UiMessage>,
    server_url: String,
    poll_interval: Duration,

    focus: Panel,
    // Selections are stable IDs so they survive re-renders and reordering.
    selected_agent: Option<String>,
    selected_alert: Option<String>,
    analyses_offset: usize,
    modal: Modal,

    highlights: Highlights,
    toasts: Toasts,
    should_quit: bool,
}

impl App {
    fn new(console: Console, poller: Poller, config: &Config, runtime: Handle) -> Self {
        let (messages_tx, messages) = mpsc::unbounded_channel();
        Self {
            events: console.subscribe(),
            dispatcher: ActionDispatcher::new(console.clone()),
            console,
            poller,
            runtime,
            messages_tx,
            messages,
            server_url: config.console.server_url.clone(),
            poll_interval: config.console.poll_interval(),
            focus: Panel::Agents,
            selected_agent: None,
            selected_alert: None,
            analyses_offset: 0,
            modal: Modal::None,
            highlights: Highlights::default(),
            toasts: Toasts::default(),
            should_quit: false,
        }
    }

    fn agent_ids(&self) -> Vec<String> {
        self.console.read(|store| {
            store
                .agents()
                .iter()
                .map(|agent| agent.agent_id.clone())
                .collect()
        })
    }

    fn displayed_alert_ids(&self) -> Vec<String> {
        self.console.read(|store| {
            store
                .displayed_alerts()
                .iter()
                .map(|view| view.alert.alert_id.clone())
                .collect()
        })
    }

    fn current_agent(&self) -> Option<String> {
        let ids = self.agent_ids();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        selected_index(&refs, self.selected_agent.as_deref()).map(|idx| ids[idx].clone())
    }

    fn current_alert(&self) -> Option<String> {
        let ids = self.displayed_alert_ids();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        selected_index(&refs, self.selected_alert.as_deref()).map(|idx| ids[idx].clone())
    }

    fn move_selection(&mut self, delta: isize) {
        match self.focus {
            Panel::Agents => {
                let ids = self.agent_ids();
                let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
                self.selected_agent = step(&refs, self.selected_agent.as_deref(), delta);
            }
            Panel::Alerts => {
                let ids = self.displayed_alert_ids();
                let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
                self.selected_alert = step(&refs, self.selected_alert.as_deref(), delta);
            }
            Panel::Analyses => {
                let len = self.console.read(|store| store.analyses().len());
                let last = len.saturating_sub(1) as isize;
                self.analyses_offset =
                    (self.analyses_offset as isize + delta).clamp(0, last) as usize;
            }
        }
    }

    /// Drain console notifications and background results without blocking.
    fn pump(&mut self) {
        let now = Instant::now();
        loop {
            match self.events.try_recv() {
                Ok(ConsoleEvent::FieldChanged(change)) => self.highlights.pulse(change.field, now),
                Ok(ConsoleEvent::Notice(notice)) => self.toasts.push(notice, now),
                Ok(ConsoleEvent::Refreshed(_)) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "console events lagged");
                }
                Err(_) => break,
            }
        }

        while let Ok(message) = self.messages.try_recv() {
            self.on_message(message);
        }

        self.highlights.prune(now);
        self.toasts.prune(now);
    }

    fn on_message(&mut self, message: UiMessage) {
        match message {
            UiMessage::DetailLoaded { alert_id, result } => {
                let Modal::Detail(detail) = &mut self.modal else {
                    return;
                };
                // The modal may have been reopened for another alert meanwhile.
                if detail.alert_id != alert_id {
                    return;
                }
                detail.loading = false;
                match result {
                    Ok((alert, _)) => {
                        detail.alert = Some(alert);
                        detail.error = None;
                    }
                    Err(e) => detail.error = Some(e.to_string()),
                }
            }
        }
    }

    fn dispatch(&self, action: Action) {
        let dispatcher = self.dispatcher.clone();
        self.runtime.spawn(async move {
            // Failures already reach the user as notices.
            if let Err(e) = dispatcher.dispatch(action).await {
                debug!("action failed: {}", e);
            }
        });
    }

    fn refresh(&self) {
        let cycle = self.poller.refresh_now();
        let console = self.console.clone();
        self.runtime.spawn(async move {
            match cycle.await {
                Ok(report) if report.is_clean() => {
                    console.notify(NoticeLevel::Info, "Dashboard refreshed!");
                }
                Ok(report) => {
                    let failed: Vec<String> =
                        report.failed().iter().map(ToString::to_string).collect();
                    console.notify(
                        NoticeLevel::Warning,
                        format!("Refresh incomplete: {} unavailable", failed.join(", ")),
                    );
                }
                Err(e) => debug!("refresh cycle did not complete: {}", e),
            }
        });
    }

    fn toggle_selected_agent(&self) {
        let Some(agent_id) = self.current_agent() else {
            return;
        };
        let status = self
            .console
            .read(|store| store.agent(&agent_id).map(|agent| agent.status));
        let action = match status {
            Some(AgentStatus::Running) => Action::StopAgent(agent_id),
            Some(_) => Action::StartAgent(agent_id),
            None => return,
        };
        self.dispatch(action);
    }

    fn request_delete_selected(&mut self) {
        if let Some(agent_id) = self.current_agent() {
            self.modal = Modal::ConfirmDelete(self.dispatcher.request_delete(&agent_id));
        }
    }

    fn confirm_delete(&self, request: DeleteRequest) {
        let dispatcher = self.dispatcher.clone();
        self.runtime.spawn(async move {
            if let Err(e) = dispatcher.confirm_delete(request).await {
                debug!("delete failed: {}", e);
            }
        });
    }

    fn acknowledge_selected(&self) {
        if let Some(alert_id) = self.current_alert() {
            self.dispatch(Action::AcknowledgeAlert(alert_id));
        }
    }

    fn open_detail(&mut self) {
        let Some(alert_id) = self.current_alert() else {
            return;
        };
        let cached = self.console.alert(&alert_id).map(|(alert, _)| alert);
        self.modal = Modal::Detail(DetailState::new(alert_id.clone(), cached));

        let console = self.console.clone();
        let tx = self.messages_tx.clone();
        self.runtime.spawn(async move {
            let result = console.alert_details(&alert_id).await;
            let _ = tx.send(UiMessage::DetailLoaded { alert_id, result });
        });
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.modal {
            Modal::None => self.on_main_key(key),
            Modal::Help => {
                if matches!(
                    key.code,
                    KeyCode::Char('?') | KeyCode::F(1) | KeyCode::Esc | KeyCode::Char('q')
                ) {
                    self.modal = Modal::None;
                }
            }
            Modal::Detail(_) => self.on_detail_key(key),
            Modal::CreateAgent(_) => self.on_form_key(key),
            Modal::ConfirmDelete(_) => self.on_confirm_key(key),
        }
    }

    fn on_main_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Char('?') | KeyCode::F(1) => self.modal = Modal::Help,
            // Plain `r` and Ctrl+R both land here.
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('n') => self.modal = Modal::CreateAgent(AgentForm::default()),
            KeyCode::Char('s') if self.focus == Panel::Agents => self.toggle_selected_agent(),
            KeyCode::Char('d') if self.focus == Panel::Agents => self.request_delete_selected(),
            KeyCode::Char('a') if self.focus == Panel::Alerts => self.acknowledge_selected(),
            KeyCode::Enter if self.focus == Panel::Alerts => self.open_detail(),
            _ => {}
        }
    }

    fn on_detail_key(&mut self, key: KeyEvent) {
        let Modal::Detail(detail) = &mut self.modal else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => self.modal = Modal::None,
            KeyCode::Char('j') | KeyCode::Down => detail.scroll = detail.scroll.saturating_add(1),
            KeyCode::Char('k') | KeyCode::Up => detail.scroll = detail.scroll.saturating_sub(1),
            KeyCode::Char('a') => {
                let alert_id = detail.alert_id.clone();
                let state = self.console.read(|store| store.alert_state(&alert_id));
                if alert_detail_view::can_acknowledge(state) {
                    self.dispatch(Action::AcknowledgeAlert(alert_id));
                }
            }
            _ => {}
        }
    }

    fn on_form_key(&mut self, key: KeyEvent) {
        let Modal::CreateAgent(form) = &mut self.modal else {
            return;
        };
        match form.handle_key(key) {
            FormInput::Editing => {}
            FormInput::Cancel => self.modal = Modal::None,
            FormInput::Invalid(message) => self.console.notify(NoticeLevel::Warning, message),
            FormInput::Submit(agent) => {
                self.modal = Modal::None;
                self.dispatch(Action::CreateAgent(agent));
            }
        }
    }

    fn on_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Modal::ConfirmDelete(request) = std::mem::replace(&mut self.modal, Modal::None)
                {
                    self.confirm_delete(request);
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.modal = Modal::None,
            _ => {}
        }
    }
}

pub async fn launch_tui(config: Config) -> Result<()> {
    // Print before entering TUI mode
    println!("Starting Fraudwatch console...");
    println!("Connecting to: {}", config.console.server_url);

    let backend = Arc::new(HttpBackend::new(&config.console.server_url));
    let console = Console::new(backend, &config.console);
    let poller = Poller::from_config(console.clone(), &config.console);

    // Subscribe before the first cycle so its notices are not lost.
    let mut app = App::new(console, poller, &config, Handle::current());
    app.poller.start(config.console.poll_interval());
    app.console
        .notify(NoticeLevel::Info, "🕵️ Fraudwatch is online!");

    tokio::task::spawn_blocking(move || run_terminal(app)).await??;
    Ok(())
}

fn run_terminal(mut app: App) -> Result<()> {
    let runtime = app.runtime.clone();
    let _guard = runtime.enter();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    app.poller.stop();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!(cycles = app.poller.cycles_started(), "console closed");
    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.pump();
        terminal.draw(|f| ui(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        // Non-blocking event check
        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                app.on_key(key);
            }
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = (area.width * percent_x) / 100;
    let height = (area.height * percent_y) / 100;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_help_modal(f: &mut Frame) {
    let modal_area = centered_rect(60, 70, f.size());

    let help_text = vec![
        "🕵️ FRAUDWATCH - KEYBOARD SHORTCUTS",
        "",
        "┌─ NAVIGATION ─────────────────────────────────────────┐",
        "│  Tab / Shift+Tab  Focus next / previous panel         │",
        "│  j / k / ↑↓       Move selection in focused panel     │",
        "└──────────────────────────────────────────────────────┘",
        "",
        "┌─ AGENTS PANEL ───────────────────────────────────────┐",
        "│  s                Start or stop the selected agent    │",
        "│  d                Delete the selected agent (asks)    │",
        "│  n                Create a new agent                  │",
        "└──────────────────────────────────────────────────────┘",
        "",
        "┌─ ALERTS PANEL ───────────────────────────────────────┐",
        "│  a                Acknowledge the selected alert      │",
        "│  Enter            Open alert details (a acknowledges) │",
        "└──────────────────────────────────────────────────────┘",
        "",
        "┌─ GENERAL ────────────────────────────────────────────┐",
        "│  r / Ctrl+R       Refresh now (timer keeps its pace)  │",
        "│  ? / F1           Toggle this help screen             │",
        "│  Esc              Close the open dialog               │",
        "│  q                Quit                                │",
        "└──────────────────────────────────────────────────────┘",
    ];

    f.render_widget(Clear, modal_area);

    let help_widget = Paragraph::new(help_text.join("\n"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("📖 Help")
                .style(Style::default().bg(Color::Black).fg(Color::Cyan)),
        )
        .style(Style::default().bg(Color::Black).fg(Color::White))
        .wrap(Wrap { trim: false });

    f.render_widget(help_widget, modal_area);
}

fn render_header(f: &mut Frame, area: Rect, app: &App, store: &ViewModelStore) {
    let updated = Resource::ALL
        .iter()
        .filter_map(|resource| store.last_updated(*resource))
        .max()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "connecting...".to_string());

    let mut spans = vec![
        Span::styled(
            "🕵️ Fraudwatch",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " | {} | every {}s | updated {}",
            app.server_url,
            app.poll_interval.as_secs_f32(),
            updated
        )),
    ];
    if let Some(health) = store.status().and_then(|status| status.status.as_deref()) {
        spans.push(Span::raw(format!(" | backend {health}")));
    }
    let pending = store.pending_count();
    if pending > 0 {
        spans.push(Span::styled(
            format!(" | {pending} ack pending"),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_toasts(f: &mut Frame, area: Rect, toasts: &Toasts) {
    let width = area.width.min(50);
    for (i, toast) in toasts.iter().enumerate() {
        let y = 1 + (i as u16) * 3;
        if y + 3 > area.height || width < 4 {
            break;
        }
        let rect = Rect {
            x: area.width - width,
            y,
            width,
            height: 3,
        };
        let color = highlight::level_color(toast.notice.level);
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(toast.notice.message.as_str())
                .style(Style::default().fg(color))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color)),
                ),
            rect,
        );
    }
}

fn ui(f: &mut Frame, app: &App) {
    let now = Instant::now();
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(size);

    app.console.read(|store| {
        render_header(f, chunks[0], app, store);
        dashboard_view::render_stats_overview(f, chunks[1], store, &app.highlights, now);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[2]);
        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(main_chunks[1]);

        let agents = store.agents();
        let agent_ids: Vec<&str> = agents.iter().map(|a| a.agent_id.as_str()).collect();
        agents_view::render_agents_list(
            f,
            main_chunks[0],
            agents,
            selected_index(&agent_ids, app.selected_agent.as_deref()),
            app.focus == Panel::Agents,
            &app.highlights,
            now,
        );

        analyses_view::render_analyses_list(
            f,
            right_chunks[0],
            store.analyses(),
            app.analyses_offset,
            app.focus == Panel::Analyses,
        );

        let alerts = store.displayed_alerts();
        let alert_ids: Vec<&str> = alerts.iter().map(|v| v.alert.alert_id.as_str()).collect();
        alerts_view::render_alerts_list(
            f,
            right_chunks[1],
            &alerts,
            store.alerts().len(),
            selected_index(&alert_ids, app.selected_alert.as_deref()),
            app.focus == Panel::Alerts,
            &app.highlights,
            now,
        );

        let footer = Paragraph::new(
            "q quit · ? help · r refresh · Tab focus · j/k select · n new agent",
        )
        .style(Style::default().fg(Color::DarkGray));
        f.render_widget(footer, chunks[3]);

        match &app.modal {
            Modal::None => {}
            Modal::Help => render_help_modal(f),
            Modal::Detail(detail) => alert_detail_view::render_alert_detail(
                f,
                centered_rect(70, 80, size),
                detail,
                store.alert_state(&detail.alert_id),
            ),
            Modal::CreateAgent(form) => {
                forms::render_agent_form(f, centered_rect(50, 30, size), form)
            }
            Modal::ConfirmDelete(request) => forms::render_delete_confirm(
                f,
                centered_rect(40, 20, size),
                request,
                store.agent(request.agent_id()).map(|a| a.name.as_str()),
            ),
        }
    });

    render_toasts(f, size, &app.toasts);
}
