use fraudwatch_core::{FieldKey, Notice, NoticeLevel, Resource};
use ratatui::style::{Color, Modifier, Style};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// How long a changed field stays emphasized.
pub const PULSE: Duration = Duration::from_millis(300);
pub const TOAST_TTL: Duration = Duration::from_secs(3);
const MAX_TOASTS: usize = 4;

/// Fields that changed recently, fed from the console's change notifications.
#[derive(Debug, Default)]
pub struct Highlights {
    pulses: HashMap<FieldKey, Instant>,
}

impl Highlights {
    pub fn pulse(&mut self, field: FieldKey, now: Instant) {
        self.pulses.insert(field, now);
    }

    pub fn is_active(&self, resource: Resource, key: &str, field: &'static str, now: Instant) -> bool {
        self.pulses
            .get(&FieldKey::new(resource, key, field))
            .map(|at| now.saturating_duration_since(*at) < PULSE)
            .unwrap_or(false)
    }

    /// `base`, emphasized while the field is pulsing.
    pub fn style(
        &self,
        resource: Resource,
        key: &str,
        field: &'static str,
        now: Instant,
        base: Style,
    ) -> Style {
        if self.is_active(resource, key, field, now) {
            base.fg(Color::LightGreen).add_modifier(Modifier::BOLD)
        } else {
            base
        }
    }

    pub fn prune(&mut self, now: Instant) {
        self.pulses
            .retain(|_, at| now.saturating_duration_since(*at) < PULSE);
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    pub shown_at: Instant,
}

/// Transient notices, newest last.
#[derive(Debug, Default)]
pub struct Toasts {
    queue: VecDeque<Toast>,
}

impl Toasts {
    pub fn push(&mut self, notice: Notice, now: Instant) {
        if self.queue.len() == MAX_TOASTS {
            self.queue.pop_front();
        }
        self.queue.push_back(Toast {
            notice,
            shown_at: now,
        });
    }

    pub fn prune(&mut self, now: Instant) {
        self.queue
            .retain(|toast| now.saturating_duration_since(toast.shown_at) < TOAST_TTL);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

pub fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    }
}
