use crate::backend::Backend;
use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::model::{Alert, AlertStatus};
use crate::reconcile::{Reconciler, Reconciliation, Snapshot};
use crate::store::{AckState, FieldChange, Resource, ViewModelStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Everything a rendering surface needs to react to besides the store itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    FieldChanged(FieldChange),
    Notice(Notice),
    Refreshed(Resource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { changes: usize },
    Failed(ConsoleError),
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { .. })
    }
}

/// Per-resource results of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub outcomes: BTreeMap<Resource, RefreshOutcome>,
}

impl CycleReport {
    pub fn outcome(&self, resource: Resource) -> Option<&RefreshOutcome> {
        self.outcomes.get(&resource)
    }

    pub fn failed(&self) -> Vec<Resource> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_updated())
            .map(|(resource, _)| *resource)
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failed().is_empty()
    }
}

/// Shared synchronization engine: owns the store and the backend handle.
///
/// Cheap to clone; the poller, the dispatcher and the rendering surface all hold one.
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

struct ConsoleInner {
    backend: Arc<dyn Backend>,
    store: RwLock<ViewModelStore>,
    reconciler: Reconciler,
    events: broadcast::Sender<ConsoleEvent>,
}

impl Console {
    pub fn new(backend: Arc<dyn Backend>, config: &ConsoleConfig) -> Self {
        Self::with_parts(
            backend,
            ViewModelStore::new(config.alert_display_limit),
            Reconciler::from_config(config),
        )
    }

    pub fn with_parts(
        backend: Arc<dyn Backend>,
        store: ViewModelStore,
        reconciler: Reconciler,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ConsoleInner {
                backend,
                store: RwLock::new(store),
                reconciler,
                events,
            }),
        }
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.inner.backend)
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.inner.reconciler
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.inner.events.subscribe()
    }

    /// Run `f` against the current store.
    pub fn read<R>(&self, f: impl FnOnce(&ViewModelStore) -> R) -> R {
        let store = self.inner.store.read();
        f(&store)
    }

    /// Run `f` with exclusive access to the store. Never held across an await.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut ViewModelStore, &Reconciler) -> R) -> R {
        let mut store = self.inner.store.write();
        f(&mut store, &self.inner.reconciler)
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(ConsoleEvent::Notice(Notice {
            level,
            message: message.into(),
        }));
    }

    pub(crate) fn emit_changes(&self, changes: Vec<FieldChange>) {
        for change in changes {
            self.emit(ConsoleEvent::FieldChanged(change));
        }
    }

    fn emit(&self, event: ConsoleEvent) {
        // No subscribers is fine; the store is the source of truth.
        let _ = self.inner.events.send(event);
    }

    /// Apply a snapshot and publish the resulting change notifications.
    pub fn apply(&self, snapshot: Snapshot) -> Reconciliation {
        let resource = snapshot.resource();
        let result = self.write(|store, reconciler| reconciler.apply(store, snapshot));

        for alert_id in &result.settled.expired {
            self.notify(
                NoticeLevel::Warning,
                format!("Acknowledgment of alert {alert_id} was never confirmed"),
            );
        }
        self.emit_changes(result.changes.clone());
        self.emit(ConsoleEvent::Refreshed(resource));
        result
    }

    /// Fetch and reconcile a single resource. Failures leave the store untouched.
    pub async fn refresh(&self, resource: Resource) -> RefreshOutcome {
        match self.fetch(resource).await {
            Ok(snapshot) => {
                let result = self.apply(snapshot);
                RefreshOutcome::Updated {
                    changes: result.changes.len(),
                }
            }
            Err(e) => {
                warn!(resource = %resource, kind = e.kind(), "refresh failed: {}", e);
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// One poll cycle: all resources fetched concurrently, each reconciled on its own.
    pub async fn run_cycle(&self) -> CycleReport {
        let (status, agents, analyses, alerts) = futures::join!(
            self.refresh(Resource::Status),
            self.refresh(Resource::Agents),
            self.refresh(Resource::Analyses),
            self.refresh(Resource::Alerts),
        );

        let mut report = CycleReport::default();
        report.outcomes.insert(Resource::Status, status);
        report.outcomes.insert(Resource::Agents, agents);
        report.outcomes.insert(Resource::Analyses, analyses);
        report.outcomes.insert(Resource::Alerts, alerts);
        report
    }

    async fn fetch(&self, resource: Resource) -> Result<Snapshot> {
        let backend = &self.inner.backend;
        Ok(match resource {
            Resource::Status => Snapshot::Status(backend.fetch_status().await?),
            Resource::Agents => Snapshot::Agents(backend.fetch_agents().await?),
            Resource::Analyses => Snapshot::Analyses(backend.fetch_analyses().await?),
            Resource::Alerts => Snapshot::Alerts(backend.fetch_alerts().await?),
        })
    }

    /// An alert from the last snapshot, with its acknowledgment state.
    pub fn alert(&self, alert_id: &str) -> Option<(Alert, AckState)> {
        self.read(|store| {
            store
                .alert(alert_id)
                .map(|view| (view.alert.clone(), view.state))
        })
    }

    /// Full details for the detail view.
    ///
    /// Asks the backend for the freshest copy and falls back to the store when that fails.
    /// The acknowledgment state always comes from the store so the optimistic overlay holds.
    pub async fn alert_details(&self, alert_id: &str) -> Result<(Alert, AckState)> {
        match self.inner.backend.fetch_alert(alert_id).await {
            Ok(alert) => {
                let state = self
                    .read(|store| store.alert_state(alert_id))
                    .unwrap_or(match alert.status {
                        AlertStatus::New => AckState::New,
                        AlertStatus::Acknowledged => AckState::Acknowledged,
                    });
                Ok((alert, state))
            }
            Err(e) => {
                warn!(alert_id, "alert detail fetch failed: {}", e);
                self.alert(alert_id).ok_or(e)
            }
        }
    }
}
