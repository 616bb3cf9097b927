pub mod backend;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod poller;
pub mod reconcile;
pub mod store;

pub use backend::Backend;
pub use config::Config;
pub use console::{Console, ConsoleEvent, CycleReport, Notice, NoticeLevel, RefreshOutcome};
pub use dispatcher::{Action, ActionDispatcher, ActionOutcome, DeleteRequest};
pub use error::{ConsoleError, Result};
pub use lifecycle::{AckBegin, AlertLifecycle, SettleReport};
pub use model::{
    AgentStatus, AgentSummary, Alert, AlertStatus, AnalysisDetails, AnalysisRecord, NewAgent,
    Severity, SystemStatus,
};
pub use poller::{OverlapPolicy, Poller};
pub use reconcile::{Reconciler, Reconciliation, Snapshot};
pub use store::{AckState, AlertView, FieldChange, FieldKey, Resource, ViewModelStore};
