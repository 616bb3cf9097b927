//! Alert acknowledgment state machine.
//!
//! ```text
//!   NEW --acknowledge--> PENDING_ACK --poll reports ACKNOWLEDGED--> ACKNOWLEDGED
//!                             |
//!                             +--acknowledge call fails--> NEW
//! ```
//!
//! The pending set lives in the [`ViewModelStore`]; this controller is the only writer.

use crate::error::{ConsoleError, Result};
use crate::model::AlertStatus;
use crate::reconcile::render_alert_row;
use crate::store::{AckState, FieldChange, ViewModelStore};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of an acknowledge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckBegin {
    /// The alert moved to PENDING_ACK; the caller must now issue the acknowledging call.
    Started { changes: Vec<FieldChange> },
    /// An acknowledgment for this alert is already in flight.
    AlreadyPending,
    /// The backend already reports the alert as acknowledged.
    AlreadyAcknowledged,
}

impl AckBegin {
    pub fn should_issue(&self) -> bool {
        matches!(self, AckBegin::Started { .. })
    }
}

/// What settling the pending set against a fresh alerts snapshot did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettleReport {
    /// The backend now reports these as acknowledged.
    pub confirmed: Vec<String>,
    /// These no longer appear in the snapshot.
    pub vanished: Vec<String>,
    /// Still NEW after the staleness bound elapsed; the overlay was dropped.
    pub expired: Vec<String>,
}

impl SettleReport {
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.vanished.is_empty() && self.expired.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertLifecycle {
    stale_after: Option<Duration>,
}

impl AlertLifecycle {
    pub fn new(stale_after: Option<Duration>) -> Self {
        Self { stale_after }
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after
    }

    /// NEW -> PENDING_ACK. Repeated requests for the same alert are no-ops.
    pub fn begin(&self, store: &mut ViewModelStore, alert_id: &str) -> Result<AckBegin> {
        let state = store
            .alert_state(alert_id)
            .ok_or_else(|| ConsoleError::UnknownAlert(alert_id.to_string()))?;

        match state {
            AckState::PendingAck => Ok(AckBegin::AlreadyPending),
            AckState::Acknowledged => Ok(AckBegin::AlreadyAcknowledged),
            AckState::New => {
                store.insert_pending(alert_id, Instant::now());
                info!(alert_id, "acknowledgment pending");
                Ok(AckBegin::Started {
                    changes: render_alert_row(store, alert_id),
                })
            }
        }
    }

    /// PENDING_ACK -> NEW after the acknowledging call failed.
    pub fn rollback(&self, store: &mut ViewModelStore, alert_id: &str) -> Vec<FieldChange> {
        if !store.remove_pending(alert_id) {
            return Vec::new();
        }
        warn!(alert_id, "acknowledgment rolled back");
        render_alert_row(store, alert_id)
    }

    /// Reconcile the pending set with the alerts snapshot just written to the store.
    ///
    /// Pending IDs missing from the snapshot are dropped so the pending set stays a subset of
    /// the known alerts.
    ///
    /// Snapshots are applied in completion order. With overlapping cycles, a slow fetch taken
    /// before the backend recorded an acknowledgment can land after the confirming one; the
    /// alert then reads NEW again and can be acknowledged a second time until the next poll.
    /// `skip_overlapping_cycles` narrows this to refreshes run outside the schedule.
    pub fn settle(&self, store: &mut ViewModelStore, now: Instant) -> SettleReport {
        let mut report = SettleReport::default();

        let pending: Vec<String> = store.pending_ids().into_iter().map(String::from).collect();
        for alert_id in pending {
            let mirrored = store.alert(&alert_id).map(|view| view.alert.status);
            match mirrored {
                None => {
                    store.remove_pending(&alert_id);
                    report.vanished.push(alert_id);
                }
                Some(AlertStatus::Acknowledged) => {
                    store.remove_pending(&alert_id);
                    info!(alert_id = %alert_id, "acknowledgment confirmed");
                    report.confirmed.push(alert_id);
                }
                Some(AlertStatus::New) => {
                    let expired = match (self.stale_after, store.pending_since(&alert_id)) {
                        (Some(bound), Some(since)) => now.saturating_duration_since(since) >= bound,
                        _ => false,
                    };
                    if expired {
                        store.remove_pending(&alert_id);
                        warn!(alert_id = %alert_id, "acknowledgment never confirmed, overlay dropped");
                        report.expired.push(alert_id);
                    }
                }
            }
        }

        report
    }
}
