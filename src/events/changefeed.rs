//! Table-scoped change notifications.
//!
//! Subscribers register a callback per table and get a signal for every insert,
//! update or delete. Signals carry no payload worth merging; consumers re-query.
//! Delivery is at-least-once and unordered relative to local edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{table_fingerprint, DbPool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Hospitals,
    Departments,
    Patients,
    MedicalRecords,
    EmergencyAlerts,
    Practitioners,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Hospitals => "hospitals",
            Table::Departments => "departments",
            Table::Patients => "patients",
            Table::MedicalRecords => "medical_records",
            Table::EmergencyAlerts => "emergency_alerts",
            Table::Practitioners => "practitioners",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Something changed but the transport cannot tell what.
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: Option<Uuid>,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, row_id: Option<Uuid>) -> Self {
        Self {
            table,
            kind,
            row_id,
            observed_at: Utc::now(),
        }
    }

    fn unknown(table: Table) -> Self {
        Self::new(table, ChangeKind::Unknown, None)
    }
}

pub type ChangeCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Source of change signals. Implementations differ only in transport.
pub trait ChangeFeed: Send + Sync {
    /// Delivers every change on `table` to `callback` until the returned
    /// subscription is dropped.
    fn subscribe(&self, table: Table, callback: ChangeCallback) -> Subscription;
}

/// Handle to an active subscription; dropping it stops delivery.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Push transport: writers publish, subscribers receive through a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl BroadcastChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of subscribers that will see the change.
    pub fn publish(&self, change: ChangeEvent) -> usize {
        self.sender.send(change).unwrap_or(0)
    }
}

impl ChangeFeed for BroadcastChangeFeed {
    fn subscribe(&self, table: Table, callback: ChangeCallback) -> Subscription {
        let mut rx = self.sender.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) if change.table == table => callback(change),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed signals collapse into one; the consumer re-queries anyway.
                        warn!(%table, skipped, "change feed subscriber lagged");
                        callback(ChangeEvent::unknown(table));
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription::new(handle)
    }
}

/// Poll transport: compares a table fingerprint on a fixed interval.
#[derive(Clone)]
pub struct PollingChangeFeed {
    db: Arc<DbPool>,
    interval: Duration,
}

impl PollingChangeFeed {
    pub fn new(db: Arc<DbPool>, interval: Duration) -> Self {
        Self { db, interval }
    }
}

impl ChangeFeed for PollingChangeFeed {
    fn subscribe(&self, table: Table, callback: ChangeCallback) -> Subscription {
        let db = self.db.clone();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let handle = tokio::spawn(async move {
            let mut last = None;
            loop {
                ticker.tick().await;
                match table_fingerprint(db.as_ref(), table.name()).await {
                    Ok(current) => {
                        if last.as_ref().is_some_and(|previous| previous != &current) {
                            debug!(%table, "poll detected change");
                            callback(ChangeEvent::unknown(table));
                        }
                        last = Some(current);
                    }
                    Err(e) => warn!(%table, error = %e, "change poll failed"),
                }
            }
        });
        Subscription::new(handle)
    }
}
