use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AlertStatus, Severity};

pub mod changefeed;

use changefeed::{BroadcastChangeFeed, ChangeEvent, ChangeKind, Table};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after the row is already committed. The database stays the
    /// source of truth, so a closed channel is logged rather than surfaced.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

// Domain events emitted after successful writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    HospitalCreated(Uuid),
    HospitalUpdated(Uuid),
    HospitalDeleted(Uuid),

    DepartmentCreated(Uuid),
    DepartmentUpdated(Uuid),

    PractitionerCreated(Uuid),
    PractitionerUpdated(Uuid),

    PatientCreated(Uuid),
    PatientUpdated(Uuid),

    MedicalRecordCreated {
        record_id: Uuid,
        patient_id: Uuid,
    },
    MedicalRecordUpdated(Uuid),

    AlertCreated {
        alert_id: Uuid,
        hospital_id: Uuid,
        severity: Severity,
    },
    AlertUpdated(Uuid),
    AlertStatusChanged {
        alert_id: Uuid,
        old_status: AlertStatus,
        new_status: AlertStatus,
    },
}

impl Event {
    /// Table-scoped change signal equivalent to this event.
    pub fn change(&self) -> ChangeEvent {
        let (table, kind, row_id) = match self {
            Event::HospitalCreated(id) => (Table::Hospitals, ChangeKind::Insert, *id),
            Event::HospitalUpdated(id) => (Table::Hospitals, ChangeKind::Update, *id),
            Event::HospitalDeleted(id) => (Table::Hospitals, ChangeKind::Delete, *id),
            Event::DepartmentCreated(id) => (Table::Departments, ChangeKind::Insert, *id),
            Event::DepartmentUpdated(id) => (Table::Departments, ChangeKind::Update, *id),
            Event::PractitionerCreated(id) => (Table::Practitioners, ChangeKind::Insert, *id),
            Event::PractitionerUpdated(id) => (Table::Practitioners, ChangeKind::Update, *id),
            Event::PatientCreated(id) => (Table::Patients, ChangeKind::Insert, *id),
            Event::PatientUpdated(id) => (Table::Patients, ChangeKind::Update, *id),
            Event::MedicalRecordCreated { record_id, .. } => {
                (Table::MedicalRecords, ChangeKind::Insert, *record_id)
            }
            Event::MedicalRecordUpdated(id) => (Table::MedicalRecords, ChangeKind::Update, *id),
            Event::AlertCreated { alert_id, .. } => {
                (Table::EmergencyAlerts, ChangeKind::Insert, *alert_id)
            }
            Event::AlertUpdated(id) => (Table::EmergencyAlerts, ChangeKind::Update, *id),
            Event::AlertStatusChanged { alert_id, .. } => {
                (Table::EmergencyAlerts, ChangeKind::Update, *alert_id)
            }
        };
        ChangeEvent::new(table, kind, Some(row_id))
    }
}

/// Logs every domain event and republishes it on the push change feed.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, feed: Option<Arc<BroadcastChangeFeed>>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::AlertCreated {
                alert_id,
                hospital_id,
                severity,
            } => {
                info!(%alert_id, %hospital_id, %severity, "Emergency alert raised");
            }
            Event::AlertStatusChanged {
                alert_id,
                old_status,
                new_status,
            } => {
                info!(%alert_id, %old_status, %new_status, "Emergency alert status changed");
            }
            Event::HospitalDeleted(id) => {
                warn!(hospital_id = %id, "Hospital deleted");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }

        if let Some(feed) = &feed {
            feed.publish(event.change());
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use changefeed::ChangeFeed;
    use std::time::Duration;

    #[test]
    fn events_map_to_table_changes() {
        let id = Uuid::new_v4();
        let change = Event::AlertStatusChanged {
            alert_id: id,
            old_status: AlertStatus::Active,
            new_status: AlertStatus::Resolved,
        }
        .change();
        assert_eq!(change.table, Table::EmergencyAlerts);
        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(change.row_id, Some(id));

        assert_eq!(Event::HospitalDeleted(id).change().kind, ChangeKind::Delete);
    }

    #[tokio::test]
    async fn process_events_republishes_on_feed() {
        let feed = Arc::new(BroadcastChangeFeed::new(16));
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let _subscription = feed.subscribe(
            Table::Patients,
            Arc::new(move |change| {
                let _ = seen_tx.send(change);
            }),
        );

        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let worker = tokio::spawn(process_events(rx, Some(feed.clone())));

        let patient = Uuid::new_v4();
        sender.publish(Event::PatientCreated(patient)).await;

        let change = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .expect("change delivered")
            .expect("channel open");
        assert_eq!(change.row_id, Some(patient));
        assert_eq!(change.kind, ChangeKind::Insert);

        drop(sender);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn publish_on_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::HospitalCreated(Uuid::new_v4())).await.is_err());
        sender.publish(Event::HospitalCreated(Uuid::new_v4())).await;
    }
}
