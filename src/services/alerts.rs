use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    commands::{
        alerts::{SaveAlertCommand, TransitionAlertCommand},
        Command,
    },
    db::DbPool,
    entities::{emergency_alert, hospital, patient},
    errors::ServiceError,
    events::{
        changefeed::{ChangeFeed, Subscription, Table},
        EventSender,
    },
    models::{AlertAction, AlertStatus, AlertType, BadgeVariant, Severity},
};

/// Alert joined with display names and badge hints.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AlertView {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub hospital_name: Option<String>,
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    /// Business identifier of the patient.
    pub patient_code: Option<String>,
    pub alert_type: AlertType,
    pub alert_type_label: String,
    pub severity: Severity,
    pub severity_badge: BadgeVariant,
    pub title: String,
    pub description: String,
    pub status: AlertStatus,
    pub status_badge: BadgeVariant,
    pub available_actions: Vec<AlertAction>,
    pub created_by: Option<Uuid>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertView {
    pub fn new(
        alert: emergency_alert::Model,
        hospital: Option<&hospital::Model>,
        patient: Option<&patient::Model>,
    ) -> Self {
        Self {
            id: alert.id,
            hospital_id: alert.hospital_id,
            hospital_name: hospital.map(|h| h.name.clone()),
            patient_id: alert.patient_id,
            patient_name: patient.map(|p| p.name.clone()),
            patient_code: patient.map(|p| p.patient_id.clone()),
            alert_type: alert.alert_type,
            alert_type_label: alert.alert_type.label().to_string(),
            severity: alert.severity,
            severity_badge: alert.severity.badge(),
            title: alert.title,
            description: alert.description,
            status: alert.status,
            status_badge: alert.status.badge(),
            available_actions: alert.status.available_actions(),
            created_by: alert.created_by,
            resolved_by: alert.resolved_by,
            resolved_at: alert.resolved_at,
            created_at: alert.created_at,
            updated_at: alert.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub severity: Option<Severity>,
    pub search: Option<String>,
}

/// In-memory secondary filtering over an already fetched list.
pub fn filter_alerts(alerts: Vec<AlertView>, filter: &AlertFilter) -> Vec<AlertView> {
    let needle = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    alerts
        .into_iter()
        .filter(|a| filter.status.map_or(true, |s| a.status == s))
        .filter(|a| filter.severity.map_or(true, |s| a.severity == s))
        .filter(|a| match &needle {
            None => true,
            Some(needle) => [
                Some(a.title.as_str()),
                Some(a.description.as_str()),
                a.hospital_name.as_deref(),
                a.patient_name.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle)),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCounts {
    pub active: u64,
    pub acknowledged: u64,
    pub resolved: u64,
}

pub fn status_counts(alerts: &[AlertView]) -> StatusCounts {
    alerts.iter().fold(StatusCounts::default(), |mut counts, a| {
        match a.status {
            AlertStatus::Active => counts.active += 1,
            AlertStatus::Acknowledged => counts.acknowledged += 1,
            AlertStatus::Resolved => counts.resolved += 1,
        }
        counts
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AlertListing {
    pub alerts: Vec<AlertView>,
    /// Counts across all alerts, before filters.
    pub counts: StatusCounts,
}

#[derive(Clone)]
pub struct AlertService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl AlertService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn load_views(
        &self,
        only_active: bool,
        limit: Option<u64>,
    ) -> Result<Vec<AlertView>, ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = emergency_alert::Entity::find()
            .order_by_desc(emergency_alert::Column::CreatedAt);
        if only_active {
            query = query.filter(emergency_alert::Column::Status.eq(AlertStatus::Active));
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let rows = query.find_also_related(hospital::Entity).all(db).await?;
        self.attach_patients(rows).await
    }

    async fn attach_patients(
        &self,
        rows: Vec<(emergency_alert::Model, Option<hospital::Model>)>,
    ) -> Result<Vec<AlertView>, ServiceError> {
        let patient_ids: Vec<Uuid> = rows.iter().filter_map(|(a, _)| a.patient_id).collect();
        let patients: HashMap<Uuid, patient::Model> = if patient_ids.is_empty() {
            HashMap::new()
        } else {
            patient::Entity::find()
                .filter(patient::Column::Id.is_in(patient_ids))
                .all(self.db_pool.as_ref())
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        Ok(rows
            .into_iter()
            .map(|(alert, hospital)| {
                let patient = alert.patient_id.and_then(|id| patients.get(&id));
                AlertView::new(alert, hospital.as_ref(), patient)
            })
            .collect())
    }

    /// Newest first, with per-status counts and in-memory filters applied.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &AlertFilter) -> Result<AlertListing, ServiceError> {
        let all = self.load_views(false, None).await?;
        let counts = status_counts(&all);
        Ok(AlertListing {
            alerts: filter_alerts(all, filter),
            counts,
        })
    }

    pub async fn latest_active(&self, limit: u64) -> Result<Vec<AlertView>, ServiceError> {
        self.load_views(true, Some(limit)).await
    }

    pub async fn get(&self, id: Uuid) -> Result<AlertView, ServiceError> {
        let row = emergency_alert::Entity::find_by_id(id)
            .find_also_related(hospital::Entity)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Alert {} not found", id)))?;
        self.attach_patients(vec![row])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError(format!("Alert {} view missing", id)))
    }

    /// Inserts or edits depending on `command.id`; status is never changed here.
    #[instrument(skip(self, command))]
    pub async fn save(&self, command: SaveAlertCommand) -> Result<AlertView, ServiceError> {
        let alert = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        self.get(alert.id).await
    }

    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        alert_id: Uuid,
        action: AlertAction,
        resolved_by: Option<Uuid>,
    ) -> Result<AlertView, ServiceError> {
        TransitionAlertCommand {
            alert_id,
            action,
            resolved_by,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.get(alert_id).await
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BoardSnapshot {
    pub alerts: Vec<AlertView>,
    pub counts: StatusCounts,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub refresh_count: u64,
}

/// Live alert list kept current by the change feed.
///
/// Every signal triggers a full re-query; the signal payload is never merged.
pub struct AlertBoard {
    service: AlertService,
    snapshot: RwLock<BoardSnapshot>,
    /// Held from query to write so an older result never lands last.
    refresh_lock: Mutex<()>,
}

impl AlertBoard {
    pub fn new(service: AlertService) -> Arc<Self> {
        Arc::new(Self {
            service,
            snapshot: RwLock::new(BoardSnapshot::default()),
            refresh_lock: Mutex::new(()),
        })
    }

    pub async fn refresh(&self) -> Result<(), ServiceError> {
        let _guard = self.refresh_lock.lock().await;
        let listing = self.service.list(&AlertFilter::default()).await?;
        let mut snapshot = self.snapshot.write().await;
        snapshot.alerts = listing.alerts;
        snapshot.counts = listing.counts;
        snapshot.refreshed_at = Some(Utc::now());
        snapshot.refresh_count += 1;
        debug!(alerts = snapshot.alerts.len(), "Alert board refreshed");
        Ok(())
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Subscribes the board to alert-table changes. Keep the returned
    /// subscription alive for as long as the board should follow them.
    pub fn attach(self: &Arc<Self>, feed: &dyn ChangeFeed) -> Subscription {
        let board = Arc::clone(self);
        feed.subscribe(
            Table::EmergencyAlerts,
            Arc::new(move |change| {
                let board = Arc::clone(&board);
                tokio::spawn(async move {
                    if let Err(e) = board.refresh().await {
                        warn!(kind = ?change.kind, "Alert board refresh failed: {}", e);
                    }
                });
            }),
        )
    }
}
