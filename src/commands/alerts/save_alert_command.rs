use async_trait::async_trait;
use metrics::counter;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    db::DbPool,
    entities::{emergency_alert, hospital, patient},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{AlertStatus, AlertType, Severity},
};

/// Raises an emergency alert, or edits its details when `id` is present.
///
/// New alerts always start `active`. Edits never touch the status or the
/// resolution stamps; those only move through [`super::TransitionAlertCommand`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaveAlertCommand {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub hospital_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub alert_type: Option<AlertType>,
    pub severity: Option<Severity>,
    #[validate(length(min = 1, max = 200, message = "Alert title is required"))]
    #[schema(example = "ICU at capacity")]
    pub title: String,
    #[validate(length(min = 1, message = "Alert description is required"))]
    pub description: String,
    pub created_by: Option<Uuid>,
}

impl SaveAlertCommand {
    async fn check_references(&self, db: &DatabaseConnection) -> Result<(), ServiceError> {
        hospital::Entity::find_by_id(self.hospital_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Hospital {} not found", self.hospital_id))
            })?;
        if let Some(patient_id) = self.patient_id {
            patient::Entity::find_by_id(patient_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Patient {} not found", patient_id))
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl Command for SaveAlertCommand {
    type Result = emergency_alert::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(alert_id = ?self.id, hospital_id = %self.hospital_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            counter!("edhms.alert.save.failures", 1);
            ServiceError::ValidationError(e.to_string())
        })?;

        let db = db_pool.as_ref();
        self.check_references(db).await?;

        let (alert, event) = match self.id {
            Some(id) => {
                let existing = emergency_alert::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Alert {} not found", id)))?;

                let alert_type = self.alert_type.unwrap_or(existing.alert_type);
                let severity = self.severity.unwrap_or(existing.severity);
                let mut active: emergency_alert::ActiveModel = existing.into();
                active.hospital_id = Set(self.hospital_id);
                active.patient_id = Set(self.patient_id);
                active.alert_type = Set(alert_type);
                active.severity = Set(severity);
                active.title = Set(self.title.trim().to_string());
                active.description = Set(self.description.trim().to_string());

                let updated = active.update(db).await.map_err(|e| {
                    counter!("edhms.alert.save.failures", 1);
                    error!(alert_id = %id, "Failed to update alert: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                (updated, Event::AlertUpdated(id))
            }
            None => {
                let created = emergency_alert::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    hospital_id: Set(self.hospital_id),
                    patient_id: Set(self.patient_id),
                    alert_type: Set(self.alert_type.unwrap_or_default()),
                    severity: Set(self.severity.unwrap_or_default()),
                    title: Set(self.title.trim().to_string()),
                    description: Set(self.description.trim().to_string()),
                    status: Set(AlertStatus::Active),
                    created_by: Set(self.created_by),
                    resolved_by: Set(None),
                    resolved_at: Set(None),
                    ..Default::default()
                }
                .insert(db)
                .await
                .map_err(|e| {
                    counter!("edhms.alert.save.failures", 1);
                    error!("Failed to raise alert: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                counter!("edhms.alert.created", 1, "severity" => created.severity.to_string());
                let event = Event::AlertCreated {
                    alert_id: created.id,
                    hospital_id: created.hospital_id,
                    severity: created.severity,
                };
                (created, event)
            }
        };

        event_sender
            .send(event)
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            status = %alert.status,
            "Emergency alert saved"
        );
        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::{alerts::TransitionAlertCommand, hospitals::SaveHospitalCommand},
        forms::ListInput,
        models::AlertAction,
        test_support::{memory_db, test_events},
    };
    use assert_matches::assert_matches;

    async fn hospital(db: Arc<DbPool>, events: Arc<EventSender>, name: &str) -> Uuid {
        SaveHospitalCommand {
            id: None,
            name: name.into(),
            address: "9 Pier Rd".into(),
            phone: "555-0190".into(),
            email: None,
            emergency_contact: "555-0191".into(),
            bed_capacity: 30,
            available_beds: None,
            specialties: ListInput::default(),
            status: None,
            latitude: None,
            longitude: None,
        }
        .execute(db, events)
        .await
        .unwrap()
        .id
    }

    fn alert_form(hospital_id: Uuid) -> SaveAlertCommand {
        SaveAlertCommand {
            id: None,
            hospital_id,
            patient_id: None,
            alert_type: None,
            severity: None,
            title: "Generator offline".into(),
            description: "Backup power only".into(),
            created_by: None,
        }
    }

    #[tokio::test]
    async fn editing_a_resolved_alert_keeps_its_lifecycle() {
        let db = memory_db().await;
        let (events, _rx) = test_events();
        let harbor = hospital(db.clone(), events.clone(), "Harbor").await;
        let valley = hospital(db.clone(), events.clone(), "Valley").await;

        let alert = alert_form(harbor)
            .execute(db.clone(), events.clone())
            .await
            .unwrap();
        let resolved = TransitionAlertCommand {
            alert_id: alert.id,
            action: AlertAction::Resolve,
            resolved_by: None,
        }
        .execute(db.clone(), events.clone())
        .await
        .unwrap();

        let edited = SaveAlertCommand {
            id: Some(alert.id),
            hospital_id: valley,
            alert_type: Some(AlertType::EquipmentFailure),
            severity: Some(Severity::Critical),
            title: "  Generator fire  ".into(),
            ..alert_form(harbor)
        }
        .execute(db, events)
        .await
        .unwrap();

        assert_eq!(edited.hospital_id, valley);
        assert_eq!(edited.alert_type, AlertType::EquipmentFailure);
        assert_eq!(edited.severity, Severity::Critical);
        assert_eq!(edited.title, "Generator fire");
        assert_eq!(edited.status, AlertStatus::Resolved);
        assert_eq!(edited.resolved_at, resolved.resolved_at);
    }

    #[tokio::test]
    async fn editing_requires_existing_alert_and_hospital() {
        let db = memory_db().await;
        let (events, _rx) = test_events();
        let harbor = hospital(db.clone(), events.clone(), "Harbor").await;

        let missing_alert = SaveAlertCommand {
            id: Some(Uuid::new_v4()),
            ..alert_form(harbor)
        }
        .execute(db.clone(), events.clone())
        .await;
        assert_matches!(missing_alert, Err(ServiceError::NotFound(msg)) if msg.starts_with("Alert"));

        let missing_hospital = alert_form(Uuid::new_v4()).execute(db, events).await;
        assert_matches!(missing_hospital, Err(ServiceError::NotFound(msg)) if msg.starts_with("Hospital"));
    }
}
