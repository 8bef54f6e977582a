use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    commands::Command,
    db::DbPool,
    entities::medical_record,
    errors::ServiceError,
    events::{Event, EventSender},
};

pub(crate) const RECORD_STATUS_DISCHARGED: &str = "discharged";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DischargeMedicalRecordCommand {
    pub record_id: Uuid,
}

#[async_trait]
impl Command for DischargeMedicalRecordCommand {
    type Result = medical_record::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(record_id = %self.record_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let record = medical_record::Entity::find_by_id(self.record_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Medical record {} not found", self.record_id))
            })?;

        if record.status == RECORD_STATUS_DISCHARGED {
            return Err(ServiceError::InvalidStatus(format!(
                "Medical record {} is already discharged",
                self.record_id
            )));
        }

        let mut active: medical_record::ActiveModel = record.into();
        active.status = Set(RECORD_STATUS_DISCHARGED.to_string());
        active.discharge_date = Set(Some(Utc::now()));
        let updated = active.update(db).await?;

        event_sender
            .send(Event::MedicalRecordUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(patient_id = %updated.patient_id, "Patient discharged");
        Ok(updated)
    }
}
