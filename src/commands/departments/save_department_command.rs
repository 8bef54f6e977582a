use async_trait::async_trait;
use metrics::counter;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    db::DbPool,
    entities::{department, hospital},
    errors::ServiceError,
    events::{Event, EventSender},
    forms::{non_blank, ListInput},
};

const DEFAULT_DEPARTMENT_STATUS: &str = "active";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaveDepartmentCommand {
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Required on insert; an update keeps the department's hospital.
    #[serde(default)]
    pub hospital_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Department name is required"))]
    #[schema(example = "Emergency")]
    pub name: String,
    pub head_doctor: Option<String>,
    pub phone: Option<String>,
    #[validate(range(min = 0))]
    pub bed_count: Option<i32>,
    pub available_beds: Option<i32>,
    #[serde(default)]
    pub equipment: ListInput,
    pub status: Option<String>,
}

#[async_trait]
impl Command for SaveDepartmentCommand {
    type Result = department::Model;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        let equipment = self.equipment.clone().into_list();

        let (saved, event) = match self.id {
            Some(id) => {
                let existing = department::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Department {} not found", id))
                    })?;
                let status = non_blank(self.status.clone()).unwrap_or_else(|| existing.status.clone());

                let mut active: department::ActiveModel = existing.into();
                active.name = Set(self.name.trim().to_string());
                active.head_doctor = Set(non_blank(self.head_doctor.clone()));
                active.phone = Set(non_blank(self.phone.clone()));
                active.bed_count = Set(self.bed_count);
                active.available_beds = Set(self.available_beds);
                active.equipment = Set(equipment.into());
                active.status = Set(status);

                let updated = active.update(db).await.map_err(|e| {
                    error!(department_id = %id, "Failed to update department: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                (updated, Event::DepartmentUpdated(id))
            }
            None => {
                let hospital_id = self.hospital_id.ok_or_else(|| {
                    ServiceError::ValidationError("hospital_id is required".to_string())
                })?;
                hospital::Entity::find_by_id(hospital_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Hospital {} not found", hospital_id))
                    })?;

                let id = Uuid::new_v4();
                let inserted = department::ActiveModel {
                    id: Set(id),
                    hospital_id: Set(hospital_id),
                    name: Set(self.name.trim().to_string()),
                    head_doctor: Set(non_blank(self.head_doctor.clone())),
                    phone: Set(non_blank(self.phone.clone())),
                    bed_count: Set(self.bed_count),
                    available_beds: Set(self.available_beds),
                    equipment: Set(equipment.into()),
                    status: Set(non_blank(self.status.clone())
                        .unwrap_or_else(|| DEFAULT_DEPARTMENT_STATUS.to_string())),
                    ..Default::default()
                }
                .insert(db)
                .await
                .map_err(|e| {
                    error!(%hospital_id, "Failed to create department: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                (inserted, Event::DepartmentCreated(id))
            }
        };

        event_sender
            .send(event)
            .await
            .map_err(ServiceError::EventError)?;

        info!(department_id = %saved.id, hospital_id = %saved.hospital_id, "Department saved");
        counter!("edhms.department.saved", 1);
        Ok(saved)
    }
}
