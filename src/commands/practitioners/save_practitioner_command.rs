use async_trait::async_trait;
use metrics::counter;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    db::DbPool,
    entities::{department, hospital, practitioner},
    errors::ServiceError,
    events::{Event, EventSender},
    forms::non_blank,
};

pub(crate) const DEFAULT_AVAILABILITY: &str = "available";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SavePractitionerCommand {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub hospital_id: Uuid,
    pub department_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Practitioner name is required"))]
    #[schema(example = "Dr. Amara Okafor")]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Specialization is required"))]
    pub specialization: String,
    #[validate(length(min = 1, message = "License number is required"))]
    pub license_number: String,
    #[validate(range(min = 0, max = 80))]
    pub experience_years: Option<i32>,
    pub availability_status: Option<String>,
}

impl SavePractitionerCommand {
    async fn check_placement<C: ConnectionTrait>(&self, db: &C) -> Result<(), ServiceError> {
        hospital::Entity::find_by_id(self.hospital_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Hospital {} not found", self.hospital_id))
            })?;

        if let Some(department_id) = self.department_id {
            let dept = department::Entity::find_by_id(department_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Department {} not found", department_id))
                })?;
            if dept.hospital_id != self.hospital_id {
                return Err(ServiceError::ValidationError(format!(
                    "Department {} does not belong to hospital {}",
                    department_id, self.hospital_id
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Command for SavePractitionerCommand {
    type Result = practitioner::Model;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        self.check_placement(db).await?;

        let (saved, event) = match self.id {
            Some(id) => {
                let existing = practitioner::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Practitioner {} not found", id))
                    })?;
                let availability = non_blank(self.availability_status.clone())
                    .unwrap_or_else(|| existing.availability_status.clone());

                let mut active: practitioner::ActiveModel = existing.into();
                active.hospital_id = Set(self.hospital_id);
                active.department_id = Set(self.department_id);
                active.user_id = Set(self.user_id);
                active.name = Set(self.name.trim().to_string());
                active.email = Set(self.email.trim().to_string());
                active.phone = Set(non_blank(self.phone.clone()));
                active.specialization = Set(self.specialization.trim().to_string());
                active.license_number = Set(self.license_number.trim().to_string());
                active.experience_years = Set(self.experience_years);
                active.availability_status = Set(availability);

                let updated = active.update(db).await.map_err(|e| {
                    error!(practitioner_id = %id, "Failed to update practitioner: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                (updated, Event::PractitionerUpdated(id))
            }
            None => {
                let id = Uuid::new_v4();
                let inserted = practitioner::ActiveModel {
                    id: Set(id),
                    hospital_id: Set(self.hospital_id),
                    department_id: Set(self.department_id),
                    user_id: Set(self.user_id),
                    name: Set(self.name.trim().to_string()),
                    email: Set(self.email.trim().to_string()),
                    phone: Set(non_blank(self.phone.clone())),
                    specialization: Set(self.specialization.trim().to_string()),
                    license_number: Set(self.license_number.trim().to_string()),
                    experience_years: Set(self.experience_years),
                    availability_status: Set(non_blank(self.availability_status.clone())
                        .unwrap_or_else(|| DEFAULT_AVAILABILITY.to_string())),
                    ..Default::default()
                }
                .insert(db)
                .await
                .map_err(|e| {
                    error!(hospital_id = %self.hospital_id, "Failed to create practitioner: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                (inserted, Event::PractitionerCreated(id))
            }
        };

        event_sender
            .send(event)
            .await
            .map_err(ServiceError::EventError)?;

        info!(practitioner_id = %saved.id, hospital_id = %saved.hospital_id, "Practitioner saved");
        counter!("edhms.practitioner.saved", 1);
        Ok(saved)
    }
}
