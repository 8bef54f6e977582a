use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    db::DbPool,
    entities::patient,
    errors::ServiceError,
    events::{Event, EventSender},
    forms::{non_blank, TagListEditor},
};

/// Profile edit. Absent fields are left untouched; the business identifier
/// never changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePatientCommand {
    #[serde(skip)]
    pub id: Uuid,
    #[validate(length(min = 1, message = "Patient name cannot be blank"))]
    pub name: Option<String>,
    #[validate(range(min = 0, max = 150))]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub insurance_info: Option<Value>,
}

#[async_trait]
impl Command for UpdatePatientCommand {
    type Result = patient::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(patient_row = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        let existing = patient::Entity::find_by_id(self.id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient {} not found", self.id)))?;

        let mut active: patient::ActiveModel = existing.into();
        if let Some(name) = non_blank(self.name.clone()) {
            active.name = Set(name);
        }
        if self.age.is_some() {
            active.age = Set(self.age);
        }
        // Present-but-blank clears the field.
        let optional_fields = [
            (&self.gender, &mut active.gender),
            (&self.phone, &mut active.phone),
            (&self.email, &mut active.email),
            (&self.address, &mut active.address),
            (&self.blood_type, &mut active.blood_type),
            (&self.emergency_contact_name, &mut active.emergency_contact_name),
            (&self.emergency_contact_phone, &mut active.emergency_contact_phone),
        ];
        for (input, column) in optional_fields {
            if input.is_some() {
                *column = Set(non_blank(input.clone()));
            }
        }
        if let Some(allergies) = &self.allergies {
            active.allergies = Set(TagListEditor::from_values(allergies).into_vec().into());
        }
        if let Some(conditions) = &self.chronic_conditions {
            active.chronic_conditions =
                Set(TagListEditor::from_values(conditions).into_vec().into());
        }
        if self.insurance_info.is_some() {
            active.insurance_info = Set(self.insurance_info.clone());
        }

        let updated = active.update(db).await?;

        event_sender
            .send(Event::PatientUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(patient_id = %updated.patient_id, "Patient profile updated");
        Ok(updated)
    }
}
