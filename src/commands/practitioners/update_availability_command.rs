use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    db::DbPool,
    entities::practitioner,
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAvailabilityCommand {
    #[serde(skip)]
    pub practitioner_id: Uuid,
    #[validate(length(min = 1, max = 32))]
    #[schema(example = "on_call")]
    pub availability_status: String,
}

#[async_trait]
impl Command for UpdateAvailabilityCommand {
    type Result = practitioner::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(practitioner_id = %self.practitioner_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let status = self.availability_status.trim().to_lowercase();
        if status.is_empty() {
            return Err(ServiceError::ValidationError(
                "availability_status must not be blank".to_string(),
            ));
        }

        let db = db_pool.as_ref();
        let existing = practitioner::Entity::find_by_id(self.practitioner_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Practitioner {} not found", self.practitioner_id))
            })?;

        let mut active: practitioner::ActiveModel = existing.into();
        active.availability_status = Set(status.clone());
        let updated = active.update(db).await?;

        event_sender
            .send(Event::PractitionerUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(availability = %status, "Practitioner availability changed");
        Ok(updated)
    }
}
