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
    entities::hospital,
    errors::ServiceError,
    events::{Event, EventSender},
    forms::{non_blank, ListInput},
    models::HospitalStatus,
};

/// Creates a hospital, or updates it when `id` is present.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaveHospitalCommand {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(min = 1, message = "Hospital name is required"))]
    #[schema(example = "St. Mary's General")]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Emergency contact is required"))]
    pub emergency_contact: String,
    #[validate(range(min = 0, message = "Bed capacity cannot be negative"))]
    #[schema(example = 250)]
    pub bed_capacity: i32,
    /// Defaults to `bed_capacity` on insert; kept as-is on update.
    pub available_beds: Option<i32>,
    /// Comma separated text or an array.
    #[serde(default)]
    pub specialties: ListInput,
    pub status: Option<HospitalStatus>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[async_trait]
impl Command for SaveHospitalCommand {
    type Result = hospital::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(hospital_id = ?self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            counter!("edhms.hospital.save.failures", 1);
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();
        let specialties = self.specialties.clone().into_list();

        let (saved, event) = match self.id {
            Some(id) => {
                let existing = hospital::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Hospital {} not found", id)))?;

                let available_beds = self.available_beds.unwrap_or(existing.available_beds);
                let status = self.status.unwrap_or(existing.status);
                let mut active: hospital::ActiveModel = existing.into();
                active.name = Set(self.name.trim().to_string());
                active.address = Set(self.address.trim().to_string());
                active.phone = Set(self.phone.trim().to_string());
                active.email = Set(non_blank(self.email.clone()));
                active.emergency_contact = Set(self.emergency_contact.trim().to_string());
                active.bed_capacity = Set(self.bed_capacity);
                active.available_beds = Set(available_beds);
                active.specialties = Set(specialties.into());
                active.status = Set(status);
                active.latitude = Set(self.latitude);
                active.longitude = Set(self.longitude);

                let updated = active.update(db).await.map_err(|e| {
                    counter!("edhms.hospital.save.failures", 1);
                    error!(hospital_id = %id, "Failed to update hospital: {}", e);
                    ServiceError::DatabaseError(e)
                })?;
                (updated, Event::HospitalUpdated(id))
            }
            None => {
                let id = Uuid::new_v4();
                let hospital = hospital::ActiveModel {
                    id: Set(id),
                    name: Set(self.name.trim().to_string()),
                    address: Set(self.address.trim().to_string()),
                    phone: Set(self.phone.trim().to_string()),
                    email: Set(non_blank(self.email.clone())),
                    emergency_contact: Set(self.emergency_contact.trim().to_string()),
                    bed_capacity: Set(self.bed_capacity),
                    available_beds: Set(self.available_beds.unwrap_or(self.bed_capacity)),
                    specialties: Set(specialties.into()),
                    status: Set(self.status.unwrap_or_default()),
                    latitude: Set(self.latitude),
                    longitude: Set(self.longitude),
                    ..Default::default()
                };

                let inserted = hospital.insert(db).await.map_err(|e| {
                    counter!("edhms.hospital.save.failures", 1);
                    error!("Failed to create hospital {}: {}", self.name, e);
                    ServiceError::DatabaseError(e)
                })?;
                (inserted, Event::HospitalCreated(id))
            }
        };

        event_sender.send(event).await.map_err(|e| {
            error!("Failed to send hospital event: {}", e);
            ServiceError::EventError(e)
        })?;

        info!(
            hospital_id = %saved.id,
            bed_capacity = saved.bed_capacity,
            available_beds = saved.available_beds,
            "Hospital saved"
        );
        counter!("edhms.hospital.saved", 1);

        Ok(saved)
    }
}
