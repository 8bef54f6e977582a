use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{departments::SaveDepartmentCommand, Command},
    db::DbPool,
    entities::{department, hospital},
    errors::ServiceError,
    events::EventSender,
};

#[derive(Clone)]
pub struct DepartmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl DepartmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Departments of a hospital ordered by name.
    pub async fn list_for_hospital(
        &self,
        hospital_id: Uuid,
    ) -> Result<Vec<department::Model>, ServiceError> {
        hospital::Entity::find_by_id(hospital_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Hospital {} not found", hospital_id)))?;

        Ok(department::Entity::find()
            .filter(department::Column::HospitalId.eq(hospital_id))
            .order_by_asc(department::Column::Name)
            .all(self.db_pool.as_ref())
            .await?)
    }

    #[instrument(skip(self, command))]
    pub async fn save(
        &self,
        command: SaveDepartmentCommand,
    ) -> Result<department::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }
}
