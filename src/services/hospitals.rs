use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{
        hospitals::{DeleteHospitalCommand, SaveHospitalCommand},
        Command,
    },
    db::{DbPool, SearchBuilder},
    entities::hospital,
    errors::ServiceError,
    events::EventSender,
    models::HospitalStatus,
    services::parse_filter,
};

/// Service for managing hospitals
#[derive(Clone)]
pub struct HospitalService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl HospitalService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Hospitals ordered by name, optionally searched by name or address and
    /// filtered by status.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        search: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<hospital::Model>, ServiceError> {
        let status: Option<HospitalStatus> = parse_filter("status", status)?;

        let mut query = hospital::Entity::find().order_by_asc(hospital::Column::Name);
        if let Some(condition) = SearchBuilder::new(search)
            .column(hospital::Column::Name)
            .column(hospital::Column::Address)
            .build()
        {
            query = query.filter(condition);
        }

        let hospitals = query.all(self.db_pool.as_ref()).await?;
        Ok(match status {
            Some(status) => hospitals.into_iter().filter(|h| h.status == status).collect(),
            None => hospitals,
        })
    }

    /// Picker list: active hospitals by name.
    pub async fn active(&self) -> Result<Vec<hospital::Model>, ServiceError> {
        Ok(hospital::Entity::find()
            .filter(hospital::Column::Status.eq(HospitalStatus::Active))
            .order_by_asc(hospital::Column::Name)
            .all(self.db_pool.as_ref())
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<hospital::Model, ServiceError> {
        hospital::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Hospital {} not found", id)))
    }

    #[instrument(skip(self, command))]
    pub async fn save(&self, command: SaveHospitalCommand) -> Result<hospital::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, confirm: bool) -> Result<(), ServiceError> {
        DeleteHospitalCommand { id, confirm }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }
}
