use async_trait::async_trait;
use metrics::counter;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::{
    commands::Command,
    db::DbPool,
    entities::{department, hospital, practitioner},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Irreversibly removes a hospital with its departments and staff roster.
///
/// Medical records and alerts stay in place as clinical history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteHospitalCommand {
    pub id: Uuid,
    pub confirm: bool,
}

#[async_trait]
impl Command for DeleteHospitalCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender), fields(hospital_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if !self.confirm {
            return Err(ServiceError::ValidationError(
                "Deleting a hospital cannot be undone; repeat the request with confirm=true"
                    .to_string(),
            ));
        }

        let id = self.id;
        db_pool
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    hospital::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Hospital {} not found", id))
                        })?;

                    practitioner::Entity::delete_many()
                        .filter(practitioner::Column::HospitalId.eq(id))
                        .exec(txn)
                        .await?;
                    department::Entity::delete_many()
                        .filter(department::Column::HospitalId.eq(id))
                        .exec(txn)
                        .await?;
                    hospital::Entity::delete_by_id(id).exec(txn).await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| {
                let e = ServiceError::from(e);
                if !matches!(e, ServiceError::NotFound(_)) {
                    counter!("edhms.hospital.delete.failures", 1);
                    error!("Failed to delete hospital {}: {}", id, e);
                }
                e
            })?;

        event_sender
            .send(Event::HospitalDeleted(id))
            .await
            .map_err(ServiceError::EventError)?;

        warn!(hospital_id = %id, "Hospital permanently deleted");
        counter!("edhms.hospital.deleted", 1);
        Ok(())
    }
}
