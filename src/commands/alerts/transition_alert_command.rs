use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    commands::Command,
    db::DbPool,
    entities::emergency_alert,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{AlertAction, AlertStatus},
};

/// Moves an alert forward through its lifecycle.
///
/// The update is conditional on the status read, so two operators racing on
/// the same alert cannot both win.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionAlertCommand {
    pub alert_id: Uuid,
    pub action: AlertAction,
    pub resolved_by: Option<Uuid>,
}

#[async_trait]
impl Command for TransitionAlertCommand {
    type Result = emergency_alert::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(alert_id = %self.alert_id, action = %self.action))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let alert = emergency_alert::Entity::find_by_id(self.alert_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Alert {} not found", self.alert_id)))?;

        let current = alert.status;
        let target = self.action.target();
        if !current.can_transition_to(target) {
            counter!("edhms.alert.transition.rejected", 1);
            warn!(from = %current, to = %target, "Rejected alert transition");
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot {} an alert that is {}",
                self.action, current
            )));
        }

        let now = Utc::now();
        let mut update = emergency_alert::Entity::update_many()
            .col_expr(emergency_alert::Column::Status, Expr::value(target))
            .col_expr(emergency_alert::Column::UpdatedAt, Expr::value(now));
        if target == AlertStatus::Resolved {
            update = update
                .col_expr(emergency_alert::Column::ResolvedAt, Expr::value(Some(now)))
                .col_expr(
                    emergency_alert::Column::ResolvedBy,
                    Expr::value(self.resolved_by),
                );
        }
        let result = update
            .filter(emergency_alert::Column::Id.eq(self.alert_id))
            .filter(emergency_alert::Column::Status.eq(current))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "Alert {} changed while it was being updated",
                self.alert_id
            )));
        }

        let updated = emergency_alert::Entity::find_by_id(self.alert_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Alert {} not found", self.alert_id)))?;

        event_sender
            .send(Event::AlertStatusChanged {
                alert_id: updated.id,
                old_status: current,
                new_status: updated.status,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(from = %current, to = %updated.status, "Alert status changed");
        counter!("edhms.alert.transitions", 1, "to" => target.to_string());
        Ok(updated)
    }
}
