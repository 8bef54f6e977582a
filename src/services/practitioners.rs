use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{
        practitioners::{SavePractitionerCommand, UpdateAvailabilityCommand},
        Command,
    },
    db::DbPool,
    entities::{hospital, practitioner},
    errors::ServiceError,
    events::EventSender,
};

#[derive(Clone)]
pub struct PractitionerService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PractitionerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Staff of a hospital ordered by name, optionally narrowed to one department.
    pub async fn list_for_hospital(
        &self,
        hospital_id: Uuid,
        department_id: Option<Uuid>,
    ) -> Result<Vec<practitioner::Model>, ServiceError> {
        hospital::Entity::find_by_id(hospital_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Hospital {} not found", hospital_id)))?;

        let mut query = practitioner::Entity::find()
            .filter(practitioner::Column::HospitalId.eq(hospital_id))
            .order_by_asc(practitioner::Column::Name);
        if let Some(department_id) = department_id {
            query = query.filter(practitioner::Column::DepartmentId.eq(department_id));
        }
        Ok(query.all(self.db_pool.as_ref()).await?)
    }

    #[instrument(skip(self, command))]
    pub async fn save(
        &self,
        command: SavePractitionerCommand,
    ) -> Result<practitioner::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn update_availability(
        &self,
        command: UpdateAvailabilityCommand,
    ) -> Result<practitioner::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::{departments::SaveDepartmentCommand, hospitals::SaveHospitalCommand},
        forms::ListInput,
        test_support::{memory_db, test_events},
    };
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn roster_filters_and_availability() {
        let db = memory_db().await;
        let (events, _rx) = test_events();
        let hospital = SaveHospitalCommand {
            id: None,
            name: "Eastgate".into(),
            address: "5 Gate St".into(),
            phone: "555-0160".into(),
            email: None,
            emergency_contact: "555-0161".into(),
            bed_capacity: 80,
            available_beds: None,
            specialties: ListInput::default(),
            status: None,
            latitude: None,
            longitude: None,
        }
        .execute(db.clone(), events.clone())
        .await
        .unwrap();
        let cardio = SaveDepartmentCommand {
            id: None,
            hospital_id: Some(hospital.id),
            name: "Cardiology".into(),
            head_doctor: None,
            phone: None,
            bed_count: None,
            available_beds: None,
            equipment: ListInput::Text("ECG, Defibrillator".into()),
            status: None,
        }
        .execute(db.clone(), events.clone())
        .await
        .unwrap();
        assert_eq!(cardio.status, "active");

        let service = PractitionerService::new(db, events);
        let base = SavePractitionerCommand {
            id: None,
            hospital_id: hospital.id,
            department_id: Some(cardio.id),
            user_id: None,
            name: "Dr. Imani Cole".into(),
            email: "imani.cole@example.org".into(),
            phone: None,
            specialization: "Cardiology".into(),
            license_number: "LIC-881".into(),
            experience_years: Some(12),
            availability_status: None,
        };
        let cole = service.save(base.clone()).await.unwrap();
        assert_eq!(cole.availability_status, "available");
        service
            .save(SavePractitionerCommand {
                department_id: None,
                name: "Dr. Ben Ito".into(),
                email: "ben.ito@example.org".into(),
                license_number: "LIC-882".into(),
                ..base.clone()
            })
            .await
            .unwrap();

        assert_eq!(service.list_for_hospital(hospital.id, None).await.unwrap().len(), 2);
        let in_cardio = service
            .list_for_hospital(hospital.id, Some(cardio.id))
            .await
            .unwrap();
        assert_eq!(in_cardio.len(), 1);
        assert_eq!(in_cardio[0].id, cole.id);

        let busy = service
            .update_availability(UpdateAvailabilityCommand {
                practitioner_id: cole.id,
                availability_status: " On_Call ".into(),
            })
            .await
            .unwrap();
        assert_eq!(busy.availability_status, "on_call");

        let bad_email = service
            .save(SavePractitionerCommand {
                email: "not-an-email".into(),
                ..base
            })
            .await
            .unwrap_err();
        assert_matches!(bad_email, ServiceError::ValidationError(_));
    }
}
