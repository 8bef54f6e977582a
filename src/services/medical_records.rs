use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{
        medical_records::{CreateMedicalRecordCommand, DischargeMedicalRecordCommand},
        Command,
    },
    db::DbPool,
    entities::{hospital, medical_record, patient},
    errors::ServiceError,
    events::EventSender,
};

/// One visit in a patient's history with the hospital it happened at.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub record: medical_record::Model,
    pub hospital_name: Option<String>,
}

#[derive(Clone)]
pub struct MedicalRecordService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MedicalRecordService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Visits newest first.
    #[instrument(skip(self))]
    pub async fn history(&self, patient_id: Uuid) -> Result<Vec<HistoryEntry>, ServiceError> {
        patient::Entity::find_by_id(patient_id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient {} not found", patient_id)))?;

        let rows = medical_record::Entity::find()
            .filter(medical_record::Column::PatientId.eq(patient_id))
            .order_by_desc(medical_record::Column::VisitDate)
            .find_also_related(hospital::Entity)
            .all(self.db_pool.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(record, hospital)| HistoryEntry {
                record,
                hospital_name: hospital.map(|h| h.name),
            })
            .collect())
    }

    #[instrument(skip(self, command))]
    pub async fn create(
        &self,
        command: CreateMedicalRecordCommand,
    ) -> Result<medical_record::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn discharge(&self, record_id: Uuid) -> Result<medical_record::Model, ServiceError> {
        DischargeMedicalRecordCommand { record_id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::{hospitals::SaveHospitalCommand, patients::AdmitPatientCommand},
        forms::ListInput,
        test_support::{memory_db, test_events},
    };
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn history_is_newest_first_with_hospital_name() {
        let db = memory_db().await;
        let (events, _rx) = test_events();
        SaveHospitalCommand {
            id: None,
            name: "Central".into(),
            address: "2 Core St".into(),
            phone: "555-0170".into(),
            email: None,
            emergency_contact: "555-0171".into(),
            bed_capacity: 60,
            available_beds: None,
            specialties: ListInput::default(),
            status: None,
            latitude: None,
            longitude: None,
        }
        .execute(db.clone(), events.clone())
        .await
        .unwrap();
        let admitted = AdmitPatientCommand {
            patient_id: Some("PAT-55".into()),
            name: "Rosa Diaz".into(),
            ..Default::default()
        }
        .execute(db.clone(), events.clone())
        .await
        .unwrap();

        let service = MedicalRecordService::new(db, events);
        let now = Utc::now();
        for (days_ago, diagnosis) in [(10, "Sprain"), (1, "Migraine"), (5, "Flu")] {
            service
                .create(CreateMedicalRecordCommand {
                    patient_id: admitted.patient.id,
                    diagnosis: Some(diagnosis.into()),
                    visit_date: Some(now - Duration::days(days_ago)),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let history = service.history(admitted.patient.id).await.unwrap();
        let diagnoses: Vec<_> = history
            .iter()
            .map(|e| e.record.diagnosis.clone().unwrap_or_default())
            .collect();
        assert_eq!(diagnoses, ["Migraine", "Flu", "Sprain"]);
        assert_eq!(history[0].hospital_name.as_deref(), Some("Central"));

        let discharged = service.discharge(history[0].record.id).await.unwrap();
        assert_eq!(discharged.status, "discharged");
        assert!(discharged.discharge_date.is_some());
        assert_matches!(
            service.discharge(history[0].record.id).await,
            Err(ServiceError::InvalidStatus(_))
        );
    }
}
