use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    db::DbPool,
    entities::{hospital, medical_record, patient},
    errors::ServiceError,
    events::{Event, EventSender},
    forms::{non_blank, ListInput},
    models::{Severity, VisitType},
};

pub(crate) const RECORD_STATUS_ACTIVE: &str = "active";
pub(crate) const NO_HOSPITALS_MESSAGE: &str = "No hospitals found. Please add a hospital first.";

/// Adds a visit to a patient's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMedicalRecordCommand {
    /// Patient row id, taken from the path.
    #[serde(skip)]
    pub patient_id: Uuid,
    /// Falls back to the first hospital by name.
    pub hospital_id: Option<Uuid>,
    pub practitioner_id: Option<Uuid>,
    #[schema(example = "Acute appendicitis")]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub symptoms: ListInput,
    pub treatment: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub medications: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub vital_signs: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub test_results: Option<Value>,
    pub notes: Option<String>,
    pub severity_level: Option<Severity>,
    pub visit_type: Option<VisitType>,
    pub visit_date: Option<DateTime<Utc>>,
}

/// Explicit hospital when given, else the first by name.
pub(crate) async fn resolve_hospital<C: ConnectionTrait>(
    db: &C,
    requested: Option<Uuid>,
) -> Result<hospital::Model, ServiceError> {
    match requested {
        Some(id) => hospital::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Hospital {} not found", id))),
        None => hospital::Entity::find()
            .order_by_asc(hospital::Column::Name)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::MissingPrerequisite(NO_HOSPITALS_MESSAGE.to_string())),
    }
}

impl CreateMedicalRecordCommand {
    /// Inserts the record on an existing connection or transaction.
    pub(crate) async fn insert_with<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<medical_record::Model, ServiceError> {
        let hospital = resolve_hospital(db, self.hospital_id).await?;

        medical_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            patient_id: Set(self.patient_id),
            hospital_id: Set(hospital.id),
            practitioner_id: Set(self.practitioner_id),
            diagnosis: Set(non_blank(self.diagnosis.clone())),
            symptoms: Set(self.symptoms.clone().into_list().into()),
            treatment: Set(non_blank(self.treatment.clone())),
            medications: Set(self.medications.clone()),
            vital_signs: Set(self.vital_signs.clone()),
            test_results: Set(self.test_results.clone()),
            notes: Set(non_blank(self.notes.clone())),
            severity_level: Set(Some(self.severity_level.unwrap_or_default())),
            visit_type: Set(self.visit_type.unwrap_or_default()),
            status: Set(RECORD_STATUS_ACTIVE.to_string()),
            visit_date: Set(self.visit_date.unwrap_or_else(Utc::now)),
            discharge_date: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            counter!("edhms.medical_record.create.failures", 1);
            error!(patient_id = %self.patient_id, "Failed to create medical record: {}", e);
            ServiceError::DatabaseError(e)
        })
    }
}

#[async_trait]
impl Command for CreateMedicalRecordCommand {
    type Result = medical_record::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(patient_id = %self.patient_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        patient::Entity::find_by_id(self.patient_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient {} not found", self.patient_id)))?;

        let record = self.insert_with(db).await?;

        event_sender
            .send(Event::MedicalRecordCreated {
                record_id: record.id,
                patient_id: record.patient_id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(record_id = %record.id, hospital_id = %record.hospital_id, "Medical record created");
        counter!("edhms.medical_record.created", 1);
        Ok(record)
    }
}
