use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{medical_records::CreateMedicalRecordCommand, Command},
    db::DbPool,
    entities::{medical_record, patient},
    errors::ServiceError,
    events::{Event, EventSender},
    forms::{non_blank, ListInput, TagListEditor},
    models::{Severity, VisitType},
};

/// Patient intake: registers the patient (or reuses an existing one with the
/// same business identifier) and optionally opens a visit record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdmitPatientCommand {
    /// Business identifier; generated as `PAT-{unix_millis}` when blank.
    #[schema(example = "PAT-1718000000000")]
    pub patient_id: Option<String>,
    #[validate(length(min = 1, message = "Patient name is required"))]
    #[schema(example = "Jordan Reyes")]
    pub name: String,
    #[validate(range(min = 0, max = 150))]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub insurance_info: Option<Value>,

    /// A visit record is opened only when this is non-blank.
    pub diagnosis: Option<String>,
    pub hospital_id: Option<Uuid>,
    #[serde(default)]
    pub symptoms: ListInput,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub severity_level: Option<Severity>,
    pub visit_type: Option<VisitType>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdmissionOutcome {
    #[schema(value_type = Object)]
    pub patient: patient::Model,
    /// False when the business identifier already existed.
    pub created: bool,
    #[schema(value_type = Option<Object>)]
    pub record: Option<medical_record::Model>,
}

pub(crate) fn generate_patient_id() -> String {
    format!("PAT-{}", Utc::now().timestamp_millis())
}

impl AdmitPatientCommand {
    fn business_id(&self) -> String {
        non_blank(self.patient_id.clone()).unwrap_or_else(generate_patient_id)
    }

    fn candidate(&self, business_id: &str) -> patient::ActiveModel {
        let now = Utc::now();
        // Bulk insert bypasses ActiveModelBehavior, so timestamps are set here.
        patient::ActiveModel {
            id: Set(Uuid::new_v4()),
            patient_id: Set(business_id.to_string()),
            name: Set(self.name.trim().to_string()),
            age: Set(self.age),
            gender: Set(non_blank(self.gender.clone())),
            phone: Set(non_blank(self.phone.clone())),
            email: Set(non_blank(self.email.clone())),
            address: Set(non_blank(self.address.clone())),
            blood_type: Set(non_blank(self.blood_type.clone())),
            allergies: Set(TagListEditor::from_values(&self.allergies).into_vec().into()),
            chronic_conditions: Set(TagListEditor::from_values(&self.chronic_conditions)
                .into_vec()
                .into()),
            emergency_contact_name: Set(non_blank(self.emergency_contact_name.clone())),
            emergency_contact_phone: Set(non_blank(self.emergency_contact_phone.clone())),
            insurance_info: Set(self.insurance_info.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    fn visit(&self, patient_row: Uuid) -> Option<CreateMedicalRecordCommand> {
        let diagnosis = non_blank(self.diagnosis.clone())?;
        Some(CreateMedicalRecordCommand {
            patient_id: patient_row,
            hospital_id: self.hospital_id,
            diagnosis: Some(diagnosis),
            symptoms: self.symptoms.clone(),
            treatment: self.treatment.clone(),
            notes: self.notes.clone(),
            severity_level: self.severity_level,
            visit_type: self.visit_type,
            ..Default::default()
        })
    }
}

#[async_trait]
impl Command for AdmitPatientCommand {
    type Result = AdmissionOutcome;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            counter!("edhms.patient.intake.failures", 1);
            ServiceError::ValidationError(e.to_string())
        })?;

        let business_id = self.business_id();
        let command = self.clone();
        let lookup_id = business_id.clone();

        let outcome = db_pool
            .transaction::<_, AdmissionOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let inserted = patient::Entity::insert(command.candidate(&lookup_id))
                        .on_conflict(
                            OnConflict::column(patient::Column::PatientId)
                                .do_nothing()
                                .to_owned(),
                        )
                        .exec_without_returning(txn)
                        .await?;

                    let patient = patient::Entity::find()
                        .filter(patient::Column::PatientId.eq(lookup_id.as_str()))
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::InternalError(format!(
                                "Patient {} vanished during intake",
                                lookup_id
                            ))
                        })?;

                    let record = match command.visit(patient.id) {
                        Some(visit) => Some(visit.insert_with(txn).await?),
                        None => None,
                    };

                    Ok(AdmissionOutcome {
                        patient,
                        created: inserted > 0,
                        record,
                    })
                })
            })
            .await
            .map_err(|e| {
                let e = ServiceError::from(e);
                counter!("edhms.patient.intake.failures", 1);
                error!(patient_id = %business_id, "Patient intake failed: {}", e);
                e
            })?;

        if outcome.created {
            event_sender
                .send(Event::PatientCreated(outcome.patient.id))
                .await
                .map_err(ServiceError::EventError)?;
        }
        if let Some(record) = &outcome.record {
            event_sender
                .send(Event::MedicalRecordCreated {
                    record_id: record.id,
                    patient_id: outcome.patient.id,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }

        info!(
            patient_id = %outcome.patient.patient_id,
            created = outcome.created,
            record_opened = outcome.record.is_some(),
            "Patient intake completed"
        );
        counter!("edhms.patient.intake", 1, "created" => outcome.created.to_string());

        Ok(outcome)
    }
}
