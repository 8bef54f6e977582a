use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    commands::{
        medical_records::CreateMedicalRecordCommand,
        patients::{AdmitPatientCommand, UpdatePatientCommand},
    },
    entities::{medical_record, patient},
    errors::ServiceError,
    models::{BadgeVariant, Severity, VisitType},
    services::medical_records::HistoryEntry,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientSearchQuery {
    /// Matches name, patient id or phone
    pub search: Option<String>,
    /// Optional cap; every match is returned when absent
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "7d0e8400-e29b-41d4-a716-446655440000",
    "patient_id": "PAT-1718000000000",
    "name": "Jordan Reyes",
    "age": 42,
    "gender": "female",
    "phone": "555-0142",
    "email": null,
    "address": null,
    "blood_type": "O+",
    "allergies": ["Penicillin"],
    "chronic_conditions": [],
    "emergency_contact_name": "Sam Reyes",
    "emergency_contact_phone": "555-0143",
    "insurance_info": null,
    "created_at": "2024-12-09T10:30:00Z",
    "updated_at": "2024-12-09T10:30:00Z"
}))]
pub struct PatientSummary {
    pub id: Uuid,
    /// Business identifier
    pub patient_id: String,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Vec<String>,
    pub chronic_conditions: Vec<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub insurance_info: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<patient::Model> for PatientSummary {
    fn from(model: patient::Model) -> Self {
        Self {
            id: model.id,
            patient_id: model.patient_id,
            name: model.name,
            age: model.age,
            gender: model.gender,
            phone: model.phone,
            email: model.email,
            address: model.address,
            blood_type: model.blood_type,
            allergies: model.allergies.0,
            chronic_conditions: model.chronic_conditions.0,
            emergency_contact_name: model.emergency_contact_name,
            emergency_contact_phone: model.emergency_contact_phone,
            insurance_info: model.insurance_info,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MedicalRecordSummary {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub hospital_id: Uuid,
    pub hospital_name: Option<String>,
    pub practitioner_id: Option<Uuid>,
    pub diagnosis: Option<String>,
    pub symptoms: Vec<String>,
    pub treatment: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub medications: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub vital_signs: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub test_results: Option<Value>,
    pub notes: Option<String>,
    pub severity_level: Option<Severity>,
    pub severity_badge: Option<BadgeVariant>,
    pub visit_type: VisitType,
    pub status: String,
    pub visit_date: DateTime<Utc>,
    pub discharge_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MedicalRecordSummary {
    fn new(record: medical_record::Model, hospital_name: Option<String>) -> Self {
        Self {
            id: record.id,
            patient_id: record.patient_id,
            hospital_id: record.hospital_id,
            hospital_name,
            practitioner_id: record.practitioner_id,
            diagnosis: record.diagnosis,
            symptoms: record.symptoms.0,
            treatment: record.treatment,
            medications: record.medications,
            vital_signs: record.vital_signs,
            test_results: record.test_results,
            notes: record.notes,
            severity_badge: record.severity_level.map(|s| s.badge()),
            severity_level: record.severity_level,
            visit_type: record.visit_type,
            status: record.status,
            visit_date: record.visit_date,
            discharge_date: record.discharge_date,
            created_at: record.created_at,
        }
    }
}

impl From<HistoryEntry> for MedicalRecordSummary {
    fn from(entry: HistoryEntry) -> Self {
        Self::new(entry.record, entry.hospital_name)
    }
}

impl From<medical_record::Model> for MedicalRecordSummary {
    fn from(record: medical_record::Model) -> Self {
        Self::new(record, None)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IntakeResponse {
    pub patient: PatientSummary,
    /// False when the patient id was already registered
    pub created: bool,
    pub record: Option<MedicalRecordSummary>,
}

#[utoipa::path(
    get,
    path = "/api/v1/patients",
    params(PatientSearchQuery),
    responses(
        (status = 200, description = "Matching patients by name", body = ApiResponse<Vec<PatientSummary>>)
    ),
    tag = "patients"
)]
pub async fn search_patients(
    State(state): State<AppState>,
    Query(query): Query<PatientSearchQuery>,
) -> ApiResult<Vec<PatientSummary>> {
    let patients = state
        .services
        .patients
        .search(query.search.as_deref(), query.limit)
        .await?;
    Ok(Json(ApiResponse::success(
        patients.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/patients/intake",
    request_body = AdmitPatientCommand,
    responses(
        (status = 201, description = "Patient registered", body = ApiResponse<IntakeResponse>),
        (status = 200, description = "Existing patient reused", body = ApiResponse<IntakeResponse>),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 422, description = "No hospital to attach the visit to", body = crate::errors::ErrorResponse)
    ),
    tag = "patients"
)]
pub async fn admit_patient(
    State(state): State<AppState>,
    Json(payload): Json<AdmitPatientCommand>,
) -> Result<(StatusCode, Json<ApiResponse<IntakeResponse>>), ServiceError> {
    let outcome = state.services.patients.admit(payload).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let response = IntakeResponse {
        patient: outcome.patient.into(),
        created: outcome.created,
        record: outcome.record.map(Into::into),
    };
    Ok((status, Json(ApiResponse::success(response))))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient row id")),
    responses(
        (status = 200, description = "Patient", body = ApiResponse<PatientSummary>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "patients"
)]
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PatientSummary> {
    let patient = state.services.patients.get(id).await?;
    Ok(Json(ApiResponse::success(patient.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient row id")),
    request_body = UpdatePatientCommand,
    responses(
        (status = 200, description = "Patient updated", body = ApiResponse<PatientSummary>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "patients"
)]
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdatePatientCommand>,
) -> ApiResult<PatientSummary> {
    payload.id = id;
    let patient = state.services.patients.update(payload).await?;
    Ok(Json(ApiResponse::success(patient.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/records",
    params(("id" = Uuid, Path, description = "Patient row id")),
    responses(
        (status = 200, description = "Visits newest first", body = ApiResponse<Vec<MedicalRecordSummary>>),
        (status = 404, description = "Patient not found", body = crate::errors::ErrorResponse)
    ),
    tag = "patients"
)]
pub async fn patient_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<MedicalRecordSummary>> {
    let history = state.services.medical_records.history(id).await?;
    Ok(Json(ApiResponse::success(
        history.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/patients/{id}/records",
    params(("id" = Uuid, Path, description = "Patient row id")),
    request_body = CreateMedicalRecordCommand,
    responses(
        (status = 201, description = "Visit recorded", body = ApiResponse<MedicalRecordSummary>),
        (status = 404, description = "Patient not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "No hospital to attach the visit to", body = crate::errors::ErrorResponse)
    ),
    tag = "patients"
)]
pub async fn create_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<CreateMedicalRecordCommand>,
) -> Result<(StatusCode, Json<ApiResponse<MedicalRecordSummary>>), ServiceError> {
    payload.patient_id = id;
    let record = state.services.medical_records.create(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record.into()))))
}

#[utoipa::path(
    post,
    path = "/api/v1/medical-records/{id}/discharge",
    params(("id" = Uuid, Path, description = "Medical record id")),
    responses(
        (status = 200, description = "Patient discharged", body = ApiResponse<MedicalRecordSummary>),
        (status = 400, description = "Already discharged", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "patients"
)]
pub async fn discharge_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MedicalRecordSummary> {
    let record = state.services.medical_records.discharge(id).await?;
    Ok(Json(ApiResponse::success(record.into())))
}

pub fn patients_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search_patients))
        .route("/intake", post(admit_patient))
        .route("/:id", get(get_patient).put(update_patient))
        .route("/:id/records", get(patient_history).post(create_record))
}

pub fn medical_records_routes() -> Router<AppState> {
    Router::new().route("/:id/discharge", post(discharge_record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StringList;

    #[test]
    fn record_summary_badges_severity() {
        let now = Utc::now();
        let record = medical_record::Model {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            hospital_id: Uuid::new_v4(),
            practitioner_id: None,
            diagnosis: Some("Fracture".into()),
            symptoms: StringList(vec!["pain".into()]),
            treatment: None,
            medications: None,
            vital_signs: Some(json!({"bp": "120/80"})),
            test_results: None,
            notes: None,
            severity_level: Some(Severity::Critical),
            visit_type: VisitType::Emergency,
            status: "active".into(),
            visit_date: now,
            discharge_date: None,
            created_at: now,
            updated_at: now,
        };
        let summary = MedicalRecordSummary::from(HistoryEntry {
            record,
            hospital_name: Some("Central".into()),
        });
        assert_eq!(summary.severity_badge, Some(BadgeVariant::Destructive));
        assert_eq!(summary.hospital_name.as_deref(), Some("Central"));
        assert_eq!(summary.symptoms, ["pain"]);
    }
}
