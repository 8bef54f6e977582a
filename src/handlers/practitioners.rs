use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    commands::practitioners::{SavePractitionerCommand, UpdateAvailabilityCommand},
    entities::practitioner,
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PractitionerListQuery {
    /// Narrow the list to one department
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PractitionerSummary {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub department_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[schema(example = "Dr. Amara Okafor")]
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialization: String,
    pub license_number: String,
    pub experience_years: Option<i32>,
    #[schema(example = "available")]
    pub availability_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<practitioner::Model> for PractitionerSummary {
    fn from(model: practitioner::Model) -> Self {
        Self {
            id: model.id,
            hospital_id: model.hospital_id,
            department_id: model.department_id,
            user_id: model.user_id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            specialization: model.specialization,
            license_number: model.license_number,
            experience_years: model.experience_years,
            availability_status: model.availability_status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/hospitals/{id}/practitioners",
    params(("id" = Uuid, Path, description = "Hospital id"), PractitionerListQuery),
    responses(
        (status = 200, description = "Practitioners ordered by name", body = ApiResponse<Vec<PractitionerSummary>>),
        (status = 404, description = "Hospital not found", body = crate::errors::ErrorResponse)
    ),
    tag = "practitioners"
)]
pub async fn list_practitioners(
    State(state): State<AppState>,
    Path(hospital_id): Path<Uuid>,
    Query(query): Query<PractitionerListQuery>,
) -> ApiResult<Vec<PractitionerSummary>> {
    let practitioners = state
        .services
        .practitioners
        .list_for_hospital(hospital_id, query.department_id)
        .await?;
    Ok(Json(ApiResponse::success(
        practitioners.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/practitioners",
    request_body = SavePractitionerCommand,
    responses(
        (status = 201, description = "Practitioner created", body = ApiResponse<PractitionerSummary>),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 404, description = "Hospital or department not found", body = crate::errors::ErrorResponse)
    ),
    tag = "practitioners"
)]
pub async fn create_practitioner(
    State(state): State<AppState>,
    Json(mut payload): Json<SavePractitionerCommand>,
) -> Result<(StatusCode, Json<ApiResponse<PractitionerSummary>>), ServiceError> {
    payload.id = None;
    let practitioner = state.services.practitioners.save(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(practitioner.into()))))
}

#[utoipa::path(
    put,
    path = "/api/v1/practitioners/{id}",
    params(("id" = Uuid, Path, description = "Practitioner id")),
    request_body = SavePractitionerCommand,
    responses(
        (status = 200, description = "Practitioner updated", body = ApiResponse<PractitionerSummary>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "practitioners"
)]
pub async fn update_practitioner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<SavePractitionerCommand>,
) -> ApiResult<PractitionerSummary> {
    payload.id = Some(id);
    let practitioner = state.services.practitioners.save(payload).await?;
    Ok(Json(ApiResponse::success(practitioner.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/practitioners/{id}/availability",
    params(("id" = Uuid, Path, description = "Practitioner id")),
    request_body = UpdateAvailabilityCommand,
    responses(
        (status = 200, description = "Availability updated", body = ApiResponse<PractitionerSummary>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "practitioners"
)]
pub async fn update_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateAvailabilityCommand>,
) -> ApiResult<PractitionerSummary> {
    payload.practitioner_id = id;
    let practitioner = state
        .services
        .practitioners
        .update_availability(payload)
        .await?;
    Ok(Json(ApiResponse::success(practitioner.into())))
}

pub fn practitioners_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_practitioner))
        .route("/:id", put(update_practitioner))
        .route("/:id/availability", put(update_availability))
}
