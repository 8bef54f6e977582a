use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::put,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    commands::departments::SaveDepartmentCommand,
    entities::department,
    errors::ServiceError,
    services::analytics::{as_percent, occupancy_rate},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentSummary {
    pub id: Uuid,
    pub hospital_id: Uuid,
    #[schema(example = "Emergency")]
    pub name: String,
    pub head_doctor: Option<String>,
    pub phone: Option<String>,
    pub bed_count: Option<i32>,
    pub available_beds: Option<i32>,
    /// Percentage of beds in use when both counts are known
    pub occupancy_rate: Option<f64>,
    pub equipment: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<department::Model> for DepartmentSummary {
    fn from(model: department::Model) -> Self {
        let occupancy = match (model.bed_count, model.available_beds) {
            (Some(beds), Some(available)) => as_percent(occupancy_rate(beds, available)),
            _ => None,
        };
        Self {
            id: model.id,
            hospital_id: model.hospital_id,
            name: model.name,
            head_doctor: model.head_doctor,
            phone: model.phone,
            bed_count: model.bed_count,
            available_beds: model.available_beds,
            occupancy_rate: occupancy,
            equipment: model.equipment.0,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/hospitals/{id}/departments",
    params(("id" = Uuid, Path, description = "Hospital id")),
    responses(
        (status = 200, description = "Departments ordered by name", body = ApiResponse<Vec<DepartmentSummary>>),
        (status = 404, description = "Hospital not found", body = crate::errors::ErrorResponse)
    ),
    tag = "departments"
)]
pub async fn list_departments(
    State(state): State<AppState>,
    Path(hospital_id): Path<Uuid>,
) -> ApiResult<Vec<DepartmentSummary>> {
    let departments = state
        .services
        .departments
        .list_for_hospital(hospital_id)
        .await?;
    Ok(Json(ApiResponse::success(
        departments.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/hospitals/{id}/departments",
    params(("id" = Uuid, Path, description = "Hospital id")),
    request_body = SaveDepartmentCommand,
    responses(
        (status = 201, description = "Department created", body = ApiResponse<DepartmentSummary>),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 404, description = "Hospital not found", body = crate::errors::ErrorResponse)
    ),
    tag = "departments"
)]
pub async fn create_department(
    State(state): State<AppState>,
    Path(hospital_id): Path<Uuid>,
    Json(mut payload): Json<SaveDepartmentCommand>,
) -> Result<(StatusCode, Json<ApiResponse<DepartmentSummary>>), ServiceError> {
    payload.id = None;
    payload.hospital_id = Some(hospital_id);
    let department = state.services.departments.save(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(department.into()))))
}

#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    params(("id" = Uuid, Path, description = "Department id")),
    request_body = SaveDepartmentCommand,
    responses(
        (status = 200, description = "Department updated", body = ApiResponse<DepartmentSummary>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "departments"
)]
pub async fn update_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<SaveDepartmentCommand>,
) -> ApiResult<DepartmentSummary> {
    payload.id = Some(id);
    let department = state.services.departments.save(payload).await?;
    Ok(Json(ApiResponse::success(department.into())))
}

pub fn departments_routes() -> Router<AppState> {
    Router::new().route("/:id", put(update_department))
}
