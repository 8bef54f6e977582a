use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    commands::hospitals::SaveHospitalCommand,
    entities::hospital,
    errors::ServiceError,
    handlers::departments::{create_department, list_departments},
    handlers::practitioners::list_practitioners,
    models::{hospital_badge, BadgeVariant, HospitalStatus},
    services::analytics::{as_percent, occupancy_rate},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HospitalListQuery {
    /// Case-insensitive match on name or address
    pub search: Option<String>,
    /// `active`, `inactive`, `maintenance` or `all`
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteHospitalQuery {
    /// Must be `true` for the delete to go through
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "550e8400-e29b-41d4-a716-446655440000",
    "name": "St. Mary's General",
    "address": "12 Harbour Road",
    "phone": "555-0100",
    "email": "er@stmarys.example",
    "emergency_contact": "555-0199",
    "bed_capacity": 200,
    "available_beds": 24,
    "occupancy_rate": 88.0,
    "badge": "secondary",
    "specialties": ["Cardiology", "Trauma"],
    "status": "active",
    "latitude": null,
    "longitude": null,
    "created_at": "2024-12-09T10:30:00Z",
    "updated_at": "2024-12-09T10:30:00Z"
}))]
pub struct HospitalSummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: Option<String>,
    pub emergency_contact: String,
    pub bed_capacity: i32,
    pub available_beds: i32,
    /// Percentage of beds in use; `null` without capacity
    pub occupancy_rate: Option<f64>,
    pub badge: BadgeVariant,
    pub specialties: Vec<String>,
    pub status: HospitalStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<hospital::Model> for HospitalSummary {
    fn from(model: hospital::Model) -> Self {
        Self {
            occupancy_rate: as_percent(occupancy_rate(model.bed_capacity, model.available_beds)),
            badge: hospital_badge(model.status, model.bed_capacity, model.available_beds),
            id: model.id,
            name: model.name,
            address: model.address,
            phone: model.phone,
            email: model.email,
            emergency_contact: model.emergency_contact,
            bed_capacity: model.bed_capacity,
            available_beds: model.available_beds,
            specialties: model.specialties.0,
            status: model.status,
            latitude: model.latitude,
            longitude: model.longitude,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn summaries(models: Vec<hospital::Model>) -> Vec<HospitalSummary> {
    models.into_iter().map(HospitalSummary::from).collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/hospitals",
    params(HospitalListQuery),
    responses(
        (status = 200, description = "Hospitals ordered by name", body = ApiResponse<Vec<HospitalSummary>>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "hospitals"
)]
pub async fn list_hospitals(
    State(state): State<AppState>,
    Query(query): Query<HospitalListQuery>,
) -> ApiResult<Vec<HospitalSummary>> {
    let hospitals = state
        .services
        .hospitals
        .list(query.search.as_deref(), query.status.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(summaries(hospitals))))
}

#[utoipa::path(
    get,
    path = "/api/v1/hospitals/active",
    responses(
        (status = 200, description = "Active hospitals for pickers", body = ApiResponse<Vec<HospitalSummary>>)
    ),
    tag = "hospitals"
)]
pub async fn list_active_hospitals(State(state): State<AppState>) -> ApiResult<Vec<HospitalSummary>> {
    let hospitals = state.services.hospitals.active().await?;
    Ok(Json(ApiResponse::success(summaries(hospitals))))
}

#[utoipa::path(
    get,
    path = "/api/v1/hospitals/{id}",
    params(("id" = Uuid, Path, description = "Hospital id")),
    responses(
        (status = 200, description = "Hospital", body = ApiResponse<HospitalSummary>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "hospitals"
)]
pub async fn get_hospital(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<HospitalSummary> {
    let hospital = state.services.hospitals.get(id).await?;
    Ok(Json(ApiResponse::success(hospital.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/hospitals",
    request_body = SaveHospitalCommand,
    responses(
        (status = 201, description = "Hospital created", body = ApiResponse<HospitalSummary>),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse)
    ),
    tag = "hospitals"
)]
pub async fn create_hospital(
    State(state): State<AppState>,
    Json(mut payload): Json<SaveHospitalCommand>,
) -> Result<(StatusCode, Json<ApiResponse<HospitalSummary>>), ServiceError> {
    payload.id = None;
    let hospital = state.services.hospitals.save(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(hospital.into()))))
}

#[utoipa::path(
    put,
    path = "/api/v1/hospitals/{id}",
    params(("id" = Uuid, Path, description = "Hospital id")),
    request_body = SaveHospitalCommand,
    responses(
        (status = 200, description = "Hospital updated", body = ApiResponse<HospitalSummary>),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "hospitals"
)]
pub async fn update_hospital(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<SaveHospitalCommand>,
) -> ApiResult<HospitalSummary> {
    payload.id = Some(id);
    let hospital = state.services.hospitals.save(payload).await?;
    Ok(Json(ApiResponse::success(hospital.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/hospitals/{id}",
    params(("id" = Uuid, Path, description = "Hospital id"), DeleteHospitalQuery),
    responses(
        (status = 200, description = "Hospital deleted with its departments and practitioners"),
        (status = 400, description = "Deletion not confirmed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "hospitals"
)]
pub async fn delete_hospital(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteHospitalQuery>,
) -> ApiResult<serde_json::Value> {
    state.services.hospitals.delete(id, query.confirm).await?;
    Ok(Json(ApiResponse::success(json!({ "id": id, "deleted": true }))))
}

pub fn hospitals_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_hospitals).post(create_hospital))
        .route("/active", get(list_active_hospitals))
        .route(
            "/:id",
            get(get_hospital).put(update_hospital).delete(delete_hospital),
        )
        .route("/:id/departments", get(list_departments).post(create_department))
        .route("/:id/practitioners", get(list_practitioners))
}
