//! Advisory endpoints. Malformed model output is returned as data with
//! `outcome = "malformed"`; only transport failures become errors.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::post,
    Router,
};
use uuid::Uuid;

use crate::{
    handlers::analytics::RangeQuery,
    services::insights::{BedForecast, EmergencyInsight, InsightOutcome, PatientRiskInsight},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/insights/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient row id")),
    responses(
        (status = 200, description = "Risk assessment or the rejected raw text", body = Object),
        (status = 400, description = "AI API key is not configured", body = crate::errors::ErrorResponse),
        (status = 404, description = "Patient not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Text generation API failed", body = crate::errors::ErrorResponse)
    ),
    tag = "insights"
)]
pub async fn analyze_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<InsightOutcome<PatientRiskInsight>> {
    let outcome = state.services.insights.analyze_patient(id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/insights/bed-forecast",
    params(RangeQuery),
    responses(
        (status = 200, description = "Occupancy forecast or the rejected raw text", body = Object),
        (status = 400, description = "AI API key is not configured", body = crate::errors::ErrorResponse),
        (status = 502, description = "Text generation API failed", body = crate::errors::ErrorResponse)
    ),
    tag = "insights"
)]
pub async fn forecast_beds(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<InsightOutcome<BedForecast>> {
    let outcome = state
        .services
        .insights
        .forecast_beds(query.time_range()?)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/insights/emergency",
    responses(
        (status = 200, description = "Free-form situation summary or the rejected raw text", body = Object),
        (status = 400, description = "AI API key is not configured", body = crate::errors::ErrorResponse),
        (status = 502, description = "Text generation API failed", body = crate::errors::ErrorResponse)
    ),
    tag = "insights"
)]
pub async fn emergency_insights(
    State(state): State<AppState>,
) -> ApiResult<InsightOutcome<EmergencyInsight>> {
    let outcome = state.services.insights.emergency_insights().await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub fn insights_routes() -> Router<AppState> {
    Router::new()
        .route("/patients/:id", post(analyze_patient))
        .route("/bed-forecast", post(forecast_beds))
        .route("/emergency", post(emergency_insights))
}
