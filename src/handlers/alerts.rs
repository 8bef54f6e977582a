use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    commands::alerts::SaveAlertCommand,
    errors::ServiceError,
    models::AlertAction,
    services::{
        alerts::{AlertFilter, AlertListing, AlertView, BoardSnapshot},
        parse_filter,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AlertListQuery {
    /// `active`, `acknowledged`, `resolved` or `all`
    pub status: Option<String>,
    /// `low`, `medium`, `high`, `critical` or `all`
    pub severity: Option<String>,
    /// Matches title, description, hospital or patient name
    pub search: Option<String>,
}

impl AlertListQuery {
    fn into_filter(self) -> Result<AlertFilter, ServiceError> {
        Ok(AlertFilter {
            status: parse_filter("status", self.status.as_deref())?,
            severity: parse_filter("severity", self.severity.as_deref())?,
            search: self.search,
        })
    }
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ResolveAlertRequest {
    /// Practitioner or user closing the alert
    pub resolved_by: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/alerts",
    params(AlertListQuery),
    responses(
        (status = 200, description = "Alerts newest first with per-status counts", body = ApiResponse<AlertListing>),
        (status = 400, description = "Unknown filter value", body = crate::errors::ErrorResponse)
    ),
    tag = "alerts"
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertListQuery>,
) -> ApiResult<AlertListing> {
    let filter = query.into_filter()?;
    let listing = state.services.alerts.list(&filter).await?;
    Ok(Json(ApiResponse::success(listing)))
}

#[utoipa::path(
    get,
    path = "/api/v1/alerts/board",
    responses(
        (status = 200, description = "Live board kept current by change signals", body = ApiResponse<BoardSnapshot>)
    ),
    tag = "alerts"
)]
pub async fn alert_board(State(state): State<AppState>) -> ApiResult<BoardSnapshot> {
    Ok(Json(ApiResponse::success(state.alert_board.snapshot().await)))
}

#[utoipa::path(
    get,
    path = "/api/v1/alerts/{id}",
    params(("id" = Uuid, Path, description = "Alert id")),
    responses(
        (status = 200, description = "Alert", body = ApiResponse<AlertView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "alerts"
)]
pub async fn get_alert(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<AlertView> {
    let alert = state.services.alerts.get(id).await?;
    Ok(Json(ApiResponse::success(alert)))
}

#[utoipa::path(
    post,
    path = "/api/v1/alerts",
    request_body = SaveAlertCommand,
    responses(
        (status = 201, description = "Alert raised", body = ApiResponse<AlertView>),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 404, description = "Hospital or patient not found", body = crate::errors::ErrorResponse)
    ),
    tag = "alerts"
)]
pub async fn create_alert(
    State(state): State<AppState>,
    Json(mut payload): Json<SaveAlertCommand>,
) -> Result<(StatusCode, Json<ApiResponse<AlertView>>), ServiceError> {
    payload.id = None;
    let alert = state.services.alerts.save(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(alert))))
}

#[utoipa::path(
    put,
    path = "/api/v1/alerts/{id}",
    params(("id" = Uuid, Path, description = "Alert id")),
    request_body = SaveAlertCommand,
    responses(
        (status = 200, description = "Alert details updated; status unchanged", body = ApiResponse<AlertView>),
        (status = 400, description = "Invalid form", body = crate::errors::ErrorResponse),
        (status = 404, description = "Alert, hospital or patient not found", body = crate::errors::ErrorResponse)
    ),
    tag = "alerts"
)]
pub async fn update_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<SaveAlertCommand>,
) -> ApiResult<AlertView> {
    payload.id = Some(id);
    let alert = state.services.alerts.save(payload).await?;
    Ok(Json(ApiResponse::success(alert)))
}

#[utoipa::path(
    post,
    path = "/api/v1/alerts/{id}/acknowledge",
    params(("id" = Uuid, Path, description = "Alert id")),
    responses(
        (status = 200, description = "Alert acknowledged", body = ApiResponse<AlertView>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Alert changed concurrently", body = crate::errors::ErrorResponse)
    ),
    tag = "alerts"
)]
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AlertView> {
    let alert = state
        .services
        .alerts
        .transition(id, AlertAction::Acknowledge, None)
        .await?;
    Ok(Json(ApiResponse::success(alert)))
}

#[utoipa::path(
    post,
    path = "/api/v1/alerts/{id}/resolve",
    params(("id" = Uuid, Path, description = "Alert id")),
    request_body(content = Option<ResolveAlertRequest>, description = "Optional resolver"),
    responses(
        (status = 200, description = "Alert resolved", body = ApiResponse<AlertView>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Alert changed concurrently", body = crate::errors::ErrorResponse)
    ),
    tag = "alerts"
)]
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ResolveAlertRequest>>,
) -> ApiResult<AlertView> {
    let resolved_by = payload.and_then(|Json(body)| body.resolved_by);
    let alert = state
        .services
        .alerts
        .transition(id, AlertAction::Resolve, resolved_by)
        .await?;
    Ok(Json(ApiResponse::success(alert)))
}

pub fn alerts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_alerts).post(create_alert))
        .route("/board", get(alert_board))
        .route("/:id", get(get_alert).put(update_alert))
        .route("/:id/acknowledge", post(acknowledge_alert))
        .route("/:id/resolve", post(resolve_alert))
}
