use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    services::{
        exports::{settings_export_filename, JsonAttachment},
        settings::{NotificationSettings, SettingsExport, SettingsView, SystemSettings},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApiKeyRequest {
    /// Key for the text-generation API; never echoed back
    pub api_key: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses((status = 200, description = "Console settings", body = ApiResponse<SettingsView>)),
    tag = "settings"
)]
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<SettingsView> {
    Ok(Json(ApiResponse::success(state.settings.view().await)))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/notifications",
    request_body = NotificationSettings,
    responses((status = 200, description = "Saved", body = ApiResponse<SettingsView>)),
    tag = "settings"
)]
pub async fn update_notifications(
    State(state): State<AppState>,
    Json(payload): Json<NotificationSettings>,
) -> ApiResult<SettingsView> {
    let view = state.settings.update_notifications(payload).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/system",
    request_body = SystemSettings,
    responses(
        (status = 200, description = "Saved", body = ApiResponse<SettingsView>),
        (status = 400, description = "Refresh interval out of range", body = crate::errors::ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn update_system(
    State(state): State<AppState>,
    Json(payload): Json<SystemSettings>,
) -> ApiResult<SettingsView> {
    let view = state.settings.update_system(payload).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/api-key",
    request_body = ApiKeyRequest,
    responses(
        (status = 200, description = "Saved", body = ApiResponse<SettingsView>),
        (status = 400, description = "Blank key", body = crate::errors::ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn set_api_key(
    State(state): State<AppState>,
    Json(payload): Json<ApiKeyRequest>,
) -> ApiResult<SettingsView> {
    let view = state.settings.set_api_key(&payload.api_key).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/settings/export",
    responses(
        (status = 200, description = "Settings file download without the API key", body = SettingsExport,
            headers(("Content-Disposition" = String, description = "attachment; filename=\"edhms-settings-{date}.json\"")))
    ),
    tag = "settings"
)]
pub async fn export_settings(State(state): State<AppState>) -> impl IntoResponse {
    let document = state.settings.export_document().await;
    JsonAttachment::new(settings_export_filename(Utc::now().date_naive()), document)
}

#[utoipa::path(
    post,
    path = "/api/v1/settings/import",
    request_body(content = SettingsExport, description = "A previously exported settings file"),
    responses(
        (status = 200, description = "Present sections applied", body = ApiResponse<SettingsView>),
        (status = 400, description = "Failed to import settings. Please check the file format.", body = crate::errors::ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn import_settings(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<SettingsView>>, ServiceError> {
    let view = state.settings.import_document(&body).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/settings",
    responses((status = 200, description = "All settings reset, API key removed", body = ApiResponse<SettingsView>)),
    tag = "settings"
)]
pub async fn clear_settings(State(state): State<AppState>) -> ApiResult<SettingsView> {
    let view = state.settings.clear().await?;
    Ok(Json(ApiResponse::success(view)))
}

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings).delete(clear_settings))
        .route("/notifications", put(update_notifications))
        .route("/system", put(update_system))
        .route("/api-key", put(set_api_key))
        .route("/export", get(export_settings))
        .route("/import", post(import_settings))
}
