use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    errors::ServiceError,
    handlers::hospitals::HospitalSummary,
    services::{
        alerts::AlertView,
        analytics::{AnalyticsExport, AnalyticsReport, TimeRange},
        exports::{analytics_export_filename, JsonAttachment},
        parse_filter,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// `24h`, `7d`, `30d` or `90d`; defaults to `7d`
    pub range: Option<String>,
}

impl RangeQuery {
    pub fn time_range(&self) -> Result<TimeRange, ServiceError> {
        Ok(parse_filter::<TimeRange>("range", self.range.as_deref())?.unwrap_or_default())
    }
}

/// Headline keys are camelCase like the analytics report.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub total_hospitals: u64,
    pub total_patients: u64,
    pub available_beds: i64,
    /// Latest active alerts, newest first
    pub active_alerts: Vec<AlertView>,
    pub hospitals: Vec<HospitalSummary>,
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Headline figures for the console", body = ApiResponse<DashboardView>)
    ),
    tag = "analytics"
)]
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<DashboardView> {
    let summary = state.services.analytics.dashboard().await?;
    Ok(Json(ApiResponse::success(DashboardView {
        total_hospitals: summary.total_hospitals,
        total_patients: summary.total_patients,
        available_beds: summary.available_beds,
        active_alerts: summary.active_alerts,
        hospitals: summary.hospitals.into_iter().map(Into::into).collect(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics",
    params(RangeQuery),
    responses(
        (status = 200, description = "Metrics over the window", body = ApiResponse<AnalyticsReport>),
        (status = 400, description = "Unknown range", body = crate::errors::ErrorResponse)
    ),
    tag = "analytics"
)]
pub async fn analytics_report(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<AnalyticsReport> {
    let report = state.services.analytics.report(query.time_range()?).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics/export",
    params(RangeQuery),
    responses(
        (status = 200, description = "Analytics snapshot as a file download", body = AnalyticsExport,
            headers(("Content-Disposition" = String, description = "attachment; filename=\"emergency-analytics-{range}-{date}.json\"")))
    ),
    tag = "analytics"
)]
pub async fn export_analytics(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let range = query.time_range()?;
    let export = state.services.analytics.export(range).await?;
    let filename = analytics_export_filename(range, Utc::now().date_naive());
    Ok(JsonAttachment::new(filename, export))
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(analytics_report))
        .route("/export", get(export_analytics))
}
