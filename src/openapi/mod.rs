use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{commands, errors, handlers, models, services};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EDHMS API",
        version = "1.0.0",
        description = r#"
# Emergency Healthcare Management API

Backend for the emergency operations console.

## Features

- **Hospitals**: capacity, occupancy badges, departments and practitioners
- **Patients**: intake with de-duplication by patient id, visit history, discharge
- **Emergency alerts**: raise, acknowledge and resolve; live board kept current by change signals
- **Analytics**: occupancy, daily admissions, per-hospital performance and JSON exports
- **AI insights**: advisory risk assessments and bed forecasts; malformed model output is returned as data
- **Settings**: console preferences with file export and import

## Error Handling

Failures share one body:

```json
{
  "error": "Bad Request",
  "message": "Validation error: Hospital name is required",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "hospitals", description = "Hospital registry"),
        (name = "departments", description = "Hospital departments"),
        (name = "practitioners", description = "Medical staff"),
        (name = "patients", description = "Patient intake and medical records"),
        (name = "alerts", description = "Emergency alert lifecycle"),
        (name = "analytics", description = "Dashboard and derived metrics"),
        (name = "insights", description = "Advisory AI calls"),
        (name = "settings", description = "Console preferences"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        handlers::health::api_status,
        handlers::health::health_check,
        handlers::hospitals::list_hospitals,
        handlers::hospitals::list_active_hospitals,
        handlers::hospitals::get_hospital,
        handlers::hospitals::create_hospital,
        handlers::hospitals::update_hospital,
        handlers::hospitals::delete_hospital,
        handlers::departments::list_departments,
        handlers::departments::create_department,
        handlers::departments::update_department,
        handlers::practitioners::list_practitioners,
        handlers::practitioners::create_practitioner,
        handlers::practitioners::update_practitioner,
        handlers::practitioners::update_availability,
        handlers::patients::search_patients,
        handlers::patients::admit_patient,
        handlers::patients::get_patient,
        handlers::patients::update_patient,
        handlers::patients::patient_history,
        handlers::patients::create_record,
        handlers::patients::discharge_record,
        handlers::alerts::list_alerts,
        handlers::alerts::alert_board,
        handlers::alerts::get_alert,
        handlers::alerts::create_alert,
        handlers::alerts::update_alert,
        handlers::alerts::acknowledge_alert,
        handlers::alerts::resolve_alert,
        handlers::analytics::dashboard,
        handlers::analytics::analytics_report,
        handlers::analytics::export_analytics,
        handlers::insights::analyze_patient,
        handlers::insights::forecast_beds,
        handlers::insights::emergency_insights,
        handlers::settings::get_settings,
        handlers::settings::update_notifications,
        handlers::settings::update_system,
        handlers::settings::set_api_key,
        handlers::settings::export_settings,
        handlers::settings::import_settings,
        handlers::settings::clear_settings,
    ),
    components(
        schemas(
            errors::ErrorResponse,
            models::HospitalStatus,
            models::AlertType,
            models::AlertStatus,
            models::AlertAction,
            models::Severity,
            models::VisitType,
            models::BadgeVariant,
            commands::hospitals::SaveHospitalCommand,
            commands::departments::SaveDepartmentCommand,
            commands::practitioners::SavePractitionerCommand,
            commands::practitioners::UpdateAvailabilityCommand,
            commands::patients::AdmitPatientCommand,
            commands::patients::UpdatePatientCommand,
            commands::medical_records::CreateMedicalRecordCommand,
            commands::alerts::SaveAlertCommand,
            handlers::hospitals::HospitalSummary,
            handlers::departments::DepartmentSummary,
            handlers::practitioners::PractitionerSummary,
            handlers::patients::PatientSummary,
            handlers::patients::MedicalRecordSummary,
            handlers::patients::IntakeResponse,
            handlers::alerts::ResolveAlertRequest,
            handlers::analytics::DashboardView,
            handlers::settings::ApiKeyRequest,
            handlers::health::HealthResponse,
            handlers::health::StatusResponse,
            services::alerts::AlertView,
            services::alerts::AlertListing,
            services::alerts::StatusCounts,
            services::alerts::BoardSnapshot,
            services::analytics::TimeRange,
            services::analytics::AnalyticsReport,
            services::analytics::AnalyticsExport,
            services::analytics::DailyCount,
            services::analytics::HospitalPerformance,
            services::settings::NotificationSettings,
            services::settings::SystemSettings,
            services::settings::SettingsView,
            services::settings::SettingsExport,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
