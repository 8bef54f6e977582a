pub mod alerts;
pub mod analytics;
pub mod departments;
pub mod health;
pub mod hospitals;
pub mod insights;
pub mod patients;
pub mod practitioners;
pub mod settings;

use std::sync::Arc;

use crate::{
    config::AiConfig,
    db::DbPool,
    events::EventSender,
    services::{
        alerts::AlertService,
        analytics::AnalyticsService,
        departments::DepartmentService,
        hospitals::HospitalService,
        insights::{GeminiClient, InsightService, TextGenerator},
        medical_records::MedicalRecordService,
        patients::PatientService,
        practitioners::PractitionerService,
        settings::SettingsStore,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub hospitals: Arc<HospitalService>,
    pub departments: Arc<DepartmentService>,
    pub practitioners: Arc<PractitionerService>,
    pub patients: Arc<PatientService>,
    pub medical_records: Arc<MedicalRecordService>,
    pub alerts: Arc<AlertService>,
    pub analytics: Arc<AnalyticsService>,
    pub insights: Arc<InsightService>,
}

impl AppServices {
    /// Builds the services with the Gemini client at `ai.base_url`.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        ai: AiConfig,
        settings: SettingsStore,
    ) -> Self {
        let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(ai.base_url.clone()));
        Self::with_generator(db_pool, event_sender, ai, settings, generator)
    }

    pub fn with_generator(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        ai: AiConfig,
        settings: SettingsStore,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let alerts = AlertService::new(db_pool.clone(), event_sender.clone());
        let analytics = AnalyticsService::new(db_pool.clone(), alerts.clone());
        let insights = InsightService::new(
            db_pool.clone(),
            generator,
            ai,
            settings,
            analytics.clone(),
            alerts.clone(),
        );

        Self {
            hospitals: Arc::new(HospitalService::new(db_pool.clone(), event_sender.clone())),
            departments: Arc::new(DepartmentService::new(db_pool.clone(), event_sender.clone())),
            practitioners: Arc::new(PractitionerService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            patients: Arc::new(PatientService::new(db_pool.clone(), event_sender.clone())),
            medical_records: Arc::new(MedicalRecordService::new(db_pool, event_sender)),
            alerts: Arc::new(alerts),
            analytics: Arc::new(analytics),
            insights: Arc::new(insights),
        }
    }
}
