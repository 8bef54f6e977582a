//! Advisory calls to a hosted text-generation model.
//!
//! Model output is never trusted: every response goes through
//! [`parse_insight`] and comes back either parsed and checked, or as
//! [`InsightOutcome::Malformed`] with the raw text. Nothing here writes to the
//! database.

use async_trait::async_trait;
use metrics::counter;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::AiConfig,
    db::DbPool,
    entities::{medical_record, patient},
    errors::ServiceError,
    services::{
        alerts::AlertService,
        analytics::{AnalyticsReport, AnalyticsService, TimeRange},
        settings::SettingsStore,
    },
};

const EMERGENCY_ALERT_CONTEXT: u64 = 20;
const MAX_ERROR_BODY: usize = 512;

/// Longest prefix of `text` no longer than `max` bytes that ends on a char boundary.
fn truncate_on_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Produces text for a prompt with a named model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, api_key: &str, prompt: &str)
        -> Result<String, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// `generateContent` client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, api_key, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(
        &self,
        model: &str,
        api_key: &str,
        prompt: &str,
    ) -> Result<String, ServiceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                // The request URL carries the key; keep it out of errors.
                ServiceError::ExternalServiceError(format!(
                    "Failed to reach text generation API: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = truncate_on_char_boundary(&body, MAX_ERROR_BODY);
            return Err(ServiceError::ExternalServiceError(format!(
                "Text generation API returned {}: {}",
                status, detail
            )));
        }

        let payload: GenerateContentResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "Unreadable text generation response: {}",
                e.without_url()
            ))
        })?;

        payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                ServiceError::ExternalServiceError(
                    "Text generation API returned no candidates".to_string(),
                )
            })
    }
}

/// Result of an advisory call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InsightOutcome<T> {
    Parsed(T),
    Malformed { raw: String, reason: String },
}

impl<T> InsightOutcome<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, InsightOutcome::Parsed(_))
    }
}

/// Structured advisory payload with its own sanity checks.
pub trait Insight: DeserializeOwned {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Removes a leading ```` ```json ```` / ```` ``` ```` fence and a trailing fence.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = match trimmed.strip_prefix("```") {
        Some(rest) => rest
            .split_once('\n')
            .map(|(lang, body)| {
                if lang.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
                    body
                } else {
                    rest
                }
            })
            .unwrap_or(rest),
        None => trimmed,
    };
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

pub fn parse_insight<T: Insight>(raw: String) -> InsightOutcome<T> {
    let parsed = serde_json::from_str::<T>(strip_code_fences(&raw))
        .map_err(|e| e.to_string())
        .and_then(|value| value.check().map(|_| value));
    match parsed {
        Ok(value) => InsightOutcome::Parsed(value),
        Err(reason) => InsightOutcome::Malformed { raw, reason },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(serde::de::Error::custom(format!("unknown risk level `{}`", raw))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRiskInsight {
    pub risk_level: RiskLevel,
    pub emergency_conditions: Vec<String>,
    pub medical_patterns: Vec<String>,
    pub immediate_actions: Vec<String>,
    pub specialist_referrals: Vec<String>,
    pub confidence: f64,
}

impl Insight for PatientRiskInsight {
    fn check(&self) -> Result<(), String> {
        if !self.confidence.is_finite() {
            return Err("confidence is not a finite number".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedPrediction {
    pub hospital_id: String,
    pub expected_occupancy: f64,
    pub available_beds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityAlert {
    pub hospital_id: String,
    pub severity: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedForecast {
    pub predictions: Vec<BedPrediction>,
    pub alerts: Vec<CapacityAlert>,
    pub recommendations: Vec<String>,
}

impl Insight for BedForecast {
    fn check(&self) -> Result<(), String> {
        match self
            .predictions
            .iter()
            .find(|p| !p.expected_occupancy.is_finite() || !p.available_beds.is_finite())
        {
            Some(p) => Err(format!("non-finite prediction for hospital {}", p.hospital_id)),
            None => Ok(()),
        }
    }
}

/// Free-form insight object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmergencyInsight(pub Map<String, Value>);

impl Insight for EmergencyInsight {}

pub fn patient_analysis_prompt(
    patient: &patient::Model,
    history: &[medical_record::Model],
) -> Result<String, ServiceError> {
    Ok(format!(
        r#"Analyze the following patient data and medical history for emergency healthcare insights:

Patient Data: {patient}
Medical History: {history}

Please provide:
1. Risk assessment (Low/Medium/High/Critical)
2. Potential emergency conditions to watch for
3. Relevant medical history patterns
4. Recommended immediate actions
5. Specialist referral recommendations

Format the response as JSON with the following structure:
{{
  "riskLevel": "string",
  "emergencyConditions": ["string"],
  "medicalPatterns": ["string"],
  "immediateActions": ["string"],
  "specialistReferrals": ["string"],
  "confidence": number
}}"#,
        patient = serde_json::to_string(patient)?,
        history = serde_json::to_string(history)?,
    ))
}

pub fn bed_forecast_prompt(report: &AnalyticsReport) -> Result<String, ServiceError> {
    let demand = json!({
        "currentOccupancy": report.bed_occupancy_rate,
        "emergencyVisits": report.emergency_visits,
        "activeAlerts": report.active_alerts,
    });
    Ok(format!(
        r#"Analyze hospital bed availability and predict capacity for the next 24 hours:

Hospital Data: {hospitals}
Current Demand: {demand}

Provide predictions for:
1. Expected bed occupancy rates
2. Critical capacity alerts
3. Resource redistribution recommendations
4. Emergency surge preparation

Return as JSON:
{{
  "predictions": [{{"hospitalId": "string", "expectedOccupancy": number, "availableBeds": number}}],
  "alerts": [{{"hospitalId": "string", "severity": "string", "message": "string"}}],
  "recommendations": ["string"]
}}"#,
        hospitals = serde_json::to_string(&report.hospital_performance)?,
        demand = demand,
    ))
}

pub fn emergency_prompt(context: &Value) -> Result<String, ServiceError> {
    Ok(format!(
        r#"Generate emergency healthcare insights based on:
{context}

Analyze and provide:
1. Severity classification
2. Resource requirements
3. Treatment protocols
4. Risk factors
5. Monitoring recommendations

Return structured JSON response."#,
        context = serde_json::to_string(context)?,
    ))
}

#[derive(Clone)]
pub struct InsightService {
    db_pool: Arc<DbPool>,
    generator: Arc<dyn TextGenerator>,
    ai: AiConfig,
    settings: SettingsStore,
    analytics: AnalyticsService,
    alerts: AlertService,
}

impl InsightService {
    pub fn new(
        db_pool: Arc<DbPool>,
        generator: Arc<dyn TextGenerator>,
        ai: AiConfig,
        settings: SettingsStore,
        analytics: AnalyticsService,
        alerts: AlertService,
    ) -> Self {
        Self {
            db_pool,
            generator,
            ai,
            settings,
            analytics,
            alerts,
        }
    }

    /// Configured key first, then the one saved in console settings.
    async fn api_key(&self) -> Result<String, ServiceError> {
        if let Some(key) = self.ai.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        self.settings
            .api_key()
            .await
            .ok_or_else(|| ServiceError::ValidationError("AI API key is not configured".to_string()))
    }

    async fn ask<T: Insight>(
        &self,
        kind: &'static str,
        model: &str,
        prompt: String,
    ) -> Result<InsightOutcome<T>, ServiceError> {
        let key = self.api_key().await?;
        counter!("edhms.ai.calls", 1, "kind" => kind);

        let text = self
            .generator
            .generate(model, &key, &prompt)
            .await
            .map_err(|e| {
                counter!("edhms.ai.failures", 1, "kind" => kind);
                e
            })?;

        let outcome = parse_insight::<T>(text);
        match &outcome {
            InsightOutcome::Parsed(_) => info!(kind, model, "Advisory response parsed"),
            InsightOutcome::Malformed { reason, .. } => {
                counter!("edhms.ai.malformed", 1, "kind" => kind);
                warn!(kind, model, %reason, "Advisory response rejected");
            }
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn analyze_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<InsightOutcome<PatientRiskInsight>, ServiceError> {
        let db = self.db_pool.as_ref();
        let patient = patient::Entity::find_by_id(patient_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient {} not found", patient_id)))?;
        let history = medical_record::Entity::find()
            .filter(medical_record::Column::PatientId.eq(patient_id))
            .order_by_desc(medical_record::Column::VisitDate)
            .all(db)
            .await?;

        let prompt = patient_analysis_prompt(&patient, &history)?;
        self.ask("patient_analysis", &self.ai.fast_model, prompt).await
    }

    #[instrument(skip(self))]
    pub async fn forecast_beds(
        &self,
        range: TimeRange,
    ) -> Result<InsightOutcome<BedForecast>, ServiceError> {
        let report = self.analytics.report(range).await?;
        let prompt = bed_forecast_prompt(&report)?;
        self.ask("bed_forecast", &self.ai.standard_model, prompt).await
    }

    #[instrument(skip(self))]
    pub async fn emergency_insights(&self) -> Result<InsightOutcome<EmergencyInsight>, ServiceError> {
        let alerts = self.alerts.latest_active(EMERGENCY_ALERT_CONTEXT).await?;
        let dashboard = self.analytics.dashboard().await?;
        let hospitals: Vec<Value> = dashboard
            .hospitals
            .iter()
            .map(|h| {
                json!({
                    "id": h.id,
                    "name": h.name,
                    "bedCapacity": h.bed_capacity,
                    "availableBeds": h.available_beds,
                    "status": h.status,
                })
            })
            .collect();
        let context = json!({ "activeAlerts": alerts, "hospitals": hospitals });

        let prompt = emergency_prompt(&context)?;
        self.ask("emergency_insights", &self.ai.standard_model, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::{
        matchers::{body_partial_json, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const RISK_JSON: &str = r#"{"riskLevel":"high","emergencyConditions":["sepsis"],"medicalPatterns":[],"immediateActions":["fluids"],"specialistReferrals":["ICU"],"confidence":0.82}"#;

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("  {\"b\":2} "), "{\"b\":2}");
    }

    #[test]
    fn parses_fenced_patient_insight_case_insensitively() {
        let outcome = parse_insight::<PatientRiskInsight>(format!("```json\n{}\n```", RISK_JSON));
        assert_matches!(outcome, InsightOutcome::Parsed(ref insight) if insight.risk_level == RiskLevel::High);
    }

    #[test]
    fn rejects_unknown_risk_and_missing_fields() {
        let bad_level = RISK_JSON.replace("high", "extreme");
        assert_matches!(
            parse_insight::<PatientRiskInsight>(bad_level),
            InsightOutcome::Malformed { reason, .. } if reason.contains("extreme")
        );
        assert_matches!(
            parse_insight::<PatientRiskInsight>(r#"{"riskLevel":"Low"}"#.to_string()),
            InsightOutcome::Malformed { .. }
        );
        assert_matches!(
            parse_insight::<EmergencyInsight>("Sorry, I cannot help.".to_string()),
            InsightOutcome::Malformed { raw, .. } if raw == "Sorry, I cannot help."
        );
        assert_matches!(
            parse_insight::<EmergencyInsight>("[1,2]".to_string()),
            InsightOutcome::Malformed { .. }
        );
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let parsed = parse_insight::<EmergencyInsight>(r#"{"severity":"high"}"#.to_string());
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["outcome"], "parsed");
        assert_eq!(json["severity"], "high");

        let malformed = parse_insight::<BedForecast>("nope".to_string());
        let json = serde_json::to_value(&malformed).unwrap();
        assert_eq!(json["outcome"], "malformed");
        assert_eq!(json["raw"], "nope");
    }

    #[tokio::test]
    async fn gemini_client_posts_prompt_and_reads_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [{ "text": "hello" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": RISK_JSON }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri());
        let text = client
            .generate("gemini-2.0-flash", "test-key", "hello")
            .await
            .unwrap();
        assert_eq!(text, RISK_JSON);
    }

    #[tokio::test]
    async fn gemini_client_maps_failures_to_external_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(server.uri());
        let err = client.generate("gemini-pro", "k", "p").await.unwrap_err();
        assert_matches!(err, ServiceError::ExternalServiceError(msg) if msg.contains("429") && !msg.contains("key=k"));

        let empty = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&empty)
            .await;
        let err = GeminiClient::new(empty.uri())
            .generate("gemini-pro", "k", "p")
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ExternalServiceError(_));
    }

    #[tokio::test]
    async fn gemini_error_body_is_cut_on_a_char_boundary() {
        let server = MockServer::start().await;
        let body = format!("{}é tail of a long upstream error", "a".repeat(511));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string(body))
            .mount(&server)
            .await;

        let err = GeminiClient::new(server.uri())
            .generate("gemini-pro", "k", "p")
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ServiceError::ExternalServiceError(msg) if msg.ends_with(&"a".repeat(511)) && !msg.contains("tail")
        );
    }

    #[test]
    fn truncation_keeps_short_text_and_backs_off_multibyte_chars() {
        assert_eq!(truncate_on_char_boundary("short", 512), "short");
        assert_eq!(truncate_on_char_boundary("abé", 3), "ab");
        assert_eq!(truncate_on_char_boundary("abé", 4), "abé");
    }

    async fn insight_service(
        db: Arc<DbPool>,
        generator: MockTextGenerator,
        dir: &tempfile::TempDir,
    ) -> InsightService {
        let (events, _rx) = crate::test_support::test_events();
        let alerts = AlertService::new(db.clone(), events);
        let analytics = AnalyticsService::new(db.clone(), alerts.clone());
        let settings = SettingsStore::load(dir.path().join("settings.json"))
            .await
            .unwrap();
        let ai = AiConfig {
            api_key: Some("abc".to_string()),
            ..AiConfig::default()
        };
        InsightService::new(db, Arc::new(generator), ai, settings, analytics, alerts)
    }

    #[tokio::test]
    async fn patient_analysis_sends_history_to_the_fast_model() {
        use crate::commands::{
            hospitals::SaveHospitalCommand, patients::AdmitPatientCommand, Command,
        };
        use crate::forms::ListInput;

        let db = crate::test_support::memory_db().await;
        let (events, _rx) = crate::test_support::test_events();
        SaveHospitalCommand {
            id: None,
            name: "Central".into(),
            address: "2 Core St".into(),
            phone: "555-0170".into(),
            email: None,
            emergency_contact: "555-0171".into(),
            bed_capacity: 60,
            available_beds: None,
            specialties: ListInput::default(),
            status: None,
            latitude: None,
            longitude: None,
        }
        .execute(db.clone(), events.clone())
        .await
        .unwrap();
        let admitted = AdmitPatientCommand {
            patient_id: Some("PAT-88".into()),
            name: "Ada Brooks".into(),
            diagnosis: Some("Pneumothorax".into()),
            ..Default::default()
        }
        .execute(db.clone(), events)
        .await
        .unwrap();

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|model, key, prompt| {
                model.to_string() == "gemini-2.0-flash"
                    && key.to_string() == "abc"
                    && prompt.contains("Ada Brooks")
                    && prompt.contains("Pneumothorax")
            })
            .times(1)
            .returning(|_, _, _| Ok(RISK_JSON.to_string()));

        let dir = tempfile::tempdir().unwrap();
        let service = insight_service(db, generator, &dir).await;
        let outcome = service.analyze_patient(admitted.patient.id).await.unwrap();
        assert_matches!(outcome, InsightOutcome::Parsed(ref insight) if insight.risk_level == RiskLevel::High);
    }

    #[tokio::test]
    async fn patient_analysis_of_unknown_patient_is_not_found() {
        let db = crate::test_support::memory_db().await;
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();

        let dir = tempfile::tempdir().unwrap();
        let service = insight_service(db, generator, &dir).await;
        let err = service.analyze_patient(Uuid::new_v4()).await.unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }
}
