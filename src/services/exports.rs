//! Downloadable JSON snapshots.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;

use crate::services::analytics::TimeRange;

pub fn analytics_export_filename(range: TimeRange, date: NaiveDate) -> String {
    format!("emergency-analytics-{}-{}.json", range, date.format("%Y-%m-%d"))
}

pub fn settings_export_filename(date: NaiveDate) -> String {
    format!("edhms-settings-{}.json", date.format("%Y-%m-%d"))
}

/// JSON body served as a file download.
pub struct JsonAttachment<T> {
    pub filename: String,
    pub body: T,
}

impl<T> JsonAttachment<T> {
    pub fn new(filename: impl Into<String>, body: T) -> Self {
        Self {
            filename: filename.into(),
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for JsonAttachment<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        // Generated names are plain ASCII; anything else falls back to a bare attachment.
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", self.filename))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::CONTENT_DISPOSITION, disposition);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::{json, Value};
    use test_case::test_case;

    fn march_fifth() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test_case(TimeRange::Day, "emergency-analytics-24h-2024-03-05.json")]
    #[test_case(TimeRange::Week, "emergency-analytics-7d-2024-03-05.json")]
    #[test_case(TimeRange::Quarter, "emergency-analytics-90d-2024-03-05.json")]
    fn analytics_names(range: TimeRange, expected: &str) {
        assert_eq!(analytics_export_filename(range, march_fifth()), expected);
    }

    #[test]
    fn settings_name() {
        assert_eq!(settings_export_filename(march_fifth()), "edhms-settings-2024-03-05.json");
    }

    #[tokio::test]
    async fn attachment_headers() {
        let response = JsonAttachment::new("a.json", json!({"ok": true})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"a.json\""
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"ok": true}));
    }
}
