//! EDHMS API Library
//!
//! Backend for the emergency healthcare management console: hospitals and
//! their departments and staff, patient intake and visit history, emergency
//! alerts, derived analytics and advisory AI insights.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod forms;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

#[cfg(test)]
mod test_support;

use axum::{http::HeaderValue, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tower_http::{compression::CompressionLayer, cors::{Any, CorsLayer}};
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::{
        changefeed::{BroadcastChangeFeed, ChangeFeed, PollingChangeFeed, Subscription},
        EventSender,
    },
    handlers::AppServices,
    services::{alerts::AlertBoard, insights::TextGenerator, settings::SettingsStore},
};

const CHANGE_FEED_CAPACITY: usize = 256;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: AppConfig,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
    pub settings: SettingsStore,
    pub change_feed: Arc<dyn ChangeFeed>,
    pub alert_board: Arc<AlertBoard>,
}

/// Background work that must outlive the router.
pub struct BackgroundTasks {
    pub event_loop: JoinHandle<()>,
    /// Keeps the alert board attached to the change feed.
    pub board_subscription: Subscription,
}

impl AppState {
    /// Wires services, the event loop, the configured change feed and the
    /// alert board. `generator` replaces the Gemini client when given.
    pub async fn build(
        config: AppConfig,
        db: Arc<DbPool>,
        settings: SettingsStore,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Result<(Self, BackgroundTasks), errors::ServiceError> {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let event_sender = Arc::new(EventSender::new(event_tx));

        let (change_feed, push_feed): (Arc<dyn ChangeFeed>, Option<Arc<BroadcastChangeFeed>>) =
            if config.uses_polling_feed() {
                ::tracing::info!(
                    interval_secs = config.change_feed_poll_secs,
                    "Change signals delivered by polling"
                );
                let feed = PollingChangeFeed::new(db.clone(), config.change_feed_poll_interval());
                (Arc::new(feed), None)
            } else {
                ::tracing::info!("Change signals delivered by push");
                let feed = Arc::new(BroadcastChangeFeed::new(CHANGE_FEED_CAPACITY));
                (feed.clone(), Some(feed))
            };
        let event_loop = tokio::spawn(events::process_events(event_rx, push_feed));

        let services = match generator {
            Some(generator) => AppServices::with_generator(
                db.clone(),
                event_sender.clone(),
                config.ai.clone(),
                settings.clone(),
                generator,
            ),
            None => AppServices::new(
                db.clone(),
                event_sender.clone(),
                config.ai.clone(),
                settings.clone(),
            ),
        };

        let alert_board = AlertBoard::new(services.alerts.as_ref().clone());
        alert_board.refresh().await?;
        let board_subscription = alert_board.attach(change_feed.as_ref());

        let state = Self {
            db,
            config,
            event_sender,
            services,
            settings,
            change_feed,
            alert_board,
        };
        Ok((
            state,
            BackgroundTasks {
                event_loop,
                board_subscription,
            },
        ))
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/hospitals", handlers::hospitals::hospitals_routes())
        .nest("/departments", handlers::departments::departments_routes())
        .nest("/practitioners", handlers::practitioners::practitioners_routes())
        .nest("/patients", handlers::patients::patients_routes())
        .nest("/medical-records", handlers::patients::medical_records_routes())
        .nest("/alerts", handlers::alerts::alerts_routes())
        .route("/dashboard", get(handlers::analytics::dashboard))
        .nest("/analytics", handlers::analytics::analytics_routes())
        .nest("/insights", handlers::insights::insights_routes())
        .nest("/settings", handlers::settings::settings_routes())
}

/// CORS from `cors_allowed_origins`; permissive in development when unset.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_development() {
        ::tracing::info!("Using permissive CORS in development");
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// Full application router: `/api/v1`, Swagger UI and the HTTP layers.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn cors_origins_are_parsed_from_config() {
        let mut config = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        );
        config.cors_allowed_origins = Some("https://console.example, ,https://ops.example".into());
        // Construction must not panic for mixed input.
        let _ = cors_layer(&config);
    }
}
