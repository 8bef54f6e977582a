#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use edhms_api::{
    build_router, config::AppConfig, db, services::settings::SettingsStore, AppState,
    BackgroundTasks,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Router over a fresh SQLite file database and settings file in a temp dir.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    background: BackgroundTasks,
    dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestApp::new`], letting the caller adjust the configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("edhms_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.settings_path = dir.path().join("settings.json").display().to_string();
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let settings = SettingsStore::load(&cfg.settings_path)
            .await
            .expect("settings store");
        let (state, background) = AppState::build(cfg, Arc::new(pool), settings, None)
            .await
            .expect("app state");

        Self {
            router: build_router(state.clone()),
            state,
            background,
            dir,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };
        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    pub async fn request_raw(&self, method: Method, uri: &str, body: &'static str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("failed to build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a hospital through the API and returns its id.
    pub async fn create_hospital(&self, name: &str, capacity: i32, available: i32) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/hospitals",
                Some(json!({
                    "name": name,
                    "address": format!("{} Avenue", name),
                    "phone": "555-0100",
                    "emergency_contact": "555-0199",
                    "bed_capacity": capacity,
                    "available_beds": available,
                    "specialties": "Emergency, Trauma"
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_json(response).await;
        body["data"]["id"].as_str().expect("hospital id").to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.background.event_loop.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
