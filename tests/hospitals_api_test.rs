mod common;

use axum::http::{Method, StatusCode};
use edhms_api::entities::{department, practitioner};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use common::{response_json, TestApp};

#[tokio::test]
async fn hospital_registry_lifecycle() {
    let app = TestApp::new().await;

    let harbor = app.create_hospital("Harbor General", 100, 20).await;
    let _valley = app.create_hospital("Valley Medical", 0, 0).await;

    let response = app.request(Method::GET, "/api/v1/hospitals", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    let hospitals = body["data"].as_array().expect("hospital list");
    assert_eq!(hospitals.len(), 2);
    assert_eq!(hospitals[0]["name"], "Harbor General");
    assert_eq!(hospitals[0]["occupancy_rate"], 80.0);
    assert_eq!(hospitals[0]["specialties"], json!(["Emergency", "Trauma"]));
    assert!(hospitals[1]["occupancy_rate"].is_null());

    // Search matches name or address without regard to case
    let response = app
        .request(Method::GET, "/api/v1/hospitals?search=valley%20med", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["name"], "Valley Medical");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/hospitals/{}", harbor),
            Some(json!({
                "name": "Harbor General Hospital",
                "address": "1 Quay Street",
                "phone": "555-0100",
                "emergency_contact": "555-0199",
                "bed_capacity": 100,
                "available_beds": 5,
                "specialties": ["Cardiology"],
                "status": "maintenance"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Harbor General Hospital");
    assert_eq!(body["data"]["status"], "maintenance");
    assert_eq!(body["data"]["available_beds"], 5);

    let response = app
        .request(Method::GET, "/api/v1/hospitals?status=maintenance", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let response = app.request(Method::GET, "/api/v1/hospitals/active", None).await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["name"], "Valley Medical");

    let response = app
        .request(Method::GET, &format!("/api/v1/hospitals/{}", harbor), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/hospitals?status=closed", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, "/api/v1/hospitals?status=all", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_without_name_is_a_validation_error() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/hospitals",
            Some(json!({
                "name": "",
                "address": "1 Main St",
                "phone": "555-0100",
                "emergency_contact": "555-0199",
                "bed_capacity": 10
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("Hospital name is required"));
}

#[tokio::test]
async fn delete_requires_confirmation_and_cascades_staff() {
    let app = TestApp::new().await;
    let hospital = app.create_hospital("Harbor General", 40, 40).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/hospitals/{}/departments", hospital),
            Some(json!({ "name": "Cardiology", "bed_count": 10, "available_beds": 4 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/practitioners",
            Some(json!({
                "hospital_id": hospital,
                "name": "Dr. Ana Silva",
                "email": "ana.silva@harbor.example",
                "specialization": "Cardiology",
                "license_number": "LIC-100"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let uri = format!("/api/v1/hospitals/{}", hospital);
    let response = app.request(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::DELETE, &format!("{}?confirm=true", uri), None)
        .await;
    assert!(response.status().is_success());

    let response = app.request(Method::GET, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(Method::GET, &format!("{}/practitioners", uri), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let db = app.state.db.as_ref();
    assert_eq!(department::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(practitioner::Entity::find().count(db).await.unwrap(), 0);

    let response = app
        .request(Method::DELETE, &format!("{}?confirm=true", uri), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
