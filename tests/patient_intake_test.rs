mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{response_json, TestApp};

#[tokio::test]
async fn intake_without_any_hospital_is_unprocessable() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/patients/intake",
            Some(json!({
                "patient_id": "PAT-42",
                "name": "Jordan Reyes",
                "diagnosis": "Fractured wrist"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("No hospitals found"));

    // Nothing is half-written: the patient insert rolled back with the visit.
    let response = app
        .request(Method::GET, "/api/v1/patients?search=PAT-42", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn repeated_intake_reuses_the_patient() {
    let app = TestApp::new().await;
    let hospital = app.create_hospital("Harbor General", 50, 10).await;

    let intake = json!({
        "patient_id": "PAT-1001",
        "name": "Jordan Reyes",
        "age": 42,
        "allergies": ["Penicillin", " Penicillin ", ""],
        "diagnosis": "Chest pain",
        "hospital_id": hospital,
        "symptoms": "pain, shortness of breath",
        "severity_level": "high"
    });

    let response = app
        .request(Method::POST, "/api/v1/patients/intake", Some(intake.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = response_json(response).await;
    assert_eq!(first["data"]["created"], true);
    assert_eq!(first["data"]["patient"]["allergies"], json!(["Penicillin"]));
    assert_eq!(
        first["data"]["record"]["symptoms"],
        json!(["pain", "shortness of breath"])
    );
    assert_eq!(first["data"]["record"]["status"], "active");
    let patient_row = first["data"]["patient"]["id"]
        .as_str()
        .expect("patient id")
        .to_string();

    let response = app
        .request(Method::POST, "/api/v1/patients/intake", Some(intake))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = response_json(response).await;
    assert_eq!(second["data"]["created"], false);
    assert_eq!(second["data"]["patient"]["id"], patient_row.as_str());

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/patients/{}/records", patient_row),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let history = response_json(response).await;
    let visits = history["data"].as_array().expect("history");
    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0]["hospital_name"], "Harbor General");
    assert_eq!(visits[0]["severity_badge"], "destructive");

    let record_id = visits[0]["id"].as_str().expect("record id").to_string();
    let discharge = format!("/api/v1/medical-records/{}/discharge", record_id);
    let response = app.request(Method::POST, &discharge, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "discharged");
    assert!(!body["data"]["discharge_date"].is_null());

    let response = app.request(Method::POST, &discharge, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn intake_without_diagnosis_opens_no_visit() {
    // No hospital exists; without a visit none is needed.
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/patients/intake",
            Some(json!({ "name": "Sam Ortega", "phone": "555-0177" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert!(body["data"]["record"].is_null());
    let generated = body["data"]["patient"]["patient_id"]
        .as_str()
        .expect("generated id");
    assert!(generated.starts_with("PAT-"));

    let response = app
        .request(Method::GET, "/api/v1/patients?search=sam", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"][0]["name"], "Sam Ortega");
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/patients/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_screen_is_not_capped() {
    let app = TestApp::new().await;
    for n in 0..7 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/patients/intake",
                Some(json!({ "patient_id": format!("PAT-70{}", n), "name": format!("Lee Morgan {}", n) })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request(Method::GET, "/api/v1/patients?search=morgan", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(7));

    let response = app
        .request(Method::GET, "/api/v1/patients?search=morgan&limit=5", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(5));
}
