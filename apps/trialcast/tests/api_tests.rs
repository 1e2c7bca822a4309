//! HTTP tests against the shipped model, driven through axum-test.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use std::path::{Path, PathBuf};
use trialcast::api::types::{
    ErrorResponse, HealthResponse, PredictResponse, SchemaResponse,
};
use trialcast::api::{AppState, create_router};
use trialcast_core::formats::{CLASSIFIER_FILE, PREPROCESSOR_FILE, load};
use trialcast_core::{ArtifactBundle, Preprocessor, RandomForest, TrialForm};

// =============================================================================
// HELPERS
// =============================================================================

fn shipped() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn server_with(state: AppState) -> TestServer {
    TestServer::new(create_router(state)).unwrap()
}

fn server() -> TestServer {
    server_with(AppState::new(ArtifactBundle::load_dir(&shipped()).unwrap()))
}

/// The shipped model with "others" swapped out of the condition categories,
/// so a valid form can still trip the preprocessor.
fn server_without_others() -> TestServer {
    let bytes = std::fs::read(shipped().join(PREPROCESSOR_FILE)).unwrap();
    let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let columns = value["columns"].as_array_mut().unwrap();
    let condition = columns
        .iter_mut()
        .find(|c| c["column"] == "condition")
        .unwrap();
    for category in condition["encoding"]["one_hot"]["categories"]
        .as_array_mut()
        .unwrap()
    {
        if *category == "others" {
            *category = json!("Asthma");
        }
    }
    let preprocessor: Preprocessor = serde_json::from_value(value).unwrap();
    let forest: RandomForest = load(&shipped().join(CLASSIFIER_FILE)).unwrap();
    server_with(AppState::new(
        ArtifactBundle::from_parts(preprocessor, forest).unwrap(),
    ))
}

fn scenario_form() -> TrialForm {
    TrialForm {
        phase: "3".into(),
        sponsor_type: "INDUSTRY".into(),
        gender: "ALL".into(),
        condition: "Hypertension".into(),
        location: "United States".into(),
        enrollment: "500".into(),
        duration: "365".into(),
    }
}

// =============================================================================
// FORM PAGE
// =============================================================================

#[tokio::test]
async fn form_page_renders_inputs() {
    let response = server().get("/").await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("Clinical Trial Outcome Prediction"));
    assert!(html.contains("<option value=\"Prostate Cancer\">"));
    assert!(html.contains("name=\"enrollment\" type=\"number\" min=\"1\""));
    assert!(!html.contains("Predicted Clinical Trial Outcome"));
}

#[tokio::test]
async fn form_post_shows_success_block() {
    let response = server().post("/").form(&scenario_form()).await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("✅ Predicted Clinical Trial Outcome: Success"));
    assert!(html.contains("#d4edda"));
    assert!(html.contains("<option value=\"Hypertension\" selected>"));
    assert!(html.contains("value=\"500\""));
}

#[tokio::test]
async fn form_post_shows_failure_block() {
    let form = TrialForm {
        phase: "2".into(),
        sponsor_type: "OTHER".into(),
        gender: "MALE".into(),
        condition: "others".into(),
        location: "Canada".into(),
        enrollment: "50".into(),
        duration: "200".into(),
    };
    let response = server().post("/").form(&form).await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("❌ Predicted Clinical Trial Outcome: Failure"));
    assert!(html.contains("#f8d7da"));
}

#[tokio::test]
async fn form_post_rejects_zero_enrollment() {
    let form = TrialForm {
        enrollment: "0".into(),
        ..scenario_form()
    };
    let response = server().post("/").form(&form).await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("enrollment must be at least 1, got 0"));
    assert!(!html.contains("Predicted Clinical Trial Outcome"));
}

#[tokio::test]
async fn form_post_shows_prediction_error() {
    let form = TrialForm {
        condition: "others".into(),
        ..scenario_form()
    };
    let response = server_without_others().post("/").form(&form).await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("🚨 Error during prediction:"));
    assert!(html.contains("#fde2e1"));
    assert!(!html.contains("Predicted Clinical Trial Outcome"));
}

// =============================================================================
// JSON API
// =============================================================================

#[tokio::test]
async fn api_predict_accepts_numbers() {
    let response = server()
        .post("/api/predict")
        .json(&json!({
            "phase": 3,
            "sponsor_type": "INDUSTRY",
            "gender": "ALL",
            "condition": "Hypertension",
            "location": "United States",
            "enrollment": 500,
            "duration": 365
        }))
        .await;
    response.assert_status_ok();
    let body: PredictResponse = response.json();
    assert_eq!(body.label, 1);
    assert_eq!(body.outcome, "Success");
    assert_eq!(body.message, "Predicted Clinical Trial Outcome: Success");
    assert_eq!(body.success_probability_millionths, 754_166);
    assert_eq!(body.failure_probability_millionths, 245_833);
}

#[tokio::test]
async fn api_predict_reports_invalid_field() {
    let response = server()
        .post("/api/predict")
        .json(&json!({
            "phase": 1,
            "sponsor_type": "INDUSTRY",
            "gender": "ALL",
            "condition": "Hypertension",
            "location": "United States",
            "enrollment": 500,
            "duration": 365
        }))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.field.as_deref(), Some("phase"));
    assert!(body.kind.is_none());
}

#[tokio::test]
async fn api_predict_reports_missing_field() {
    let response = server()
        .post("/api/predict")
        .json(&json!({ "phase": "3" }))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.field.as_deref(), Some("sponsor_type"));
}

fn scenario_json_with_enrollment(enrollment: serde_json::Value) -> serde_json::Value {
    json!({
        "phase": 3,
        "sponsor_type": "INDUSTRY",
        "gender": "ALL",
        "condition": "Hypertension",
        "location": "United States",
        "enrollment": enrollment,
        "duration": 365
    })
}

#[tokio::test]
async fn api_predict_treats_null_as_missing() {
    let response = server()
        .post("/api/predict")
        .json(&scenario_json_with_enrollment(json!(null)))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.field.as_deref(), Some("enrollment"));
    assert_eq!(body.error, "enrollment is required");
}

#[tokio::test]
async fn api_predict_validates_boolean_fields() {
    let response = server()
        .post("/api/predict")
        .json(&scenario_json_with_enrollment(json!(true)))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.field.as_deref(), Some("enrollment"));
}

#[tokio::test]
async fn api_predict_answers_unreadable_body_with_json() {
    let response = server()
        .post("/api/predict")
        .json(&scenario_json_with_enrollment(json!([500])))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert!(body.error.contains("enrollment"));
    assert!(!body.error.contains("Scalar"));
    assert!(body.field.is_none());
    assert!(body.kind.is_none());
}

#[tokio::test]
async fn api_predict_reports_transform_error() {
    let form = TrialForm {
        condition: "others".into(),
        ..scenario_form()
    };
    let response = server_without_others()
        .post("/api/predict")
        .json(&form)
        .expect_failure()
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.kind.as_deref(), Some("transform"));
    assert!(body.error.contains("others"));
}

#[tokio::test]
async fn schema_lists_fields_in_column_order() {
    let response = server().get("/api/schema").await;
    response.assert_status_ok();
    let body: SchemaResponse = response.json();
    let names: Vec<_> = body.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, trialcast_core::record::COLUMNS);
    assert_eq!(body.fields[3].choices.len(), 8);
    assert_eq!(body.fields[5].min, Some(1));
}

#[tokio::test]
async fn health_reports_version() {
    let response = server().get("/health").await;
    response.assert_status_ok();
    let body: HealthResponse = response.json();
    assert_eq!(body.status, "ok");
    assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// RATE LIMIT
// =============================================================================

#[tokio::test]
async fn rate_limit_rejects_burst() {
    let bundle = ArtifactBundle::load_dir(&shipped()).unwrap();
    let server = server_with(AppState::new(bundle).with_rate_limit(1));

    server.get("/health").await.assert_status_ok();
    server
        .get("/health")
        .expect_failure()
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}
