//! Integration tests for penguin-web API endpoints
//!
//! Tests cover:
//! - Health and UI serving
//! - Form vocabulary
//! - Dispatch of initial load, classify, axis change and unknown events
//! - Metrics endpoint before and after training

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use penguin_common::config::DataPaths;
use penguin_web::training::{run_training, TrainingConfig};
use penguin_web::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const SAMPLE_SEED: &str = include_str!("fixtures/penguins_sample.csv");

/// Test helper: temp root folder with the sample seed in place
fn setup_root() -> (TempDir, DataPaths) {
    let dir = TempDir::new().expect("Should create temp dir");
    let paths = DataPaths::under(dir.path());
    paths.ensure_directories().expect("Should create data folders");
    std::fs::write(&paths.seed, SAMPLE_SEED).expect("Should write seed");
    (dir, paths)
}

/// Test helper: same as `setup_root` plus a trained model
fn setup_trained_root() -> (TempDir, DataPaths) {
    let (dir, paths) = setup_root();
    let config = TrainingConfig {
        max_iterations: 300,
        ..TrainingConfig::default()
    };
    run_training(&paths, &config).expect("Should train on sample seed");
    (dir, paths)
}

fn setup_app(paths: &DataPaths) -> axum::Router {
    build_router(AppState::new(paths.clone(), None))
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn dispatch_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/dispatch")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn dispatch(app: &axum::Router, body: Value) -> Value {
    let response = app.clone().oneshot(dispatch_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

fn keys(value: &Value) -> Vec<String> {
    let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    keys
}

fn torgersen_form() -> Value {
    json!({
        "island": "Torgersen",
        "bill_length_mm": 40.0,
        "bill_depth_mm": 18.0,
        "flipper_length_mm": 190.0,
        "body_mass_g": 3500.0,
        "sex": "male"
    })
}

// =============================================================================
// Health and UI
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, paths) = setup_root();
    let app = setup_app(&paths);

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["module"], "penguin-web");
    assert!(body["version"].is_string());
    assert_eq!(body["seed_present"], true);
    assert_eq!(body["model_trained"], false);
}

#[tokio::test]
async fn test_health_ok_once_trained() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let response = app.oneshot(get_request("/health")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_trained"], true);
}

#[tokio::test]
async fn test_ui_is_served() {
    let (_dir, paths) = setup_root();
    let app = setup_app(&paths);

    let response = app.clone().oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Penguin Species Classifier"));
    assert!(html.contains("/static/app.js"));

    let response = app.oneshot(get_request("/static/app.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/javascript"
    );
}

#[tokio::test]
async fn test_form_vocabulary() {
    let (_dir, paths) = setup_root();
    let app = setup_app(&paths);

    let response = app.oneshot(get_request("/api/form")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["islands"], json!(["Torgersen", "Biscoe", "Dream"]));
    assert_eq!(body["sexes"], json!(["male", "female"]));
    assert_eq!(body["numeric"][0]["name"], "bill_length_mm");
    assert_eq!(body["numeric"][0]["min"], 25.0);
    assert_eq!(body["numeric"][0]["max"], 65.0);
    assert_eq!(body["numeric"][3]["default"], 4000.0);
    assert_eq!(body["default_x_axis"], "flipper_length_mm");
    assert_eq!(body["default_y_axis"], "bill_length_mm");
    assert_eq!(body["size_axis"], "body_mass_g");
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_initial_load() {
    let (_dir, paths) = setup_root();
    let app = setup_app(&paths);

    let body = dispatch(&app, json!({"trigger": "initial_load"})).await;

    assert_eq!(keys(&body), vec!["banner", "chart", "table"]);
    assert_eq!(body["banner"]["text"], "Please enter values and press Classify");
    assert_eq!(body["banner"]["color"], "info");
    assert_eq!(body["chart"]["title"], "Penguin Data Distribution");
    assert_eq!(body["chart"]["x_axis"], "flipper_length_mm");
    assert_eq!(body["chart"]["traces"].as_array().unwrap().len(), 3);
    assert_eq!(body["table"]["total_rows"], 27);
}

#[tokio::test]
async fn test_initial_load_without_seed() {
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::under(dir.path());
    let app = setup_app(&paths);

    let body = dispatch(&app, json!({"trigger": "initial_load"})).await;

    assert_eq!(keys(&body), vec!["banner"]);
    assert_eq!(body["banner"]["color"], "danger");
    assert!(body["banner"]["text"]
        .as_str()
        .unwrap()
        .starts_with("System Error:"));
}

#[tokio::test]
async fn test_classify_without_island() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let mut form = torgersen_form();
    form["island"] = Value::Null;
    let body = dispatch(&app, json!({"trigger": "classify_clicked", "form": form})).await;

    assert_eq!(keys(&body), vec!["banner"]);
    assert_eq!(body["banner"]["text"], "Please select an island.");
    assert_eq!(body["banner"]["color"], "danger");
    assert!(!paths.history.exists());
}

#[tokio::test]
async fn test_classify_with_unparseable_value() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let mut form = torgersen_form();
    form["bill_length_mm"] = json!("forty");
    let body = dispatch(&app, json!({"trigger": "classify_clicked", "form": form})).await;

    assert_eq!(
        body["banner"]["text"],
        "Please enter a valid value for 'bill_length_mm'."
    );
    assert!(!paths.history.exists());
}

#[tokio::test]
async fn test_classify_success() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let body = dispatch(
        &app,
        json!({
            "trigger": "classify_clicked",
            "x_axis": "flipper_length_mm",
            "y_axis": "bill_length_mm",
            "form": torgersen_form()
        }),
    )
    .await;

    assert_eq!(
        keys(&body),
        vec!["banner", "chart", "latest_prediction", "table"]
    );
    assert_eq!(body["banner"]["color"], "success");
    let text = body["banner"]["text"].as_str().unwrap();
    assert!(text.starts_with("Species: "));
    assert!(text.contains(" --- Confidence: "));
    assert!(!text.contains("No sex provided"));

    let species = body["latest_prediction"]["species"].as_str().unwrap();
    assert!(["Adelie", "Chinstrap", "Gentoo"].contains(&species));
    assert!(text.starts_with(&format!("Species: {} ", species)));

    let traces = body["chart"]["traces"].as_array().unwrap();
    let highlight = traces.last().unwrap();
    assert_eq!(highlight["name"], "Latest Prediction");
    assert_eq!(highlight["x"], json!([190.0]));
    assert_eq!(highlight["y"], json!([40.0]));

    assert_eq!(body["table"]["total_rows"], 28);
    assert_eq!(body["table"]["rows"][0][0], species);
    assert!(paths.history.exists());
}

#[tokio::test]
async fn test_classify_without_sex_adds_note() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let mut form = torgersen_form();
    form["sex"] = json!("");
    let body = dispatch(&app, json!({"trigger": "classify_clicked", "form": form})).await;

    let text = body["banner"]["text"].as_str().unwrap();
    assert!(text.ends_with("% - (Note: No sex provided)"));
    assert!(body["latest_prediction"]["sex"].is_null());
}

#[tokio::test]
async fn test_classify_without_model() {
    let (_dir, paths) = setup_root();
    let app = setup_app(&paths);

    let body = dispatch(
        &app,
        json!({"trigger": "classify_clicked", "form": torgersen_form()}),
    )
    .await;

    assert_eq!(keys(&body), vec!["banner"]);
    assert_eq!(body["banner"]["color"], "danger");
    let text = body["banner"]["text"].as_str().unwrap();
    assert!(text.starts_with("System Error: "));
    assert!(text.contains("No trained model found"));
    assert!(!paths.history.exists());
}

#[tokio::test]
async fn test_axis_change_only_updates_chart() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let body = dispatch(
        &app,
        json!({
            "trigger": "axis_changed",
            "x_axis": "body_mass_g",
            "y_axis": "bill_depth_mm",
            "form": torgersen_form()
        }),
    )
    .await;

    assert_eq!(keys(&body), vec!["chart"]);
    assert_eq!(body["chart"]["x_axis"], "body_mass_g");
    assert_eq!(body["chart"]["y_axis"], "bill_depth_mm");
    assert!(!paths.history.exists());
}

#[tokio::test]
async fn test_axis_change_keeps_latest_prediction_highlighted() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let first = dispatch(
        &app,
        json!({"trigger": "classify_clicked", "form": torgersen_form()}),
    )
    .await;

    let body = dispatch(
        &app,
        json!({
            "trigger": "axis_changed",
            "x_axis": "bill_depth_mm",
            "y_axis": "body_mass_g",
            "latest_prediction": first["latest_prediction"]
        }),
    )
    .await;

    let traces = body["chart"]["traces"].as_array().unwrap();
    let highlight = traces.last().unwrap();
    assert_eq!(highlight["name"], "Latest Prediction");
    assert_eq!(highlight["x"], json!([18.0]));
    assert_eq!(highlight["y"], json!([3500.0]));
}

#[tokio::test]
async fn test_unknown_trigger_changes_nothing() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let body = dispatch(
        &app,
        json!({"trigger": "island_selected", "form": torgersen_form()}),
    )
    .await;

    assert_eq!(body, json!({}));
    assert!(!paths.history.exists());
}

#[tokio::test]
async fn test_unknown_axis_changes_nothing() {
    let (_dir, paths) = setup_root();
    let app = setup_app(&paths);

    let body = dispatch(
        &app,
        json!({"trigger": "axis_changed", "x_axis": "species", "y_axis": 3}),
    )
    .await;

    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_malformed_dispatch_is_client_error() {
    let (_dir, paths) = setup_root();
    let app = setup_app(&paths);

    let request = Request::builder()
        .method("POST")
        .uri("/api/dispatch")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_not_found_before_training() {
    let (_dir, paths) = setup_root();
    let app = setup_app(&paths);

    let response = app.oneshot(get_request("/api/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_metrics_after_training() {
    let (_dir, paths) = setup_trained_root();
    let app = setup_app(&paths);

    let response = app.oneshot(get_request("/api/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let accuracy = body["accuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
    assert!(body["macro avg"]["f1-score"].is_number());
    assert!(body["cross_val_accuracy"].is_number());
}
