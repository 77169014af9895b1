//! Integration test: Server API endpoints

use axum::body::Body;
use axum::http::{Request, StatusCode};
use car_price_predictor::error::{PricerError, Result};
use car_price_predictor::inference::PriceModel;
use car_price_predictor::preprocessing::FeatureTable;
use car_price_predictor::server::{create_router, AppState, ServerConfig, INDEX_MESSAGE};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

/// Price falls 100k PKR per year of age from 3M, floored at 100k
struct LinearAgeModel;

impl PriceModel for LinearAgeModel {
    fn predict_log(&self, features: &FeatureTable) -> Result<Vec<f64>> {
        Ok(features
            .rows()
            .iter()
            .map(|row| (3_000_000.0 - 100_000.0 * row.age()).max(100_000.0).ln_1p())
            .collect())
    }

    fn summary(&self) -> Value {
        json!({ "algorithm": "linear_age" })
    }
}

/// Always predicts far below zero in price space
struct NegativeModel;

impl PriceModel for NegativeModel {
    fn predict_log(&self, features: &FeatureTable) -> Result<Vec<f64>> {
        Ok(vec![-50.0; features.len()])
    }
}

struct FailingModel;

impl PriceModel for FailingModel {
    fn predict_log(&self, _features: &FeatureTable) -> Result<Vec<f64>> {
        Err(PricerError::PredictionError("forest exploded".to_string()))
    }
}

/// Indexes past the end of its lookup table, as a corrupted artifact would
struct PanickingModel;

impl PriceModel for PanickingModel {
    fn predict_log(&self, features: &FeatureTable) -> Result<Vec<f64>> {
        let leaves: Vec<f64> = Vec::new();
        Ok(features.rows().iter().map(|_| leaves[7]).collect())
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        model_path: PathBuf::from("unused.bin"),
        cors_origin: None,
    }
}

fn app_with(model: Arc<dyn PriceModel>) -> axum::Router {
    let config = test_config();
    let state = Arc::new(AppState::new(config.clone(), model));
    create_router(state, &config)
}

fn test_app() -> axum::Router {
    app_with(Arc::new(LinearAgeModel))
}

fn listing(year: i64) -> Value {
    json!({
        "model": year,
        "mileage": 45_000,
        "fuel_type": "Petrol",
        "transmission": "Automatic",
        "city": "Lahore",
        "registered": "Punjab",
        "assembly": "Local",
        "color": "White"
    })
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn post_predict(app: axum::Router, body: Value) -> (StatusCode, Value) {
    send(app, "POST", "/predict", Body::from(body.to_string())).await
}

#[tokio::test]
async fn test_index_message() {
    let (status, body) = send(test_app(), "GET", "/", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], INDEX_MESSAGE);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = send(test_app(), "GET", "/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"]["algorithm"], "linear_age");
    assert_eq!(body["stats"]["total_requests"], 0);
}

#[tokio::test]
async fn test_single_object_gives_single_price() {
    let (status, body) = post_predict(test_app(), listing(2020)).await;
    assert_eq!(status, StatusCode::OK);
    let price = body["predicted_price"].as_f64().unwrap();
    // age 5 → 2.5M
    assert!((price - 2_500_000.0).abs() < 1e-3);
    assert!(body.get("predicted_prices").is_none());
}

#[tokio::test]
async fn test_array_gives_prices_in_order() {
    let body = json!([listing(2020), listing(2010), listing(2024)]);
    let (status, body) = post_predict(test_app(), body).await;
    assert_eq!(status, StatusCode::OK);

    let prices: Vec<f64> = body["predicted_prices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(prices.len(), 3);
    assert!(prices[2] > prices[0] && prices[0] > prices[1]);
}

#[tokio::test]
async fn test_rows_wrapper_matches_bare_array() {
    let rows = json!([listing(2015), listing(2019)]);
    let (_, bare) = post_predict(test_app(), rows.clone()).await;
    let (status, wrapped) = post_predict(test_app(), json!({ "rows": rows })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bare, wrapped);
}

#[tokio::test]
async fn test_single_row_array_is_single_shape() {
    let (status, body) = post_predict(test_app(), json!([listing(2018)])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted_price"].is_number());
}

#[tokio::test]
async fn test_age_without_model_year_is_accepted() {
    let mut record = listing(2020);
    let obj = record.as_object_mut().unwrap();
    obj.remove("model");
    obj.insert("age".to_string(), json!(5));

    let (status, body) = post_predict(test_app(), record).await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["predicted_price"].as_f64().unwrap() - 2_500_000.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_missing_columns_are_listed() {
    let (status, body) = post_predict(test_app(), json!({ "year": 2020 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing: Vec<&str> = body["missing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        missing,
        vec!["age", "mileage", "fuel_type", "transmission", "city", "registered", "assembly"]
    );
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Missing required fields: ['age', 'mileage'"));
}

#[tokio::test]
async fn test_missing_categorical_is_not_defaulted() {
    let mut record = listing(2020);
    record.as_object_mut().unwrap().remove("city");

    let (status, body) = post_predict(test_app(), record).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missing"], json!(["city"]));
}

#[tokio::test]
async fn test_null_categorical_becomes_unknown() {
    let mut record = listing(2020);
    record["city"] = Value::Null;

    let (status, body) = post_predict(test_app(), record).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted_price"].is_number());
}

#[tokio::test]
async fn test_empty_rows_wrapper_reports_all_missing() {
    let (status, body) = post_predict(test_app(), json!({ "rows": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missing"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let bodies = [
        "not json",
        "null",
        "{}",
        "[]",
        "42",
        "\"text\"",
        "[1, 2]",
        r#"{"rows": 5}"#,
        "",
    ];
    for raw in bodies {
        let (status, body) = send(test_app(), "POST", "/predict", Body::from(raw)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", raw);
        assert_eq!(body["error"], "Invalid JSON body", "body {:?}", raw);
    }
}

#[tokio::test]
async fn test_non_numeric_mileage_rejects_request() {
    let mut bad = listing(2019);
    bad["mileage"] = json!("N/A");
    let body = json!([listing(2020), bad]);

    let (status, body) = post_predict(test_app(), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid input rows:"));
    assert_eq!(body["rows"][0]["row"], 1);
    assert_eq!(body["rows"][0]["field"], "mileage");
}

#[tokio::test]
async fn test_numeric_strings_are_coerced() {
    let mut record = listing(2020);
    record["model"] = json!("2020");
    record["mileage"] = json!(" 45000 ");

    let (status, body) = post_predict(test_app(), record).await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["predicted_price"].as_f64().unwrap() - 2_500_000.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_model_error_is_internal_error() {
    let app = app_with(Arc::new(FailingModel));
    let (status, body) = post_predict(app, listing(2020)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Model prediction error: forest exploded");
}

#[tokio::test]
async fn test_model_panic_is_prediction_error() {
    let app = app_with(Arc::new(PanickingModel));
    let (status, body) = post_predict(app, listing(2019)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Model prediction error: model panicked"));
}

#[tokio::test]
async fn test_predictions_are_never_negative() {
    let app = app_with(Arc::new(NegativeModel));
    let (status, body) = post_predict(app, json!([listing(2020), listing(2000)])).await;
    assert_eq!(status, StatusCode::OK);
    for price in body["predicted_prices"].as_array().unwrap() {
        assert_eq!(price.as_f64().unwrap(), 0.0);
    }
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let app = test_app();
    let body = json!([listing(2012), listing(2021)]);
    let (_, first) = post_predict(app.clone(), body.clone()).await;
    let (_, second) = post_predict(app, body).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (status, body) = send(test_app(), "GET", "/nope", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_wrong_method_is_json_405() {
    let (status, body) = send(test_app(), "GET", "/predict", Body::empty()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn test_stats_count_requests() {
    let config = test_config();
    let state = Arc::new(AppState::new(config.clone(), Arc::new(LinearAgeModel)));
    let app = create_router(state.clone(), &config);

    post_predict(app.clone(), json!([listing(2020), listing(2021)])).await;
    post_predict(app, json!({ "year": 2020 })).await;

    let stats = state.engine.stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.total_predictions, 2);
    assert_eq!(stats.error_count, 1);
}
