//! HTTP-level tests driving the full router against an in-memory store.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use readings_api::{create_router, db, metrics, AppState};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

async fn create_test_app() -> Router {
    let pool = db::make_pool("sqlite::memory:", 1, Duration::from_secs(5))
        .await
        .expect("Failed to create in-memory store");
    create_router(AppState { pool }, Duration::from_secs(10))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Method::GET, uri, None).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn post_reading(app: &Router, device: &str, reading: Value) {
    let uri = format!("/devices/{}/readings/", device);
    let (status, body) = send(app, Method::POST, &uri, Some(reading)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, b"success");
}

async fn post_values(app: &Router, device: &str, sensor_type: &str, values: &[i64]) {
    for (i, value) in values.iter().enumerate() {
        post_reading(
            app,
            device,
            json!({ "type": sensor_type, "value": value, "date_created": 100 + i as i64 }),
        )
        .await;
    }
}

#[tokio::test]
async fn test_post_then_max() {
    let app = create_test_app().await;
    post_reading(&app, "abc", json!({ "type": "temperature", "value": 50 })).await;

    let (status, json) = get_json(&app, "/devices/abc/readings/max/?type=temperature").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "value": 50 }));
}

#[tokio::test]
async fn test_post_then_list() {
    let app = create_test_app().await;
    post_reading(
        &app,
        "abc",
        json!({ "type": "humidity", "value": 41, "date_created": 1_700_000_000 }),
    )
    .await;
    post_reading(&app, "other", json!({ "type": "humidity", "value": 99 })).await;

    let (status, json) = get_json(&app, "/devices/abc/readings/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!([{
            "device_uuid": "abc",
            "type": "humidity",
            "value": 41,
            "date_created": 1_700_000_000
        }])
    );
}

#[tokio::test]
async fn test_missing_date_created_defaults_to_now() {
    let app = create_test_app().await;
    let before = chrono::Utc::now().timestamp();
    post_reading(&app, "abc", json!({ "type": "temperature", "value": 1 })).await;
    let after = chrono::Utc::now().timestamp();

    let (_, json) = get_json(&app, "/devices/abc/readings/").await;
    let created = json[0]["date_created"].as_i64().unwrap();
    assert!(created >= before && created <= after);
}

#[tokio::test]
async fn test_list_filters_by_type_and_range() {
    let app = create_test_app().await;
    for (sensor_type, value, at) in [
        ("temperature", 1, 9),
        ("temperature", 2, 10),
        ("humidity", 3, 15),
        ("temperature", 4, 20),
        ("temperature", 5, 21),
    ] {
        post_reading(
            &app,
            "abc",
            json!({ "type": sensor_type, "value": value, "date_created": at }),
        )
        .await;
    }

    let (_, json) = get_json(&app, "/devices/abc/readings/?type=temperature&start=10&end=20").await;
    let values: Vec<i64> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["value"].as_i64().unwrap())
        .collect();
    assert_eq!(values, vec![2, 4]);

    let (_, json) = get_json(&app, "/devices/abc/readings/?start=10").await;
    assert_eq!(json.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_write_accepts_unknown_type() {
    let app = create_test_app().await;
    post_reading(&app, "abc", json!({ "type": "pressure", "value": 1013 })).await;

    let (status, json) = get_json(&app, "/devices/abc/readings/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["type"], "pressure");

    let (status, _) = send(&app, Method::GET, "/devices/abc/readings/?type=pressure", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = create_test_app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/devices/abc/readings/")
        .body(Body::from("{\"type\": \"temperature\", \"value\":"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/devices/abc/readings/", Some(json!({ "type": "humidity" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_aggregates_require_type() {
    let app = create_test_app().await;
    for stat in ["max", "min", "mean", "median", "mode"] {
        let uri = format!("/devices/abc/readings/{}/", stat);
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", stat);
        assert_eq!(body, b"Missing type parameter", "{}", stat);
    }
}

#[tokio::test]
async fn test_aggregates_reject_unknown_type() {
    let app = create_test_app().await;
    for stat in ["max", "min", "mean", "median", "mode"] {
        let uri = format!("/devices/abc/readings/{}/?type=pressure", stat);
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", stat);
        assert_eq!(body, b"Invalid type value: pressure", "{}", stat);
    }
}

#[tokio::test]
async fn test_type_accepted_in_any_casing() {
    let app = create_test_app().await;
    for sensor_type in ["temperature", "Temperature", "HUMIDITY", "huMidity"] {
        let uri = format!("/devices/abc/readings/max/?type={}", sensor_type);
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", sensor_type);
    }
}

#[tokio::test]
async fn test_empty_set_yields_null() {
    let app = create_test_app().await;
    for stat in ["max", "min", "mean", "mode"] {
        let uri = format!("/devices/nobody/readings/{}/?type=humidity", stat);
        let (status, json) = get_json(&app, &uri).await;
        assert_eq!(status, StatusCode::OK, "{}", stat);
        assert_eq!(json, json!({ "value": null }), "{}", stat);
    }

    let (status, json) = get_json(&app, "/devices/nobody/readings/median/?type=humidity").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({}));
}

#[tokio::test]
async fn test_median_odd_and_even() {
    let app = create_test_app().await;
    post_values(&app, "odd", "temperature", &[3, 1, 2]).await;
    post_values(&app, "even", "temperature", &[4, 1, 3, 2]).await;

    let (_, json) = get_json(&app, "/devices/odd/readings/median/?type=temperature").await;
    assert_eq!(json, json!({ "value": 2 }));

    let (_, json) = get_json(&app, "/devices/even/readings/median/?type=temperature").await;
    assert_eq!(json, json!({ "value": 2.5 }));
}

#[tokio::test]
async fn test_min_mean_mode() {
    let app = create_test_app().await;
    post_values(&app, "abc", "humidity", &[40, 10, 40, 30, 10, 50]).await;

    let (_, json) = get_json(&app, "/devices/abc/readings/min/?type=humidity").await;
    assert_eq!(json, json!({ "value": 10 }));

    let (_, json) = get_json(&app, "/devices/abc/readings/mean/?type=humidity").await;
    assert_eq!(json, json!({ "value": 30.0 }));

    // 10 and 40 both appear twice
    let (_, json) = get_json(&app, "/devices/abc/readings/mode/?type=humidity").await;
    assert_eq!(json, json!({ "value": 10 }));
}

#[tokio::test]
async fn test_time_range_on_aggregate() {
    let app = create_test_app().await;
    for (value, at) in [(100, 5), (7, 10), (8, 20), (200, 25)] {
        post_reading(
            &app,
            "abc",
            json!({ "type": "temperature", "value": value, "date_created": at }),
        )
        .await;
    }

    let (_, json) = get_json(&app, "/devices/abc/readings/max/?type=temperature&start=10&end=20").await;
    assert_eq!(json, json!({ "value": 8 }));

    let (_, json) = get_json(&app, "/devices/abc/readings/max/?type=temperature&end=20").await;
    assert_eq!(json, json!({ "value": 200 }));
}

#[tokio::test]
async fn test_non_numeric_range_rejected() {
    let app = create_test_app().await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/devices/abc/readings/max/?type=temperature&start=10&end=abc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Invalid end value: abc");
}

#[tokio::test]
async fn test_unimplemented_endpoints() {
    let app = create_test_app().await;
    for uri in [
        "/devices/abc/readings/quartiles/",
        "/devices/abc/readings/quartiles/?type=temperature&start=1&end=2",
        "/devices/summary",
        "/devices/summary?type=pressure",
    ] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED, "{}", uri);
        assert_eq!(body, b"Endpoint is not implemented", "{}", uri);
    }
}

#[tokio::test]
async fn test_quoted_device_id_matches_nothing() {
    let app = create_test_app().await;
    post_reading(&app, "abc", json!({ "type": "temperature", "value": 50 })).await;

    let (status, json) = get_json(
        &app,
        "/devices/abc%22%20OR%20%221%22%3D%221/readings/max/?type=temperature",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "value": null }));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;
    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_health_reports_unavailable_store() {
    let pool = db::make_pool("sqlite::memory:", 1, Duration::from_secs(5))
        .await
        .unwrap();
    let app = create_router(AppState { pool: pool.clone() }, Duration::from_secs(10));
    pool.close().await;

    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json, json!({ "status": "unavailable" }));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    // only this test registers; a repeat run in the same process is AlreadyReg
    let _ = metrics::init_metrics();

    let app = create_test_app().await;
    post_reading(&app, "abc", json!({ "type": "temperature", "value": 50 })).await;

    let (status, body) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("readings_http_requests_total"), "{}", text);
    assert!(text.contains("readings_written_total"), "{}", text);
}

#[tokio::test]
async fn test_rows_from_older_writers_are_served() {
    let pool = db::make_pool("sqlite::memory:", 1, Duration::from_secs(5))
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO readings (device_uuid, type, value, date_created) \
         VALUES ('old', 'temperature', NULL, 1), ('old', 'temperature', 50.5, 2), \
                ('old', 'temperature', 20, 3)",
    )
    .execute(&pool)
    .await
    .unwrap();
    let app = create_router(AppState { pool }, Duration::from_secs(10));

    let (status, json) = get_json(&app, "/devices/old/readings/").await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<Value> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["value"].clone())
        .collect();
    assert_eq!(values, vec![json!(null), json!(50.5), json!(20)]);

    let (status, json) = get_json(&app, "/devices/old/readings/max/?type=temperature").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "value": 50.5 }));

    let (status, json) = get_json(&app, "/devices/old/readings/median/?type=temperature").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "value": 35.25 }));
}
